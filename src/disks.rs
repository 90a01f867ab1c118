//! Block device catalog
//!
//! Parses the enumerator's JSON payload into `BlockDevice` records, keeps
//! whole disks only, and optionally attaches the stable `/dev/disk/by-id`
//! alias of each disk.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collaborators::DiskLister;
use crate::error::{ProvisionError, Result};

/// Directory of stable, hardware-derived device aliases.
pub const BY_ID_DIR: &str = "/dev/disk/by-id";

/// One physical disk as reported by the enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockDevice {
    /// Kernel-visible short name (`sda`, `nvme0n1`)
    pub name: String,
    /// Internal kernel device name
    pub kernel_name: String,
    /// Device node (`/dev/sda`)
    pub device_path: PathBuf,
    pub model: String,
    pub serial: String,
    /// Human-readable size (`931.5G`)
    pub size: String,
    /// Device type; only `disk` survives enumeration
    pub device_type: String,
    /// Stable alias, filled by `resolve_by_id`
    pub by_id: Option<PathBuf>,
}

/// One row of the `nixpool disks` listing.
impl fmt::Display for BlockDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let by_id = self
            .by_id
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{:<10} {:>8}  {:<24} {:<20} {}",
            self.name, self.size, self.model, self.serial, by_id
        )
    }
}

#[derive(Debug, Deserialize)]
struct LsblkResponse {
    blockdevices: Vec<LsblkNode>,
}

#[derive(Debug, Deserialize)]
struct LsblkNode {
    name: String,
    #[serde(default)]
    kname: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    serial: Option<String>,
    // String normally, integer under `--bytes`
    #[serde(default)]
    size: Option<serde_json::Value>,
    #[serde(rename = "type")]
    #[serde(default)]
    device_type: Option<String>,
}

impl From<LsblkNode> for BlockDevice {
    fn from(node: LsblkNode) -> Self {
        let size = match node.size {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let device_path = node
            .path
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new("/dev").join(&node.name));
        Self {
            kernel_name: node.kname.unwrap_or_else(|| node.name.clone()),
            name: node.name,
            device_path,
            model: node.model.unwrap_or_default().trim().to_string(),
            serial: node.serial.unwrap_or_default().trim().to_string(),
            size,
            device_type: node.device_type.unwrap_or_default(),
            by_id: None,
        }
    }
}

/// Parse an lsblk `--json` payload and keep only `type == "disk"` entries.
pub fn parse_block_devices(payload: &str) -> Result<Vec<BlockDevice>> {
    let decoded: LsblkResponse = serde_json::from_str(payload).map_err(|e| {
        ProvisionError::enumeration(format!("failed to parse lsblk JSON output: {}", e))
    })?;

    Ok(decoded
        .blockdevices
        .into_iter()
        .map(BlockDevice::from)
        .filter(|dev| dev.device_type == "disk")
        .collect())
}

/// Enumerate whole-disk block devices.
///
/// Order is whatever the enumerator emits; use it for display only.
pub fn list_block_devices(lister: &dyn DiskLister) -> Result<Vec<BlockDevice>> {
    let payload = lister.list_disks_json()?;
    let disks = parse_block_devices(&payload)?;
    info!("Found {} disk(s)", disks.len());
    Ok(disks)
}

/// Attach the `by-id` alias to each device.
///
/// Partition aliases (`-partN`) are ignored. When several aliases point at
/// the same disk, vendor names win over `wwn-` names, then the
/// lexicographically smallest is taken. A missing alias directory leaves
/// every device without an alias.
pub fn resolve_by_id(devices: Vec<BlockDevice>, by_id_dir: &Path) -> Vec<BlockDevice> {
    let entries = match fs::read_dir(by_id_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("No by-id aliases at {}: {}", by_id_dir.display(), e);
            return devices;
        }
    };

    let mut aliases: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
    for entry in entries.flatten() {
        let alias = entry.path();
        let is_partition = alias
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_partition_alias);
        if is_partition {
            continue;
        }
        if let Ok(target) = fs::canonicalize(&alias) {
            aliases.entry(target).or_default().push(alias);
        }
    }

    devices
        .into_iter()
        .map(|dev| {
            let by_id = fs::canonicalize(&dev.device_path)
                .ok()
                .and_then(|node| aliases.get(&node))
                .and_then(|candidates| preferred_alias(candidates));
            BlockDevice { by_id, ..dev }
        })
        .collect()
}

fn is_partition_alias(name: &str) -> bool {
    name.rsplit_once("-part")
        .is_some_and(|(_, n)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

fn preferred_alias(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .min_by_key(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy().to_string());
            let wwn = name.as_deref().is_some_and(|n| n.starts_with("wwn-"));
            (wwn, name)
        })
        .cloned()
}
