//! Pool description generator.
//!
//! Renders the bundled `zfs.nix` template into the NixOS configuration
//! directory. The template carries fixed placeholder tokens; every token
//! is replaced in a single left-to-right pass, so text inserted for one
//! token is never scanned again for another.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config_file::SystemConfig;
use crate::error::{ProvisionError, Result};
use crate::hardware_config::SWAP_MARKER;
use crate::rewrite::rewrite_lines;

pub const HOST_ID: &str = "HOST_ID";
pub const DEV_NODES: &str = "DEV_NODES";
pub const PRIMARY_DISK: &str = "PRIMARY_DISK";
pub const GRUB_DEVICES: &str = "GRUB_DEVICES";
pub const INITIAL_HASHED_PW: &str = "INITIAL_HASHED_PW";
pub const SWAP_DEVICES: &str = "SWAP_DEVICES";

/// Partition number of the swap partition on every pool disk.
pub const SWAP_PARTITION: u32 = 4;

/// Environment variable overriding the asset root directory.
pub const ASSETS_DIR_ENV: &str = "NIXPOOL_ASSETS_DIR";

/// Values substituted into the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSubstitutions {
    pub host_id: String,
    /// Directory of the primary disk's device node (`/dev/disk/by-id`)
    pub dev_nodes: String,
    /// Base name of the primary disk
    pub primary_disk: String,
    /// Indented, quoted, newline-separated disk list
    pub grub_devices: String,
    pub hashed_password: String,
    /// Rendered swap declarations, `None` when swap is disabled
    pub swap_devices: Option<String>,
}

impl PoolSubstitutions {
    pub fn new(config: &SystemConfig, host_id: &str, hashed_password: &str) -> Result<Self> {
        let primary = &config.pool.primary_disk;
        let dev_nodes = primary
            .parent()
            .map(|p| p.display().to_string())
            .ok_or_else(|| {
                ProvisionError::config(format!("primary disk {:?} has no parent", primary))
            })?;
        let primary_disk = primary
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                ProvisionError::config(format!("primary disk {:?} has no file name", primary))
            })?;

        let swap_devices = config
            .swap_enabled()
            .then(|| render_swap_devices(&config.pool.disks));

        Ok(Self {
            host_id: host_id.to_string(),
            dev_nodes,
            primary_disk,
            grub_devices: render_grub_devices(&config.pool.disks),
            hashed_password: hashed_password.to_string(),
            swap_devices,
        })
    }

    fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            (HOST_ID, self.host_id.as_str()),
            (DEV_NODES, self.dev_nodes.as_str()),
            (PRIMARY_DISK, self.primary_disk.as_str()),
            (GRUB_DEVICES, self.grub_devices.as_str()),
            (INITIAL_HASHED_PW, self.hashed_password.as_str()),
        ];
        if let Some(swap) = &self.swap_devices {
            pairs.push((SWAP_DEVICES, swap.as_str()));
        }
        pairs
    }
}

/// `"<disk>"` entries for `boot.loader.grub.devices`.
pub fn render_grub_devices(disks: &[PathBuf]) -> String {
    let quoted: Vec<String> = disks
        .iter()
        .map(|d| format!("\"{}\"", d.display()))
        .collect();
    format!("\n      {}\n    ", quoted.join("\n      "))
}

/// One randomly encrypted swap declaration per disk.
pub fn render_swap_devices(disks: &[PathBuf]) -> String {
    let entries: Vec<String> = disks
        .iter()
        .map(|d| {
            format!(
                "{{ device = \"{}-part{}\"; randomEncryption.enable = true; }}",
                d.display(),
                SWAP_PARTITION
            )
        })
        .collect();
    format!("\n    {}\n  ", entries.join("\n    "))
}

/// Replace every token of `pairs` in `line` in one pass.
///
/// At each position the earliest token occurrence wins; ties go to the
/// token listed first. Replacement text is copied through untouched.
///
/// Swap lines are dropped by looking at the template line, not the
/// substituted one, so a disk path that happens to contain `swapDevices`
/// or `SWAP_DEVICES` is kept verbatim in the efiSysMountPoint and grub
/// device lines. The "no swap marker in output" guarantee therefore holds
/// for template text only, not for operator-supplied values.
pub fn substitute(line: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        let next = pairs
            .iter()
            .filter_map(|(token, value)| rest.find(token).map(|at| (at, *token, *value)))
            .min_by_key(|(at, _, _)| *at);
        match next {
            Some((at, token, value)) => {
                out.push_str(&rest[..at]);
                out.push_str(value);
                rest = &rest[at + token.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Transform one template line.
///
/// Without swap, template lines carrying the swap marker are dropped;
/// the check runs before substitution (see [`substitute`]).
pub fn pool_line(line: &str, subs: &PoolSubstitutions) -> Option<String> {
    if subs.swap_devices.is_none() && line.contains(SWAP_MARKER) {
        return None;
    }
    Some(substitute(line, &subs.pairs()))
}

/// Renders the pool description from the bundled template.
#[derive(Debug, Clone)]
pub struct PoolConfigGenerator {
    asset_root: PathBuf,
}

impl PoolConfigGenerator {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
        }
    }

    /// Asset root from `NIXPOOL_ASSETS_DIR`, falling back to `./assets`.
    pub fn from_env() -> Self {
        let root = std::env::var_os(ASSETS_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("assets"));
        Self::new(root)
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Template file for `config`; never modified.
    pub fn template_path(&self, config: &SystemConfig) -> PathBuf {
        self.asset_root.join(&config.nixos.zfs)
    }

    /// Write the rendered pool description to the NixOS config directory.
    pub fn generate(&self, config: &SystemConfig, subs: &PoolSubstitutions) -> Result<()> {
        let template = self.template_path(config);
        let target = config.nixos.pool_file();
        rewrite_lines(&template, &target, |line| pool_line(line, subs))?;
        info!(
            "Generated {} for {} disk(s), swap {}",
            target.display(),
            config.pool.disks.len(),
            if subs.swap_devices.is_some() { "on" } else { "off" }
        );
        Ok(())
    }
}
