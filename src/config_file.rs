//! Provisioning intent: where the NixOS files live, whether swap exists,
//! and which disks make up the pool.
//!
//! The document is JSON so it can be written by the partitioning stage and
//! handed to `nixpool configure --config`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Locations and file names of the NixOS configuration set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NixosPaths {
    /// Directory holding the configuration files (e.g. `/mnt/etc/nixos`)
    pub path: PathBuf,
    /// Main system configuration file name
    pub config: String,
    /// Auto-generated hardware file name
    pub hw_old: String,
    /// Pool-aware hardware file name
    pub hw: String,
    /// Pool description file name (also the template asset name)
    pub zfs: String,
}

impl Default for NixosPaths {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/mnt/etc/nixos"),
            config: "configuration.nix".to_string(),
            hw_old: "hardware-configuration.nix".to_string(),
            hw: "hardware-configuration-zfs.nix".to_string(),
            zfs: "zfs.nix".to_string(),
        }
    }
}

impl NixosPaths {
    pub fn config_file(&self) -> PathBuf {
        self.path.join(&self.config)
    }

    pub fn old_hardware_file(&self) -> PathBuf {
        self.path.join(&self.hw_old)
    }

    pub fn hardware_file(&self) -> PathBuf {
        self.path.join(&self.hw)
    }

    pub fn pool_file(&self) -> PathBuf {
        self.path.join(&self.zfs)
    }
}

/// Partition layout facts the configuration depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    /// Swap size as given to the partitioner; empty or "0" means no swap
    #[serde(default)]
    pub swap: String,
}

/// Pool membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    /// Disk whose directory and base name seed the device placeholders
    pub primary_disk: PathBuf,
    /// All pool disks, in order; more than one means a mirror
    pub disks: Vec<PathBuf>,
}

/// Complete provisioning intent, read-only to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub nixos: NixosPaths,
    #[serde(default)]
    pub partition: PartitionInfo,
    pub pool: PoolInfo,
}

impl SystemConfig {
    /// Whether a swap partition was created on each disk.
    pub fn swap_enabled(&self) -> bool {
        let swap = self.partition.swap.trim();
        !(swap.is_empty() || swap == "0")
    }

    /// Whether the pool mirrors across more than one disk.
    pub fn is_mirrored(&self) -> bool {
        self.pool.disks.len() > 1
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.nixos.path.is_absolute() {
            anyhow::bail!("NixOS config path must be absolute: {:?}", self.nixos.path);
        }

        for (label, name) in [
            ("config", &self.nixos.config),
            ("hw_old", &self.nixos.hw_old),
            ("hw", &self.nixos.hw),
            ("zfs", &self.nixos.zfs),
        ] {
            if name.trim().is_empty() {
                anyhow::bail!("nixos.{} must be specified", label);
            }
            if name.contains('/') {
                anyhow::bail!("nixos.{} must be a bare file name, got {:?}", label, name);
            }
        }

        if self.nixos.hw == self.nixos.hw_old {
            anyhow::bail!("nixos.hw must differ from nixos.hw_old");
        }

        if self.pool.disks.is_empty() {
            anyhow::bail!("Pool must contain at least one disk");
        }

        for disk in &self.pool.disks {
            if !disk.is_absolute() {
                anyhow::bail!("Pool disk path must be absolute: {:?}", disk);
            }
        }

        if !self.pool.primary_disk.is_absolute() {
            anyhow::bail!(
                "Primary disk path must be absolute: {:?}",
                self.pool.primary_disk
            );
        }

        if !self.pool.disks.contains(&self.pool.primary_disk) {
            anyhow::bail!(
                "Primary disk {:?} is not a member of the pool",
                self.pool.primary_disk
            );
        }

        Ok(())
    }
}
