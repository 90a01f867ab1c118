use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::collaborators::MACHINE_ID_PATH;
use crate::disks::BY_ID_DIR;

/// nixpool - NixOS root-on-ZFS configuration
#[derive(Parser)]
#[command(name = "nixpool")]
#[command(about = "Turns a generated NixOS configuration into a root-on-ZFS configuration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate and rewrite the NixOS configuration for the pool
    Configure {
        /// Path to the provisioning config (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Directory holding the zfs.nix template (default: $NIXPOOL_ASSETS_DIR or ./assets)
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Machine ID file used for the host id
        #[arg(long, default_value = MACHINE_ID_PATH)]
        machine_id: PathBuf,

        /// Root mount point passed to nixos-generate-config
        #[arg(long, default_value = "/mnt")]
        root: PathBuf,

        /// Skip root and binary checks
        #[arg(long)]
        skip_sanity: bool,
    },
    /// List whole disks with their stable by-id paths
    Disks {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Directory of by-id aliases
        #[arg(long, default_value = BY_ID_DIR)]
        by_id_dir: PathBuf,
    },
    /// Validate a provisioning config file
    Validate {
        /// Path to the provisioning config (JSON)
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
