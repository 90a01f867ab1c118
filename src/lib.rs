//! nixpool library
//!
//! Turns the generic configuration produced by `nixos-generate-config` into
//! a root-on-ZFS configuration: discovers disks, derives the host id and
//! root credential, and rewrites the NixOS files line by line.

pub mod bootloader;
pub mod cli;
pub mod collaborators;
pub mod command_runner;
pub mod config_file;
pub mod configure;
pub mod disks;
pub mod error;
pub mod hardware_config;
pub mod identity;
pub mod imports;
pub mod pool_config;
pub mod rewrite;
pub mod sanity;

// Re-export main types for convenience
pub use collaborators::{
    BaseConfigGenerator, DiskLister, MachineIdFile, MachineIdSource, PasswordHasher, SecretPrompt,
};
pub use config_file::{NixosPaths, PartitionInfo, PoolInfo, SystemConfig};
pub use configure::{configure, Provisioner, Step};
pub use disks::{list_block_devices, resolve_by_id, BlockDevice};
pub use error::{ProvisionError, Result};
pub use pool_config::{PoolConfigGenerator, PoolSubstitutions};
pub use rewrite::{rewrite_in_place, rewrite_lines};
