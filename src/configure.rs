//! Configuration pipeline
//!
//! Runs the five provisioning steps in their fixed order. Each step reads
//! what the previous one wrote, so the first failure aborts the run and is
//! reported with the name of the step. Files already rewritten stay as
//! they are; re-running is the operator's call.

use std::path::{Path, PathBuf};

use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};
use tracing::info;

use crate::bootloader::strip_boot_loader_refs;
use crate::collaborators::{
    BaseConfigGenerator, MachineIdFile, MachineIdSource, Mkpasswd, NixosGenerateConfig,
    PasswordHasher, SecretPrompt, TerminalPrompt,
};
use crate::config_file::SystemConfig;
use crate::error::Result;
use crate::hardware_config::adapt_hardware_config;
use crate::identity::{host_identifier, initial_credential_hash};
use crate::imports::rewire_imports;
use crate::pool_config::{PoolConfigGenerator, PoolSubstitutions};

/// Provisioning steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, IntoStaticStr)]
pub enum Step {
    #[strum(serialize = "generate base config")]
    GenerateBaseConfig,
    #[strum(serialize = "rewire imports")]
    RewireImports,
    #[strum(serialize = "strip boot loader refs")]
    StripBootLoaderRefs,
    #[strum(serialize = "adapt hardware config")]
    AdaptHardwareConfig,
    #[strum(serialize = "generate pool config")]
    GeneratePoolConfig,
}

/// Everything the pipeline needs from the host, plus the template location.
pub struct Provisioner {
    /// Mount point handed to the base config generator
    pub root: PathBuf,
    pub base_config: Box<dyn BaseConfigGenerator>,
    pub machine_id: Box<dyn MachineIdSource>,
    pub prompt: Box<dyn SecretPrompt>,
    pub hasher: Box<dyn PasswordHasher>,
    pub pool: PoolConfigGenerator,
}

impl Provisioner {
    /// Provisioner backed by the real host tools.
    pub fn host(root: impl Into<PathBuf>, asset_root: impl Into<PathBuf>, machine_id: &Path) -> Self {
        Self {
            root: root.into(),
            base_config: Box::new(NixosGenerateConfig),
            machine_id: Box::new(MachineIdFile::new(machine_id)),
            prompt: Box::new(TerminalPrompt),
            hasher: Box::new(Mkpasswd),
            pool: PoolConfigGenerator::new(asset_root),
        }
    }

    /// Run every step in order, stopping at the first failure.
    pub fn configure(&self, config: &SystemConfig) -> Result<()> {
        for step in Step::iter() {
            info!("Starting: {}", step);
            self.run_step(step, config)
                .map_err(|e| e.in_step(step.into()))?;
            info!("Finished: {}", step);
        }
        info!(
            "NixOS configuration ready in {}",
            config.nixos.path.display()
        );
        Ok(())
    }

    /// Run a single step.
    pub fn run_step(&self, step: Step, config: &SystemConfig) -> Result<()> {
        match step {
            Step::GenerateBaseConfig => self.base_config.generate_base_config(&self.root),
            Step::RewireImports => rewire_imports(config).map(|_| ()),
            Step::StripBootLoaderRefs => strip_boot_loader_refs(config),
            Step::AdaptHardwareConfig => adapt_hardware_config(config),
            Step::GeneratePoolConfig => self.generate_pool_config(config),
        }
    }

    fn generate_pool_config(&self, config: &SystemConfig) -> Result<()> {
        let host_id = host_identifier(self.machine_id.as_ref())?;
        info!("Host id: {}", host_id);
        let hash = initial_credential_hash(self.prompt.as_ref(), self.hasher.as_ref())?;
        let subs = PoolSubstitutions::new(config, &host_id, &hash)?;
        self.pool.generate(config, &subs)
    }
}

/// Run the full pipeline against the real host.
pub fn configure(config: &SystemConfig, root: &Path, asset_root: &Path, machine_id: &Path) -> Result<()> {
    Provisioner::host(root, asset_root, machine_id).configure(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        let steps: Vec<Step> = Step::iter().collect();
        assert_eq!(
            steps,
            vec![
                Step::GenerateBaseConfig,
                Step::RewireImports,
                Step::StripBootLoaderRefs,
                Step::AdaptHardwareConfig,
                Step::GeneratePoolConfig,
            ]
        );
    }

    #[test]
    fn test_step_names() {
        assert_eq!(Step::GenerateBaseConfig.to_string(), "generate base config");
        let name: &'static str = Step::GeneratePoolConfig.into();
        assert_eq!(name, "generate pool config");
    }
}
