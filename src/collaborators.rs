//! Injectable capabilities for everything that touches the host.
//!
//! The pipeline never shells out or reads system files directly. It is
//! handed one implementation of each trait below, so tests can run the
//! whole configuration flow against canned outputs.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command_runner::run_command;
use crate::error::{ProvisionError, Result};

/// Columns requested from lsblk; these are the enumerated `BlockDevice` fields.
pub const LSBLK_COLUMNS: &str = "name,kname,path,model,serial,size,type";

/// Default location of the persistent machine identifier.
pub const MACHINE_ID_PATH: &str = "/etc/machine-id";

/// Produces the raw structured block device listing.
pub trait DiskLister {
    /// Return the JSON document emitted by the enumerator.
    fn list_disks_json(&self) -> Result<String>;
}

/// Runs the upstream NixOS configuration generator.
pub trait BaseConfigGenerator {
    /// Generate the generic config and hardware files under `root`.
    fn generate_base_config(&self, root: &Path) -> Result<()>;
}

/// Turns a plaintext password into a crypt-format hash.
pub trait PasswordHasher {
    fn hash_password(&self, plain: &str) -> Result<String>;
}

/// Asks the operator for a secret. May return an empty string.
pub trait SecretPrompt {
    fn prompt_secret(&self, message: &str) -> Result<String>;
}

/// Reads the host's persistent machine identifier.
pub trait MachineIdSource {
    fn read_machine_id(&self) -> Result<String>;
}

// ============================================================================
// Host implementations
// ============================================================================

/// `lsblk -d --json -o <columns>`
#[derive(Debug, Clone, Copy, Default)]
pub struct Lsblk;

impl DiskLister for Lsblk {
    fn list_disks_json(&self) -> Result<String> {
        let output = run_command("lsblk", &["-d", "--json", "-o", LSBLK_COLUMNS], false)
            .map_err(|e| ProvisionError::enumeration(e.to_string()))?;
        if !output.success {
            return Err(ProvisionError::enumeration(format!(
                "lsblk exited with {}: {}",
                output.exit_code.unwrap_or(-1),
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

/// `nixos-generate-config --root <root>`
#[derive(Debug, Clone, Copy, Default)]
pub struct NixosGenerateConfig;

impl BaseConfigGenerator for NixosGenerateConfig {
    fn generate_base_config(&self, root: &Path) -> Result<()> {
        let root = root.to_string_lossy();
        run_command("nixos-generate-config", &["--root", &*root], false)?.ensure_success()?;
        Ok(())
    }
}

/// `mkpasswd -m SHA-512 -- <plain>`
#[derive(Debug, Clone, Copy, Default)]
pub struct Mkpasswd;

/// Arguments for hashing `plain`; `--` ends option parsing so a password
/// starting with `-` is never read as a flag.
fn mkpasswd_args(plain: &str) -> [&str; 4] {
    ["-m", "SHA-512", "--", plain]
}

impl PasswordHasher for Mkpasswd {
    fn hash_password(&self, plain: &str) -> Result<String> {
        let output = run_command("mkpasswd", &mkpasswd_args(plain), true)
            .and_then(|output| output.ensure_success())
            .map_err(|e| ProvisionError::credential(e.to_string()))?;
        Ok(output.stdout)
    }
}

/// Hidden terminal prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl SecretPrompt for TerminalPrompt {
    fn prompt_secret(&self, message: &str) -> Result<String> {
        match dialoguer::Password::new()
            .with_prompt(message)
            .allow_empty_password(true)
            .interact()
        {
            Ok(secret) => Ok(secret),
            // Interrupted input counts as no answer and is asked again
            Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => {
                Ok(String::new())
            }
            Err(e) => Err(ProvisionError::credential(format!("Prompt failed: {}", e))),
        }
    }
}

/// Machine ID stored in a one-line text file.
#[derive(Debug, Clone)]
pub struct MachineIdFile {
    pub path: PathBuf,
}

impl MachineIdFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for MachineIdFile {
    fn default() -> Self {
        Self::new(MACHINE_ID_PATH)
    }
}

impl MachineIdSource for MachineIdFile {
    fn read_machine_id(&self) -> Result<String> {
        debug!("Reading machine id from {}", self.path.display());
        fs::read_to_string(&self.path).map_err(|e| {
            ProvisionError::identity(format!("cannot read {}: {}", self.path.display(), e))
        })
    }
}
