//! Host identifier and initial administrator credential.

use tracing::{info, warn};

use crate::collaborators::{MachineIdSource, PasswordHasher, SecretPrompt};
use crate::error::{ProvisionError, Result};

/// Number of machine-id characters used as the ZFS host id.
pub const HOST_ID_LEN: usize = 8;

const PASSWORD_PROMPT: &str = "Enter an initial root password";

/// Derive the short host identifier from the machine ID.
///
/// Takes the first line, trimmed, and keeps at most `HOST_ID_LEN` characters.
pub fn host_identifier(source: &dyn MachineIdSource) -> Result<String> {
    let raw = source.read_machine_id()?;
    let first_line = raw.lines().next().unwrap_or_default().trim();
    if first_line.is_empty() {
        return Err(ProvisionError::identity("machine id is empty"));
    }
    Ok(first_line.chars().take(HOST_ID_LEN).collect())
}

/// Prompt until a non-empty password is given, then hash it.
pub fn initial_credential_hash(
    prompt: &dyn SecretPrompt,
    hasher: &dyn PasswordHasher,
) -> Result<String> {
    let password = loop {
        let answer = prompt.prompt_secret(PASSWORD_PROMPT)?;
        if !answer.is_empty() {
            break answer;
        }
        warn!("Empty password rejected, asking again");
    };

    let hash = hasher.hash_password(&password)?.trim().to_string();
    if hash.is_empty() {
        return Err(ProvisionError::credential("password hasher returned no output"));
    }
    info!("Initial root password hashed");
    Ok(hash)
}
