//! Pre-flight sanity checks for runtime environment
//!
//! Before touching the target configuration this verifies:
//! - Required runtime binaries are present
//! - Running with root privileges (EUID 0)

use std::process::Command;

use crate::command_runner::CommandProcessGroup;

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }

    /// Human-readable list of problems, one per line
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.is_root {
            problems.push("Root privileges required (run with sudo or as root)".to_string());
        }
        for binary in &self.missing_binaries {
            problems.push(format!(
                "Missing binary: {} (provided by {})",
                binary,
                package_for_binary(binary)
            ));
        }
        problems
    }
}

/// Required runtime binaries for configuration
const REQUIRED_BINARIES: &[&str] = &[
    "nixos-generate-config", // Base configuration (nixos-install-tools)
    "mkpasswd",              // Root password hashing (mkpasswd)
];

/// Check if a binary is available in PATH
fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .in_new_process_group()
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Check if running as root (EUID 0)
fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Perform all sanity checks and return the result
pub fn verify_environment() -> SanityCheckResult {
    let missing = REQUIRED_BINARIES
        .iter()
        .filter(|binary| !binary_exists(binary))
        .map(|binary| (*binary).to_string())
        .collect();

    SanityCheckResult {
        missing_binaries: missing,
        is_root: is_running_as_root(),
    }
}

/// Nix package providing `binary`
fn package_for_binary(binary: &str) -> &'static str {
    match binary {
        "nixos-generate-config" => "nixos-install-tools",
        "mkpasswd" => "mkpasswd",
        _ => "unknown",
    }
}
