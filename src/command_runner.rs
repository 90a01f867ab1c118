//! Subprocess execution
//!
//! Every external command nixpool runs (lsblk, nixos-generate-config,
//! mkpasswd) goes through `run_command`. The child is placed in its own
//! process group and receives SIGTERM if nixpool dies first, so an aborted
//! run never leaves a half-finished generator behind.

use std::process::{Command, Stdio};

use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tracing::debug;

use crate::error::{ProvisionError, Result};

/// Extension trait for `std::process::Command` to set up process groups
pub trait CommandProcessGroup {
    /// Configure the command to run in its own process group
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: only async-signal-safe syscalls run between fork and exec.
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::from)?;
                nix::sys::prctl::set_pdeathsig(Signal::SIGTERM).map_err(std::io::Error::from)?;
                Ok(())
            });
        }
        self
    }
}

/// Captured output of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Rendered command line, used in diagnostics.
    pub command: String,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited with status 0.
    pub success: bool,
}

impl CommandOutput {
    /// Turn a non-zero exit into `ProvisionError::Subprocess`.
    pub fn ensure_success(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(ProvisionError::Subprocess {
                command: self.command,
                code: self.exit_code.unwrap_or(-1),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Run `program` with `args` to completion and capture its output.
///
/// A spawn failure (binary missing, permission denied) is an error; a
/// non-zero exit is not. Callers decide via `CommandOutput::ensure_success`.
/// `redact` hides the arguments from logs and diagnostics.
pub fn run_command(program: &str, args: &[&str], redact: bool) -> Result<CommandOutput> {
    let rendered = if redact {
        format!("{} <redacted>", program)
    } else {
        std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    };
    debug!("run_command: {}", rendered);

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .in_new_process_group()
        .output()
        .map_err(|e| ProvisionError::Subprocess {
            command: rendered.clone(),
            code: -1,
            stderr: format!("failed to spawn: {}", e),
        })?;

    let exit_code = output.status.code();
    debug!("{} exited with {:?}", program, exit_code);

    Ok(CommandOutput {
        command: rendered,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code,
        success: output.status.success(),
    })
}
