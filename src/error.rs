//! Error handling module for nixpool
//!
//! Every failure in the provisioning pipeline maps onto one of these variants.
//! Nothing recovers locally: the orchestrator wraps the failure with the
//! name of the step that produced it and aborts the run.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the provisioning pipeline
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Block device enumeration failed or returned an unparsable payload
    #[error("Enumeration error: {0}")]
    Enumeration(String),

    /// Machine ID missing, unreadable or empty
    #[error("Identity error: {0}")]
    Identity(String),

    /// Password prompt or hashing failed
    #[error("Credential error: {0}")]
    Credential(String),

    /// A config file or template could not be read or written
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A subprocess exited non-zero where success is required
    #[error("Subprocess `{command}` failed (exit code {code}): {stderr}")]
    Subprocess {
        command: String,
        code: i32,
        stderr: String,
    },

    /// Invalid provisioning intent
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure of a named orchestration step
    #[error("{step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<ProvisionError>,
    },
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    /// Create an enumeration error
    pub fn enumeration(msg: impl Into<String>) -> Self {
        Self::Enumeration(msg.into())
    }

    /// Create an identity error
    pub fn identity(msg: impl Into<String>) -> Self {
        Self::Identity(msg.into())
    }

    /// Create a credential error
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Attach a path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap an error with the orchestration step it came from
    pub fn in_step(self, step: &'static str) -> Self {
        Self::Step {
            step,
            source: Box::new(self),
        }
    }

    /// Name of the failing step, if this error was raised by the orchestrator
    pub fn step(&self) -> Option<&'static str> {
        match self {
            Self::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}
