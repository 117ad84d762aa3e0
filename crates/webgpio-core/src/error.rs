//! Error types for every subsystem the bring-up sequence touches.
//!
//! Each error is handled at the boundary where it occurs. Only an
//! unrecoverable [`StoreError`] or an invalid credential is allowed to stop
//! the process; everything else is logged and contained.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which credential field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Ssid,
    Passphrase,
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialField::Ssid => write!(f, "SSID"),
            CredentialField::Passphrase => write!(f, "passphrase"),
        }
    }
}

/// A credential could not be copied into its fixed-capacity buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("{field} cannot be empty")]
    Empty { field: CredentialField },

    #[error("{field} is {len} bytes, maximum is {max}")]
    TooLong {
        field: CredentialField,
        len: usize,
        max: usize,
    },
}

/// Errors loading a [`DeviceConfig`](crate::config::DeviceConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid credentials: {0}")]
    Credentials(#[from] CredentialError),
}

/// Errors reported by the persistent config store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store contents cannot be interpreted (no free pages, bad data).
    #[error("Config store is corrupt: {0}")]
    Corrupt(String),

    /// The store was written in a format this build cannot read.
    #[error("Config store format is not supported: {0}")]
    VersionMismatch(String),

    /// The backing storage failed.
    #[error("Config store I/O error: {0}")]
    Io(String),

    /// The store has not been initialized.
    #[error("Config store is not initialized")]
    NotInitialized,
}

impl StoreError {
    /// Whether erasing the store and initializing again may fix this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::Corrupt(_) | StoreError::VersionMismatch(_)
        )
    }
}

/// Errors reported by a [`Station`](crate::station::Station) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StationError {
    #[error("Station configuration rejected: {0}")]
    Configure(String),

    #[error("Station failed to start: {0}")]
    Start(String),

    #[error("Connection attempt failed: {0}")]
    Connect(String),
}

/// Filesystem mount failure kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("failed to mount or format filesystem")]
    Failed,

    #[error("failed to find flash partition")]
    PartitionNotFound,

    #[error("failed to initialize filesystem ({0})")]
    Other(String),
}

/// The control server could not claim its listen port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to bind control server on port {port}: {reason}")]
pub struct BindError {
    pub port: u16,
    pub reason: String,
}

/// Per-request failure while serving a static resource.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Failed to open {}: {source}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Not enough memory to buffer {} ({size} bytes)", path.display())]
    AllocationFailed { path: PathBuf, size: u64 },
}

/// Errors reported by an [`OutputPin`](crate::actuator::OutputPin).
pub type PinError = Box<dyn std::error::Error + Send + Sync>;
