//! Flash filesystem mount.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::FsConfig;
use crate::error::MountError;

/// Result of a successful mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// Root the store is reachable at.
    pub base_path: PathBuf,
    /// Partition capacity, when the backend reports it.
    pub total_bytes: Option<u64>,
    pub used_bytes: u64,
}

/// Mounts the asset store. Called at most once per process.
pub trait FilesystemMounter {
    fn mount(&mut self, config: &FsConfig) -> Result<MountInfo, MountError>;
}

/// Treats an existing host directory as the flash store.
///
/// A missing directory plays the part of a missing partition; with
/// `format_if_mount_failed` set it is created empty instead.
#[derive(Debug, Default)]
pub struct DirectoryMount;

impl DirectoryMount {
    pub fn new() -> Self {
        Self
    }
}

impl FilesystemMounter for DirectoryMount {
    fn mount(&mut self, config: &FsConfig) -> Result<MountInfo, MountError> {
        let base_path = config.base_path.clone();

        match fs::metadata(&base_path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(MountError::Failed),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if !config.format_if_mount_failed {
                    return Err(MountError::PartitionNotFound);
                }
                warn!("{} missing, formatting", base_path.display());
                fs::create_dir_all(&base_path).map_err(|_| MountError::Failed)?;
            }
            Err(e) => return Err(MountError::Other(e.to_string())),
        }

        let used_bytes = fs::read_dir(&base_path)
            .map_err(|e| MountError::Other(e.to_string()))?
            .filter_map(Result::ok)
            .filter_map(|entry| entry.metadata().ok())
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len())
            .sum();

        info!(
            "Directory store mounted at {} ({} bytes used)",
            base_path.display(),
            used_bytes
        );

        Ok(MountInfo {
            base_path,
            total_bytes: None,
            used_bytes,
        })
    }
}
