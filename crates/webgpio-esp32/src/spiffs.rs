//! SPIFFS registration with the ESP-IDF VFS.

use std::ffi::CString;
use std::path::PathBuf;
use std::ptr;

use esp_idf_svc::sys::{
    esp_err_t, esp_spiffs_info, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register, ESP_ERR_NOT_FOUND,
    ESP_FAIL, ESP_OK,
};
use log::warn;

use webgpio_core::config::FsConfig;
use webgpio_core::error::MountError;
use webgpio_core::{FilesystemMounter, MountInfo};

#[derive(Debug, Default)]
pub struct SpiffsMount {
    /// C strings handed to the VFS; kept for the mount's lifetime.
    base_path: Option<CString>,
    label: Option<CString>,
}

impl SpiffsMount {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FilesystemMounter for SpiffsMount {
    fn mount(&mut self, config: &FsConfig) -> Result<MountInfo, MountError> {
        let base_path = CString::new(config.base_path.to_string_lossy().as_bytes())
            .map_err(|e| MountError::Other(e.to_string()))?;
        let label = config
            .partition_label
            .as_deref()
            .map(CString::new)
            .transpose()
            .map_err(|e| MountError::Other(e.to_string()))?;
        let label_ptr = label.as_ref().map_or(ptr::null(), |l| l.as_ptr());

        let conf = esp_vfs_spiffs_conf_t {
            base_path: base_path.as_ptr(),
            partition_label: label_ptr,
            max_files: config.max_files,
            format_if_mount_failed: config.format_if_mount_failed,
        };

        // SAFETY: `conf` and the strings it points to outlive the call.
        let code = unsafe { esp_vfs_spiffs_register(&conf) };
        if code != ESP_OK as esp_err_t {
            return Err(mount_error(code));
        }

        let mut total = 0usize;
        let mut used = 0usize;
        // SAFETY: the partition was registered above; out-params are valid.
        let code = unsafe { esp_spiffs_info(label_ptr, &mut total, &mut used) };
        let (total_bytes, used_bytes) = if code == ESP_OK as esp_err_t {
            (Some(total as u64), used as u64)
        } else {
            warn!("Failed to get SPIFFS partition information ({})", code);
            (None, 0)
        };

        self.base_path = Some(base_path);
        self.label = label;
        Ok(MountInfo {
            base_path: PathBuf::from(&config.base_path),
            total_bytes,
            used_bytes,
        })
    }
}

fn mount_error(code: esp_err_t) -> MountError {
    if code == ESP_FAIL {
        MountError::Failed
    } else if code == ESP_ERR_NOT_FOUND as esp_err_t {
        MountError::PartitionNotFound
    } else {
        MountError::Other(format!("esp_err_t {}", code))
    }
}
