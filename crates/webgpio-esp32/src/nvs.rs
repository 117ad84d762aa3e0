//! NVS (Non-Volatile Storage) config store for ESP32.
//!
//! `init` reports the two flash conditions that require an erase as
//! recoverable errors: `ESP_ERR_NVS_NO_FREE_PAGES` is
//! [`StoreError::Corrupt`], `ESP_ERR_NVS_NEW_VERSION_FOUND` is
//! [`StoreError::VersionMismatch`]. The core recovery policy erases once.

use esp_idf_svc::{
    nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault},
    sys::{
        esp_err_t, esp_err_to_name, nvs_flash_erase, nvs_flash_init, ESP_ERR_NVS_NEW_VERSION_FOUND,
        ESP_ERR_NVS_NO_FREE_PAGES, ESP_OK,
    },
};
use log::info;

use webgpio_core::error::StoreError;
use webgpio_core::ConfigStore;

/// Largest value read back from NVS.
const VALUE_BUF_LEN: usize = 96;

/// Key-value store in one NVS namespace of the default partition.
pub struct NvsConfigStore {
    namespace: &'static str,
    partition: Option<EspDefaultNvsPartition>,
    nvs: Option<EspNvs<NvsDefault>>,
}

impl NvsConfigStore {
    pub fn new(namespace: &'static str) -> Self {
        Self {
            namespace,
            partition: None,
            nvs: None,
        }
    }

    /// Partition handle for other drivers (Wi-Fi calibration data).
    pub fn partition(&self) -> Option<EspDefaultNvsPartition> {
        self.partition.clone()
    }

    fn nvs(&self) -> Result<&EspNvs<NvsDefault>, StoreError> {
        self.nvs.as_ref().ok_or(StoreError::NotInitialized)
    }
}

impl ConfigStore for NvsConfigStore {
    fn init(&mut self) -> Result<(), StoreError> {
        // SAFETY: plain FFI call with no arguments; ESP-IDF serializes it.
        init_status(unsafe { nvs_flash_init() })?;

        let partition = EspDefaultNvsPartition::take().map_err(|e| StoreError::Io(e.to_string()))?;
        let nvs = EspNvs::new(partition.clone(), self.namespace, true)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        info!("NVS namespace '{}' opened", self.namespace);

        self.partition = Some(partition);
        self.nvs = Some(nvs);
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        self.nvs = None;
        self.partition = None;
        // SAFETY: no NVS handles remain open.
        let code = unsafe { nvs_flash_erase() };
        if code != ESP_OK as esp_err_t {
            return Err(StoreError::Io(err_name(code)));
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut buf = [0u8; VALUE_BUF_LEN];
        self.nvs()?
            .get_str(key, &mut buf)
            .map(|value| value.map(str::to_string))
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.nvs
            .as_mut()
            .ok_or(StoreError::NotInitialized)?
            .set_str(key, value)
            .map_err(|e| StoreError::Io(e.to_string()))
    }
}

/// Classify the result of `nvs_flash_init`.
fn init_status(code: esp_err_t) -> Result<(), StoreError> {
    match code {
        c if c == ESP_OK as esp_err_t => Ok(()),
        c if c == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t => {
            Err(StoreError::Corrupt("no free pages".to_string()))
        }
        c if c == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t => Err(StoreError::VersionMismatch(
            "partition holds a newer NVS format".to_string(),
        )),
        c => Err(StoreError::Io(err_name(c))),
    }
}

fn err_name(code: esp_err_t) -> String {
    // SAFETY: esp_err_to_name returns a pointer to a static C string.
    let name = unsafe { std::ffi::CStr::from_ptr(esp_err_to_name(code)) };
    name.to_string_lossy().into_owned()
}
