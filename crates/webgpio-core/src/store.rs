//! Persistent config store abstraction.
//!
//! This module provides the trait the durable key-value store implements on
//! each platform:
//! - Linux: a JSON file (`webgpio_server::FileConfigStore`)
//! - ESP32: NVS flash (`webgpio_esp32::nvs::NvsConfigStore`)
//!
//! It also owns the recovery policy: a store reporting corrupt or
//! incompatible contents is erased and initialized once more, and a second
//! failure is fatal to startup.

use tracing::{info, warn};

use crate::config::WifiConfig;
use crate::error::StoreError;

/// Key holding the station SSID.
pub const KEY_SSID: &str = "wifi.ssid";

/// Key holding the station passphrase.
pub const KEY_PASSPHRASE: &str = "wifi.pass";

/// Durable string key-value store.
///
/// All methods are synchronous to support embedded platforms.
pub trait ConfigStore {
    /// Open the store. May report [`StoreError::Corrupt`] or
    /// [`StoreError::VersionMismatch`].
    fn init(&mut self) -> Result<(), StoreError>;

    /// Wipe all contents.
    fn erase(&mut self) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Initialize `store`, erasing it once if its contents are unusable.
pub fn init_with_recovery<S: ConfigStore + ?Sized>(store: &mut S) -> Result<(), StoreError> {
    match store.init() {
        Ok(()) => Ok(()),
        Err(e) if e.is_recoverable() => {
            warn!("{}; erasing config store", e);
            store.erase()?;
            store.init()?;
            info!("Config store erased and re-initialized");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Overlay stored credentials on `defaults`.
///
/// Keys that are absent keep the default value.
pub fn load_wifi<S: ConfigStore + ?Sized>(
    store: &S,
    defaults: &WifiConfig,
) -> Result<WifiConfig, StoreError> {
    let mut wifi = defaults.clone();
    if let Some(ssid) = store.get(KEY_SSID)? {
        wifi.ssid = ssid;
    }
    if let Some(passphrase) = store.get(KEY_PASSPHRASE)? {
        wifi.passphrase = passphrase;
    }
    Ok(wifi)
}

/// Persist station credentials.
pub fn save_wifi<S: ConfigStore + ?Sized>(
    store: &mut S,
    wifi: &WifiConfig,
) -> Result<(), StoreError> {
    store.set(KEY_SSID, &wifi.ssid)?;
    store.set(KEY_PASSPHRASE, &wifi.passphrase)
}

/// Seed an unprovisioned store with `defaults`.
///
/// Writes only when the store holds no SSID and `defaults` names one.
/// Returns whether anything was written.
pub fn provision_wifi<S: ConfigStore + ?Sized>(
    store: &mut S,
    defaults: &WifiConfig,
) -> Result<bool, StoreError> {
    if defaults.ssid.is_empty() || store.get(KEY_SSID)?.is_some() {
        return Ok(false);
    }
    save_wifi(store, defaults)?;
    info!("Provisioned config store with station '{}'", defaults.ssid);
    Ok(true)
}
