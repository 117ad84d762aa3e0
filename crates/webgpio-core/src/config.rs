//! Device configuration.
//!
//! Everything the bring-up sequence consumes lives here: station credentials,
//! the actuator pin, the control server listener and the flash mount. On Linux
//! the configuration is read from a JSON file; on ESP32 it is compiled in and
//! the credentials are overlaid from NVS (see [`crate::store`]).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::actuator::Polarity;
use crate::error::{ConfigError, CredentialError, CredentialField};
use crate::routes::Method;

/// Capacity of the station SSID buffer, in bytes.
pub const SSID_MAX_LEN: usize = 32;

/// Capacity of the station passphrase buffer, in bytes.
pub const PASSPHRASE_MAX_LEN: usize = 64;

/// Minimum security an access point must offer before the station associates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Open,
    Wep,
    WpaPsk,
    #[default]
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa3Psk,
    Wpa2Wpa3Psk,
}

/// Full device configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub wifi: WifiConfig,
    pub gpio: GpioConfig,
    pub http: HttpConfig,
    pub fs: FsConfig,
}

impl DeviceConfig {
    /// Parse a configuration document. Missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate the Wi-Fi section into fixed-capacity credentials.
    pub fn credentials(&self) -> Result<Credentials, CredentialError> {
        Credentials::new(
            &self.wifi.ssid,
            &self.wifi.passphrase,
            self.wifi.min_auth_mode,
        )
    }
}

/// Station-mode Wi-Fi settings, as stored.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    /// Network SSID.
    pub ssid: String,

    /// Network passphrase (empty for open networks).
    pub passphrase: String,

    /// Security floor for association.
    pub min_auth_mode: AuthMode,
}

impl fmt::Debug for WifiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiConfig")
            .field("ssid", &self.ssid)
            .field("passphrase", &"<redacted>")
            .field("min_auth_mode", &self.min_auth_mode)
            .finish()
    }
}

/// Actuator pin settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// GPIO number driving the output.
    pub pin: u8,

    /// Electrical level that means "on".
    pub polarity: Polarity,

    /// HTTP method accepted by `/gpio/on` and `/gpio/off`.
    pub method: Method,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            pin: 4,
            polarity: Polarity::ActiveLow,
            method: Method::Post,
        }
    }
}

/// Control server listener settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen port. Port 0 asks the host for an ephemeral port.
    pub port: u16,

    /// Maximum pending connections.
    pub max_open_sockets: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 80,
            max_open_sockets: 7,
        }
    }
}

/// Flash filesystem mount settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Logical root the store is mounted at.
    pub base_path: PathBuf,

    /// Flash partition label; `None` selects the first data partition.
    pub partition_label: Option<String>,

    /// Maximum files open at the same time.
    pub max_files: usize,

    /// Format the partition when it cannot be mounted.
    pub format_if_mount_failed: bool,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("/spiffs"),
            partition_label: None,
            max_files: 5,
            format_if_mount_failed: false,
        }
    }
}

/// Validated station credentials held in fixed-capacity buffers.
///
/// Over-long input is rejected rather than truncated, so a configured SSID
/// either reaches the radio exactly as written or not at all.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    ssid: heapless::String<SSID_MAX_LEN>,
    passphrase: heapless::String<PASSPHRASE_MAX_LEN>,
    min_auth_mode: AuthMode,
}

impl Credentials {
    pub fn new(
        ssid: &str,
        passphrase: &str,
        min_auth_mode: AuthMode,
    ) -> Result<Self, CredentialError> {
        if ssid.is_empty() {
            return Err(CredentialError::Empty {
                field: CredentialField::Ssid,
            });
        }

        Ok(Self {
            ssid: bounded(CredentialField::Ssid, ssid)?,
            passphrase: bounded(CredentialField::Passphrase, passphrase)?,
            min_auth_mode,
        })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn min_auth_mode(&self) -> AuthMode {
        self.min_auth_mode
    }

    /// Open networks carry no passphrase.
    pub fn is_open(&self) -> bool {
        self.passphrase.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid.as_str())
            .field("passphrase", &"<redacted>")
            .field("min_auth_mode", &self.min_auth_mode)
            .finish()
    }
}

fn bounded<const N: usize>(
    field: CredentialField,
    value: &str,
) -> Result<heapless::String<N>, CredentialError> {
    let too_long = CredentialError::TooLong {
        field,
        len: value.len(),
        max: N,
    };
    if value.len() > N {
        return Err(too_long);
    }

    let mut buffer = heapless::String::new();
    buffer.push_str(value).map_err(|_| too_long)?;
    Ok(buffer)
}
