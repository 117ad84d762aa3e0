//! Station-mode Wi-Fi on ESP32.
//!
//! Unlike a blocking connect helper, [`EspStation`] only issues requests to
//! the driver. Progress is reported through the system event loop (see
//! [`crate::events`]) and acted on by the bring-up state machine.

use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::{modem::Modem, peripheral},
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi},
};
use log::info;

use webgpio_core::error::StationError;
use webgpio_core::{AuthMode, Credentials, Station};

pub struct EspStation {
    wifi: EspWifi<'static>,
}

impl EspStation {
    /// Create the driver. `nvs` lets it cache calibration data.
    pub fn new(
        modem: impl peripheral::Peripheral<P = Modem> + 'static,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> anyhow::Result<Self> {
        let wifi = EspWifi::new(modem, sysloop, nvs)?;
        Ok(Self { wifi })
    }
}

impl Station for EspStation {
    fn configure(&mut self, credentials: &Credentials) -> Result<(), StationError> {
        let auth_method = if credentials.is_open() {
            info!("Wi-Fi passphrase is empty, using open network");
            AuthMethod::None
        } else {
            auth_method(credentials.min_auth_mode())
        };

        // Both sides are bounded to the same capacities, so these never fail
        // for validated credentials.
        let ssid = credentials
            .ssid()
            .try_into()
            .map_err(|_| StationError::Configure("SSID exceeds driver capacity".to_string()))?;
        let password = credentials.passphrase().try_into().map_err(|_| {
            StationError::Configure("passphrase exceeds driver capacity".to_string())
        })?;

        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration {
                ssid,
                password,
                auth_method,
                ..Default::default()
            }))
            .map_err(|e| StationError::Configure(e.to_string()))
    }

    fn start(&mut self) -> Result<(), StationError> {
        self.wifi
            .start()
            .map_err(|e| StationError::Start(e.to_string()))
    }

    fn connect(&mut self) -> Result<(), StationError> {
        self.wifi
            .connect()
            .map_err(|e| StationError::Connect(e.to_string()))
    }
}

/// Weakest security the station accepts.
fn auth_method(mode: AuthMode) -> AuthMethod {
    match mode {
        AuthMode::Open => AuthMethod::None,
        AuthMode::Wep => AuthMethod::WEP,
        AuthMode::WpaPsk => AuthMethod::WPA,
        AuthMode::Wpa2Psk => AuthMethod::WPA2Personal,
        AuthMode::WpaWpa2Psk => AuthMethod::WPAWPA2Personal,
        AuthMode::Wpa3Psk => AuthMethod::WPA3Personal,
        AuthMode::Wpa2Wpa3Psk => AuthMethod::WPA2WPA3Personal,
    }
}
