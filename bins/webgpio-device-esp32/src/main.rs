//! webgpio firmware for ESP32.
//!
//! This binary requires the ESP32 Rust toolchain.
//! It will not compile with the standard Rust toolchain.

use esp_idf_hal::gpio::AnyOutputPin;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::log::EspLogger;
use log::{error, info};

use webgpio_core::store::{init_with_recovery, load_wifi, provision_wifi};
use webgpio_core::{event, Actuator, Bringup, DeviceConfig};
use webgpio_esp32::events;
use webgpio_esp32::gpio::EspOutputPin;
use webgpio_esp32::http::EspControlServer;
use webgpio_esp32::nvs::NvsConfigStore;
use webgpio_esp32::spiffs::SpiffsMount;
use webgpio_esp32::wifi::EspStation;

const NVS_NAMESPACE: &str = "webgpio";

fn main() {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    if let Err(e) = run() {
        error!("Startup failed: {:?}", e);
        // SAFETY: no invariants to uphold; the chip resets.
        unsafe { esp_idf_svc::sys::esp_restart() };
    }
}

fn run() -> anyhow::Result<()> {
    info!("webgpio starting...");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    let mut store = NvsConfigStore::new(NVS_NAMESPACE);
    init_with_recovery(&mut store)?;

    let mut config = DeviceConfig::default();
    config.wifi.ssid = option_env!("WEBGPIO_SSID").unwrap_or_default().to_string();
    config.wifi.passphrase = option_env!("WEBGPIO_PASSPHRASE")
        .unwrap_or_default()
        .to_string();
    // Build-time credentials seed a blank NVS; stored values win afterwards.
    provision_wifi(&mut store, &config.wifi)?;
    config.wifi = load_wifi(&store, &config.wifi)?;

    let (sender, dispatcher) = event::channel();
    let _subscriptions = events::subscribe(&sysloop, sender)?;

    let station = EspStation::new(peripherals.modem, sysloop, store.partition())?;

    // SAFETY: the configured pin is used by nothing else in this firmware.
    let pin = unsafe { AnyOutputPin::new(i32::from(config.gpio.pin)) };
    let actuator = Actuator::shared(Box::new(EspOutputPin::new(pin)?), config.gpio.polarity)
        .map_err(|e| anyhow::anyhow!("GPIO{} setup failed: {}", config.gpio.pin, e))?;

    let mut bringup = Bringup::new(
        &config,
        station,
        SpiffsMount::new(),
        EspControlServer,
        actuator,
    )?;
    bringup.boot()?;

    // Event callbacks hold the senders, so this runs for the device lifetime.
    dispatcher.run(bringup);
    Ok(())
}
