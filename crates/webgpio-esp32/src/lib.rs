//! ESP32 adapters for webgpio.
//!
//! This crate implements the core crate's collaborator traits on ESP-IDF:
//! - [`wifi::EspStation`] - station-mode Wi-Fi ([`Station`](webgpio_core::Station))
//! - [`events`] - system event loop subscriptions feeding the dispatcher
//! - [`nvs::NvsConfigStore`] - NVS flash ([`ConfigStore`](webgpio_core::ConfigStore))
//! - [`spiffs::SpiffsMount`] - SPIFFS VFS registration
//! - [`http::EspControlServer`] - the control surface on `EspHttpServer`
//! - [`gpio::EspOutputPin`] - a GPIO output driver
//!
//! # Example
//!
//! ```ignore
//! let (events, dispatcher) = webgpio_core::event::channel();
//! let _subscriptions = webgpio_esp32::events::subscribe(&sysloop, events)?;
//! let station = EspStation::new(peripherals.modem, sysloop, store.partition())?;
//! let mut bringup = Bringup::new(&config, station, SpiffsMount::new(), EspControlServer, actuator)?;
//! bringup.boot()?;
//! dispatcher.run(bringup);
//! ```

pub mod events;
pub mod gpio;
pub mod http;
pub mod nvs;
pub mod spiffs;
pub mod wifi;
