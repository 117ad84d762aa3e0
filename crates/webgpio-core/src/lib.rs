//! # webgpio-core
//!
//! Bring-up and control-plane logic for a network-attached GPIO device.
//!
//! This crate provides:
//! - Device configuration and bounded Wi-Fi credentials
//! - The persistent config store contract and its erase-and-reinit policy
//! - Link events and the single-consumer event dispatcher
//! - The bring-up state machine (station → address → mount → control server)
//! - The control route table, static-asset and actuator handlers
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! making it usable on both Linux (tokio) and ESP32 (esp-idf) targets. The
//! radio, flash filesystem, HTTP listener and GPIO driver are reached through
//! the traits in [`station`], [`mount`], [`control`] and [`actuator`].

pub mod actuator;
pub mod bringup;
pub mod config;
pub mod control;
pub mod error;
pub mod event;
pub mod handlers;
pub mod mount;
pub mod routes;
pub mod station;
pub mod store;

pub use actuator::{Actuator, Level, OutputPin, Polarity, SharedActuator};
pub use bringup::{Bringup, BringupSnapshot, BringupState};
pub use config::{AuthMode, Credentials, DeviceConfig};
pub use control::ControlServer;
pub use event::{ConnectionEpoch, Dispatcher, EventSender, LinkEvent};
pub use handlers::{HandlerContext, Response};
pub use mount::{DirectoryMount, FilesystemMounter, MountInfo};
pub use routes::{Handler, Method, RouteEntry, RouteTable, StaticResource};
pub use station::Station;
pub use store::ConfigStore;
