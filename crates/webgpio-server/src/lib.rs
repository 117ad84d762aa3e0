//! # webgpio-server
//!
//! Host implementations of the webgpio collaborators.
//!
//! This crate provides:
//! - [`AxumControlServer`] - the control surface on tokio + axum
//! - [`SimulatedStation`] - a station that "associates" instantly
//! - [`SimulatedPin`] - an output pin kept in memory
//! - [`FileConfigStore`] - the persistent config store as a JSON file
//!
//! ## Usage
//!
//! ```rust,ignore
//! let (events, dispatcher) = webgpio_core::event::channel();
//! let station = SimulatedStation::new(events.clone(), "192.168.1.10".parse()?);
//! let server = AxumControlServer::new(Handle::current(), Ipv4Addr::UNSPECIFIED.into());
//! let mut bringup = Bringup::new(&config, station, DirectoryMount::new(), server, actuator)?;
//! bringup.boot()?;
//! // The station keeps a sender alive, so the dispatcher never returns.
//! std::thread::spawn(move || dispatcher.run(bringup));
//! ```

pub mod pin;
pub mod routes;
pub mod server;
pub mod station;
pub mod store;

pub use pin::{PinMonitor, SimulatedPin};
pub use routes::build_router;
pub use server::{AxumControlServer, ServerHandle};
pub use station::SimulatedStation;
pub use store::FileConfigStore;
