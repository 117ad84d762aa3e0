//! Simulated Wi-Fi station for host runs.
//!
//! Emits the same event sequence the ESP32 network stack does, without a
//! radio: `start` queues `LINK_STARTED`, and every `connect` queues
//! `LINK_UP` followed by `ADDRESS_ACQUIRED` with the configured address.
//! Link drops are injected through [`SimulatedStation::link_events`].

use std::net::Ipv4Addr;

use tracing::{debug, info};

use webgpio_core::error::StationError;
use webgpio_core::{Credentials, EventSender, LinkEvent, Station};

pub struct SimulatedStation {
    events: EventSender,
    ip: Ipv4Addr,
    ssid: Option<String>,
    started: bool,
    connects: u32,
}

impl SimulatedStation {
    pub fn new(events: EventSender, ip: Ipv4Addr) -> Self {
        Self {
            events,
            ip,
            ssid: None,
            started: false,
            connects: 0,
        }
    }

    /// Sender for injecting events such as `LINK_DOWN`.
    pub fn link_events(&self) -> EventSender {
        self.events.clone()
    }

    /// Number of association attempts so far.
    pub fn connects(&self) -> u32 {
        self.connects
    }
}

impl Station for SimulatedStation {
    fn configure(&mut self, credentials: &Credentials) -> Result<(), StationError> {
        info!(
            "Simulated station configured for '{}' (min auth {:?})",
            credentials.ssid(),
            credentials.min_auth_mode()
        );
        self.ssid = Some(credentials.ssid().to_string());
        Ok(())
    }

    fn start(&mut self) -> Result<(), StationError> {
        if self.ssid.is_none() {
            return Err(StationError::Start("station not configured".to_string()));
        }
        self.started = true;
        self.events.send(LinkEvent::LinkStarted);
        Ok(())
    }

    fn connect(&mut self) -> Result<(), StationError> {
        if !self.started {
            return Err(StationError::Connect("station not started".to_string()));
        }
        self.connects += 1;
        debug!(attempt = self.connects, "Simulated association");
        self.events.send(LinkEvent::LinkUp);
        self.events.send(LinkEvent::AddressAcquired(self.ip));
        Ok(())
    }
}
