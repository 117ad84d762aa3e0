//! Bring-up state machine.
//!
//! Sequences subsystem startup strictly in response to [`LinkEvent`]s:
//!
//! ```text
//! Uninitialized ─boot→ StationStarting ─LINK_STARTED→ Connecting ─LINK_UP→ Connected
//!     ─ADDRESS_ACQUIRED→ AddressAcquired → FilesystemMounted → ServerRunning
//! ```
//!
//! Every `LINK_DOWN` triggers exactly one reconnect attempt. A drop after an
//! address was acquired parks the machine in `Disconnected` but leaves the
//! filesystem mounted and the control server running.
//!
//! Mounting and server start are guarded by a one-shot setup latch that fires
//! on the first address acquisition of the process lifetime. Later
//! acquisitions never repeat them, whether the first attempt succeeded or not.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error, info, warn};

use crate::actuator::SharedActuator;
use crate::config::{Credentials, DeviceConfig, FsConfig, HttpConfig};
use crate::control::ControlServer;
use crate::error::{CredentialError, StationError};
use crate::event::{ConnectionEpoch, LinkEvent};
use crate::handlers::HandlerContext;
use crate::mount::{FilesystemMounter, MountInfo};
use crate::routes::RouteTable;
use crate::station::Station;

/// Device readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BringupState {
    Uninitialized,
    StationStarting,
    Connecting,
    /// Associated, waiting for an address.
    Connected,
    AddressAcquired,
    FilesystemMounted,
    ServerRunning,
    /// Link lost after an address was acquired.
    Disconnected,
}

impl BringupState {
    /// Whether an address has been acquired on the current link.
    pub fn has_address(self) -> bool {
        matches!(
            self,
            BringupState::AddressAcquired
                | BringupState::FilesystemMounted
                | BringupState::ServerRunning
        )
    }
}

impl fmt::Display for BringupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Point-in-time view of the machine, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BringupSnapshot {
    pub state: BringupState,
    pub epoch: ConnectionEpoch,
    pub ip: Option<Ipv4Addr>,
    pub connect_attempts: u32,
    pub filesystem_mounted: bool,
    pub server_running: bool,
}

/// Owns the station, mounter and control server and drives them from
/// dispatched events.
pub struct Bringup<S, M, C: ControlServer> {
    station: S,
    mounter: M,
    server: C,

    credentials: Credentials,
    fs: FsConfig,
    http: HttpConfig,
    routes: Option<RouteTable>,
    actuator: SharedActuator,

    state: BringupState,
    epoch: ConnectionEpoch,
    ip: Option<Ipv4Addr>,
    connect_attempts: u32,

    /// Set by the first address acquisition; never cleared.
    setup_latch: AtomicBool,
    mount: Option<MountInfo>,
    handle: Option<C::Handle>,
}

impl<S, M, C> Bringup<S, M, C>
where
    S: Station,
    M: FilesystemMounter,
    C: ControlServer,
{
    /// Assemble the machine from its collaborators.
    ///
    /// Credentials are validated here so an over-long SSID or passphrase
    /// stops startup before the radio is touched.
    pub fn new(
        config: &DeviceConfig,
        station: S,
        mounter: M,
        server: C,
        actuator: SharedActuator,
    ) -> Result<Self, CredentialError> {
        Ok(Self {
            station,
            mounter,
            server,
            credentials: config.credentials()?,
            fs: config.fs.clone(),
            http: config.http,
            routes: Some(RouteTable::control(config.gpio.method)),
            actuator,
            state: BringupState::Uninitialized,
            epoch: ConnectionEpoch::default(),
            ip: None,
            connect_attempts: 0,
            setup_latch: AtomicBool::new(false),
            mount: None,
            handle: None,
        })
    }

    /// Configure and start the station. `LINK_STARTED` follows asynchronously.
    pub fn boot(&mut self) -> Result<(), StationError> {
        if self.state != BringupState::Uninitialized {
            warn!("Station already booted (state {})", self.state);
            return Ok(());
        }

        info!(
            "Configuring station for '{}' (min auth {:?})",
            self.credentials.ssid(),
            self.credentials.min_auth_mode()
        );
        self.station.configure(&self.credentials)?;
        self.station.start()?;
        self.transition(BringupState::StationStarting);
        Ok(())
    }

    /// Advance the machine for one event.
    pub fn handle_event(&mut self, event: LinkEvent) {
        debug!(state = %self.state, epoch = %self.epoch, "Handling {}", event);

        match event {
            LinkEvent::LinkStarted => {
                info!("Wi-Fi station started. Connecting...");
                self.connect();
                if matches!(
                    self.state,
                    BringupState::Uninitialized | BringupState::StationStarting
                ) {
                    self.transition(BringupState::Connecting);
                }
            }
            LinkEvent::LinkUp => {
                if self.state == BringupState::Connecting {
                    self.transition(BringupState::Connected);
                }
            }
            LinkEvent::LinkDown => {
                self.epoch = self.epoch.next();
                self.ip = None;
                warn!(epoch = %self.epoch, "Disconnected from Wi-Fi. Retrying to connect...");
                self.connect();

                let next = match self.state {
                    state if state.has_address() => BringupState::Disconnected,
                    BringupState::Connected => BringupState::Connecting,
                    state => state,
                };
                self.transition(next);
            }
            LinkEvent::AddressAcquired(ip) => {
                info!("Got IP address: {}", ip);
                self.ip = Some(ip);
                self.transition(BringupState::AddressAcquired);

                if self.setup_latch.swap(true, Ordering::SeqCst) {
                    debug!("Setup latch already fired, keeping mount and server as they are");
                } else {
                    self.first_setup();
                }
                let resumed = self.resumed_state();
                self.transition(resumed);
            }
        }
    }

    /// Mount, then start the control server. Runs once per process.
    fn first_setup(&mut self) {
        let info = match self.mounter.mount(&self.fs) {
            Ok(info) => info,
            Err(e) => {
                error!(
                    "Filesystem mount at {} failed: {}; HTTP service disabled",
                    self.fs.base_path.display(),
                    e
                );
                return;
            }
        };
        match info.total_bytes {
            Some(total) => info!(
                "Filesystem mounted at {}: total = {} bytes, used = {} bytes",
                info.base_path.display(),
                total,
                info.used_bytes
            ),
            None => info!(
                "Filesystem mounted at {}: used = {} bytes",
                info.base_path.display(),
                info.used_bytes
            ),
        }
        let ctx = HandlerContext {
            assets_root: info.base_path.clone(),
            actuator: self.actuator.clone(),
        };
        self.mount = Some(info);
        self.transition(BringupState::FilesystemMounted);

        let Some(routes) = self.routes.take() else {
            return;
        };
        let route_count = routes.len();
        match self.server.start(&self.http, routes, ctx) {
            Ok(handle) => {
                info!(
                    "HTTP server started on port {} with {} routes",
                    self.http.port, route_count
                );
                self.handle = Some(handle);
                self.transition(BringupState::ServerRunning);
            }
            Err(e) => error!("{}; HTTP service disabled", e),
        }
    }

    /// Highest state the live subsystems justify once an address is held.
    fn resumed_state(&self) -> BringupState {
        if self.handle.is_some() {
            BringupState::ServerRunning
        } else if self.mount.is_some() {
            BringupState::FilesystemMounted
        } else {
            BringupState::AddressAcquired
        }
    }

    fn connect(&mut self) {
        self.connect_attempts = self.connect_attempts.saturating_add(1);
        if let Err(e) = self.station.connect() {
            warn!(attempt = self.connect_attempts, "{}", e);
        }
    }

    fn transition(&mut self, next: BringupState) {
        if self.state != next {
            debug!(epoch = %self.epoch, "Bring-up {} -> {}", self.state, next);
            self.state = next;
        }
    }

    pub fn state(&self) -> BringupState {
        self.state
    }

    pub fn epoch(&self) -> ConnectionEpoch {
        self.epoch
    }

    pub fn snapshot(&self) -> BringupSnapshot {
        BringupSnapshot {
            state: self.state,
            epoch: self.epoch,
            ip: self.ip,
            connect_attempts: self.connect_attempts,
            filesystem_mounted: self.mount.is_some(),
            server_running: self.handle.is_some(),
        }
    }

    pub fn mount_info(&self) -> Option<&MountInfo> {
        self.mount.as_ref()
    }

    /// Handle of the running control server, if it started.
    pub fn server_handle(&self) -> Option<&C::Handle> {
        self.handle.as_ref()
    }

    pub fn station(&self) -> &S {
        &self.station
    }

    pub fn mounter(&self) -> &M {
        &self.mounter
    }

    pub fn control_server(&self) -> &C {
        &self.server
    }
}
