//! Link lifecycle events and the dispatcher that feeds them to the
//! bring-up state machine.
//!
//! Producers (the network stack's event callbacks, or a simulated station)
//! hold an [`EventSender`]. A single [`Dispatcher`] consumes the channel, so
//! events reach the state machine strictly in the order they were sent.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::mpsc;

use tracing::{debug, info, warn};

use crate::bringup::Bringup;
use crate::control::ControlServer;
use crate::mount::FilesystemMounter;
use crate::station::Station;

/// Lifecycle events emitted by the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The station interface is up and may associate.
    LinkStarted,
    /// Associated with the access point; no address yet.
    LinkUp,
    /// Association lost (or an attempt failed).
    LinkDown,
    /// DHCP lease obtained.
    AddressAcquired(Ipv4Addr),
}

impl fmt::Display for LinkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkEvent::LinkStarted => write!(f, "LINK_STARTED"),
            LinkEvent::LinkUp => write!(f, "LINK_UP"),
            LinkEvent::LinkDown => write!(f, "LINK_DOWN"),
            LinkEvent::AddressAcquired(ip) => write!(f, "ADDRESS_ACQUIRED({})", ip),
        }
    }
}

/// Generation counter for connection attempt cycles.
///
/// Starts at 0 at boot and advances on every drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionEpoch(u32);

impl ConnectionEpoch {
    pub fn value(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for ConnectionEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Create a connected sender/dispatcher pair.
pub fn channel() -> (EventSender, Dispatcher) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, Dispatcher { rx })
}

/// Cloneable producer side of the event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<LinkEvent>,
}

impl EventSender {
    /// Queue an event. Returns `false` once the dispatcher is gone.
    pub fn send(&self, event: LinkEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(_) => {
                warn!("Dropped {}: dispatcher stopped", event);
                false
            }
        }
    }
}

/// Single consumer of the event channel.
#[derive(Debug)]
pub struct Dispatcher {
    rx: mpsc::Receiver<LinkEvent>,
}

impl Dispatcher {
    /// Wait for the next event. `None` once every sender is gone.
    pub fn next_event(&self) -> Option<LinkEvent> {
        self.rx.recv().ok()
    }

    /// Take the next queued event without waiting.
    pub fn try_next_event(&self) -> Option<LinkEvent> {
        self.rx.try_recv().ok()
    }

    /// Deliver events until every sender is dropped, then hand the state
    /// machine back.
    ///
    /// Blocks the calling thread. Mount and server start run inside this
    /// loop, so it must run on a context that tolerates blocking.
    pub fn run<S, M, C>(self, mut bringup: Bringup<S, M, C>) -> Bringup<S, M, C>
    where
        S: Station,
        M: FilesystemMounter,
        C: ControlServer,
    {
        info!("Event dispatcher running");
        while let Some(event) = self.next_event() {
            bringup.handle_event(event);
        }
        info!("Event channel closed, dispatcher stopping");
        bringup
    }

    /// Deliver whatever is queued right now without blocking.
    ///
    /// Returns the number of events delivered.
    pub fn drain<S, M, C>(&self, bringup: &mut Bringup<S, M, C>) -> usize
    where
        S: Station,
        M: FilesystemMounter,
        C: ControlServer,
    {
        let mut delivered = 0;
        while let Some(event) = self.try_next_event() {
            bringup.handle_event(event);
            delivered += 1;
        }
        debug!(delivered, "Drained event queue");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_advances() {
        let epoch = ConnectionEpoch::default();
        assert_eq!(epoch.value(), 0);
        assert_eq!(epoch.next().next().value(), 2);
        assert!(epoch < epoch.next());
    }

    #[test]
    fn test_event_display_names() {
        assert_eq!(LinkEvent::LinkDown.to_string(), "LINK_DOWN");
        assert_eq!(
            LinkEvent::AddressAcquired(Ipv4Addr::new(192, 168, 1, 10)).to_string(),
            "ADDRESS_ACQUIRED(192.168.1.10)"
        );
    }

    #[test]
    fn test_send_after_dispatcher_dropped_reports_failure() {
        let (tx, dispatcher) = channel();
        assert!(tx.send(LinkEvent::LinkStarted));
        drop(dispatcher);
        assert!(!tx.send(LinkEvent::LinkStarted));
    }
}
