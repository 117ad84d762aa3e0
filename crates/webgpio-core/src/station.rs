//! Wireless station contract.

use crate::config::Credentials;
use crate::error::StationError;

/// Station-mode interface driven by the bring-up state machine.
///
/// `start` and `connect` only initiate work. Their outcome arrives later as
/// [`LinkEvent`](crate::event::LinkEvent)s on the dispatcher channel.
pub trait Station {
    /// Apply credentials and the security floor.
    fn configure(&mut self, credentials: &Credentials) -> Result<(), StationError>;

    /// Bring the interface up. Followed by `LinkStarted`.
    fn start(&mut self) -> Result<(), StationError>;

    /// Begin association. Safe to call repeatedly.
    fn connect(&mut self) -> Result<(), StationError>;
}
