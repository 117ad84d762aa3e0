//! The physical output pin driven by control requests.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PinError;

/// Logical actuator level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    On,
    Off,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::On => write!(f, "ON"),
            Level::Off => write!(f, "OFF"),
        }
    }
}

/// Mapping from logical level to electrical level.
///
/// Fixed per deployment; never inferred at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    ActiveHigh,
    /// "On" drives the pin low (LED wired to the supply rail).
    #[default]
    ActiveLow,
}

impl Polarity {
    /// Returns `true` when `level` means driving the pin high.
    pub fn is_high(self, level: Level) -> bool {
        match (self, level) {
            (Polarity::ActiveHigh, Level::On) | (Polarity::ActiveLow, Level::Off) => true,
            (Polarity::ActiveHigh, Level::Off) | (Polarity::ActiveLow, Level::On) => false,
        }
    }
}

/// Electrical output pin provided by the platform HAL.
pub trait OutputPin: Send {
    /// Configure the pin as a push-pull output.
    fn set_output(&mut self) -> Result<(), PinError>;

    /// Drive the pin high (`true`) or low (`false`).
    fn set_high(&mut self, high: bool) -> Result<(), PinError>;
}

/// Shared handle used by the control handlers.
pub type SharedActuator = Arc<Mutex<Actuator>>;

/// Owns the output pin and its logical state.
pub struct Actuator {
    pin: Box<dyn OutputPin>,
    polarity: Polarity,
    level: Option<Level>,
}

impl Actuator {
    /// Take ownership of `pin` and configure it as an output.
    ///
    /// The level stays unknown until the first [`Actuator::set`].
    pub fn new(mut pin: Box<dyn OutputPin>, polarity: Polarity) -> Result<Self, PinError> {
        pin.set_output()?;
        Ok(Self {
            pin,
            polarity,
            level: None,
        })
    }

    /// Same as [`Actuator::new`], wrapped for sharing with the control server.
    pub fn shared(pin: Box<dyn OutputPin>, polarity: Polarity) -> Result<SharedActuator, PinError> {
        Ok(Arc::new(Mutex::new(Self::new(pin, polarity)?)))
    }

    /// Drive the pin to the electrical level for `level`.
    ///
    /// Pin faults are logged, not returned: callers treat the write as
    /// infallible. The logical level only changes when the write succeeds.
    pub fn set(&mut self, level: Level) {
        let high = self.polarity.is_high(level);
        match self.pin.set_high(high) {
            Ok(()) => {
                debug!(%level, high, "actuator level set");
                self.level = Some(level);
            }
            Err(e) => warn!(%level, "failed to drive actuator pin: {}", e),
        }
    }

    /// Last level successfully written.
    pub fn level(&self) -> Option<Level> {
        self.level
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }
}

impl fmt::Debug for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actuator")
            .field("polarity", &self.polarity)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

/// Lock a shared actuator, recovering it if a previous holder panicked.
///
/// Every write is a single level change, so a poisoned lock never guards a
/// half-applied update.
pub fn lock(actuator: &SharedActuator) -> MutexGuard<'_, Actuator> {
    actuator.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
