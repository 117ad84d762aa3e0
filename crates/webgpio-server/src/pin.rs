//! In-memory output pin for running without hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use webgpio_core::error::PinError;
use webgpio_core::OutputPin;

/// Output pin whose electrical level lives in memory.
#[derive(Debug)]
pub struct SimulatedPin {
    number: u8,
    state: Arc<PinState>,
}

#[derive(Debug, Default)]
struct PinState {
    output: AtomicBool,
    high: AtomicBool,
}

/// Read-only view of a [`SimulatedPin`]'s electrical state.
#[derive(Debug, Clone)]
pub struct PinMonitor {
    state: Arc<PinState>,
}

impl SimulatedPin {
    pub fn new(number: u8) -> (Self, PinMonitor) {
        let state = Arc::new(PinState::default());
        let monitor = PinMonitor {
            state: state.clone(),
        };
        (Self { number, state }, monitor)
    }
}

impl OutputPin for SimulatedPin {
    fn set_output(&mut self) -> Result<(), PinError> {
        self.state.output.store(true, Ordering::SeqCst);
        info!("GPIO{} configured as output", self.number);
        Ok(())
    }

    fn set_high(&mut self, high: bool) -> Result<(), PinError> {
        if !self.state.output.load(Ordering::SeqCst) {
            return Err(format!("GPIO{} is not configured as output", self.number).into());
        }
        self.state.high.store(high, Ordering::SeqCst);
        info!(
            "GPIO{} driven {}",
            self.number,
            if high { "high" } else { "low" }
        );
        Ok(())
    }
}

impl PinMonitor {
    pub fn is_output(&self) -> bool {
        self.state.output.load(Ordering::SeqCst)
    }

    /// Current electrical level.
    pub fn is_high(&self) -> bool {
        self.state.high.load(Ordering::SeqCst)
    }
}
