//! GPIO output driver.

use esp_idf_hal::gpio::{AnyOutputPin, Level, Output, PinDriver};

use webgpio_core::error::PinError;
use webgpio_core::OutputPin;

pub struct EspOutputPin {
    driver: PinDriver<'static, AnyOutputPin, Output>,
}

impl EspOutputPin {
    /// Take `pin` as a push-pull output.
    pub fn new(pin: AnyOutputPin) -> anyhow::Result<Self> {
        Ok(Self {
            driver: PinDriver::output(pin)?,
        })
    }
}

impl OutputPin for EspOutputPin {
    fn set_output(&mut self) -> Result<(), PinError> {
        // PinDriver::output already configured the direction.
        Ok(())
    }

    fn set_high(&mut self, high: bool) -> Result<(), PinError> {
        let level = if high { Level::High } else { Level::Low };
        self.driver.set_level(level)?;
        Ok(())
    }
}
