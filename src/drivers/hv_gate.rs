//! Geiger tube high-voltage gate.
//!
//! A single digital output enables the tube's HV supply (active HIGH).
//! The driver remembers the last level written successfully; a failed
//! write leaves that level untouched so the control loop retries on the
//! next tick.
//!
//! ## Dual-target design
//!
//! Generic over [`OutputPin`]: on ESP-IDF this is a `PinDriver<Output>`,
//! on host tests a recording mock.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::error::{ActuatorError, Result};

pub struct HvGate<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> HvGate<P> {
    /// Take the pin and drive it low.
    pub fn new(mut pin: P) -> Result<Self> {
        pin.set_low().map_err(|_| ActuatorError::HvGateWriteFailed)?;
        Ok(Self { pin, on: false })
    }

    pub fn set(&mut self, on: bool) -> Result<()> {
        let res = if on { self.pin.set_high() } else { self.pin.set_low() };
        if res.is_err() {
            warn!("HV gate write ({}) failed", if on { "on" } else { "off" });
            return Err(ActuatorError::HvGateWriteFailed.into());
        }
        if on != self.on {
            info!("HV gate {}", if on { "ON" } else { "OFF" });
        }
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
