//! Pulse indicator LED worker.
//!
//! The edge handler only adds owed on-time to
//! [`PulseCounter`]; this worker drains it from its own thread, so nothing
//! slow ever runs in interrupt context.  When idle it polls every
//! [`IDLE_POLL`] and sleeps in between.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::counting::PulseCounter;
use crate::error::{ActuatorError, Result};

/// Sleep between polls while no flash is owed.
pub const IDLE_POLL: Duration = Duration::from_micros(500);

pub struct Indicator<P> {
    led: P,
    counter: Arc<PulseCounter>,
    lit: bool,
}

impl<P: OutputPin> Indicator<P> {
    pub fn new(led: P, counter: Arc<PulseCounter>) -> Self {
        Self {
            led,
            counter,
            lit: false,
        }
    }

    /// Set the LED for the owed time and return how long to sleep.
    pub fn service(&mut self) -> Result<Duration> {
        let owed = self.counter.take_pending_flash_us();
        if owed > 0 {
            self.write(true)?;
            Ok(Duration::from_micros(u64::from(owed)))
        } else {
            self.write(false)?;
            Ok(IDLE_POLL)
        }
    }

    /// Loop until `running` clears, then leave the LED off.
    pub fn run(&mut self, running: &AtomicBool) {
        info!("Indicator worker started");
        let mut reported = false;
        while running.load(Ordering::Acquire) {
            let sleep = match self.service() {
                Ok(d) => d,
                Err(e) => {
                    if !reported {
                        warn!("Indicator: {}", e);
                        reported = true;
                    }
                    IDLE_POLL
                }
            };
            std::thread::sleep(sleep);
        }
        if let Err(e) = self.write(false) {
            warn!("Indicator: {} on exit", e);
        }
        info!("Indicator worker stopped");
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    fn write(&mut self, on: bool) -> Result<()> {
        if on == self.lit {
            return Ok(());
        }
        let res = if on { self.led.set_high() } else { self.led.set_low() };
        res.map_err(|_| ActuatorError::IndicatorWriteFailed)?;
        self.lit = on;
        Ok(())
    }
}
