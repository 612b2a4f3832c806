//! Altitude supervisor.
//!
//! Runs **every tick before the FSM** and turns the raw altimeter result
//! into the altitude the state machine sees.
//!
//! ## Sustained-failure policy
//!
//! 1. A good reading is passed through and remembered.
//! 2. After a failed reading the last good altitude is held for
//!    `altitude_hold_secs` ticks.
//! 3. Past the hold time the altitude becomes unknown (`None`) and
//!    [`Fault::AltimeterLost`] is latched.  The FSM never transitions on an
//!    unknown altitude, so HV stays as it was.
//! 4. The next good reading clears the fault.
//!
//! Faults are a bitmask so several can be tracked at once; none of them
//! switches HV.

use crate::config::SystemConfig;
use crate::error::Fault;
use log::{error, info};

/// Altitude supervisor.
pub struct AltitudeSupervisor {
    hold_secs: u32,
    last_good: Option<f32>,
    /// Consecutive ticks without a good reading.
    failed_ticks: u32,
    /// Latched fault bitmask.
    faults: u8,
}

impl AltitudeSupervisor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            hold_secs: u32::from(config.altitude_hold_secs),
            last_good: None,
            failed_ticks: 0,
            faults: 0,
        }
    }

    /// Feed this tick's altitude (`None` when the read failed) and get the
    /// altitude the FSM should act on.
    pub fn evaluate(&mut self, reading: Option<f32>) -> Option<f32> {
        match reading {
            Some(alt) if alt.is_finite() => {
                self.last_good = Some(alt);
                self.failed_ticks = 0;
                self.eval_fault(Fault::AltimeterLost, false);
                Some(alt)
            }
            _ => {
                self.failed_ticks = self.failed_ticks.saturating_add(1);
                let lost = self.failed_ticks > self.hold_secs;
                self.eval_fault(Fault::AltimeterLost, lost);
                if lost { None } else { self.last_good }
            }
        }
    }

    /// Latch `fault` (startup conditions such as a PROM CRC mismatch).
    pub fn raise(&mut self, fault: Fault) {
        self.eval_fault(fault, true);
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    pub fn has_fault(&self, fault: Fault) -> bool {
        self.faults & fault.mask() != 0
    }

    /// Consecutive ticks without a usable reading.
    pub fn failed_ticks(&self) -> u32 {
        self.failed_ticks
    }

    fn eval_fault(&mut self, fault: Fault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}
