//! Shared mutable context threaded through every FSM handler.
//!
//! Handlers read the latest altitude and flags and write
//! [`ControlCommands`]; the control service applies those to hardware
//! after each tick.

use crate::config::SystemConfig;

/// Length of one control tick.
pub const TICK_PERIOD_SECS: f32 = 1.0;

/// Outputs requested by the state handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlCommands {
    /// Desired level of the HV gate.
    pub hv_on: bool,
    /// Clear the ring and edge state before the next second is counted.
    /// One-shot: the service clears it once applied.
    pub reset_counting: bool,
    /// Edge handler accepts pulses.
    pub counting: bool,
    /// Per-second output rows are written.
    pub logging: bool,
}

impl ControlCommands {
    /// HV off, counter idle, nothing logged.
    pub fn all_off() -> Self {
        Self {
            hv_on: false,
            reset_counting: false,
            counting: false,
            logging: false,
        }
    }
}

impl Default for ControlCommands {
    fn default() -> Self {
        Self::all_off()
    }
}

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,

    // -- Inputs --
    /// Altitude above mean sea level, `None` when unknown.
    pub altitude_m: Option<f32>,
    /// Termination was requested; every state heads for `Shutdown`.
    pub shutdown_requested: bool,

    // -- Outputs --
    pub commands: ControlCommands,

    // -- Lifetime flags --
    /// The one power-on self-test has run (or is disabled).
    pub self_test_done: bool,

    pub config: SystemConfig,
}

impl FsmContext {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            ticks_in_state: 0,
            altitude_m: None,
            shutdown_requested: false,
            commands: ControlCommands::all_off(),
            self_test_done: !config.self_test_enabled,
            config,
        }
    }

    /// Seconds elapsed since the current state was entered.
    pub fn secs_in_state(&self) -> f32 {
        self.ticks_in_state as f32 * TICK_PERIOD_SECS
    }

    /// Altitude is known and above the switch-on threshold.
    pub fn above_threshold(&self) -> bool {
        self.altitude_m
            .is_some_and(|a| a > self.config.hv_threshold_m)
    }

    /// Altitude is known and below the lower edge of the deadband.
    pub fn below_band(&self) -> bool {
        self.altitude_m
            .is_some_and(|a| a < self.config.hv_off_below_m())
    }
}
