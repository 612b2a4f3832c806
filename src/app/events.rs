//! Outbound application events.
//!
//! The [`ControlService`](super::service::ControlService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  The status-log
//! adapter renders each one as a timestamped line.

use crate::fsm::StateId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The altimeter answered and its PROM was read.
    SensorInit { crc_valid: bool },

    /// Sea-level reference set (or replaced) in mbar.
    QffCalibrated { qff_mbar: f64, recalibrated: bool },

    /// The service has started (carries the state it started in).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// The HV gate was switched.
    HvSwitched(bool),

    /// Periodic status snapshot.
    Heartbeat(HeartbeatData),

    /// One or more faults were raised (full bitmask).
    FaultDetected(u8),

    /// All faults have been cleared.
    FaultCleared,

    /// Non-monotonic edge timestamps discarded since the last report.
    EdgeAnomalies(u32),

    /// HV is off, counting stopped, output flushed.
    ShutdownComplete,
}

/// A point-in-time status snapshot for the heartbeat line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartbeatData {
    pub elapsed_s: i64,
    pub state: StateId,
    pub hv_on: bool,
    /// Altitude the FSM acted on, `None` when unknown.
    pub altitude_m: Option<f32>,
    pub temperature_c: Option<f64>,
    pub pressure_mbar: Option<f64>,
    /// µSv/h over the configured window.
    pub dose_usv_h: f64,
    /// Dead-time corrected rate; `None` when saturated.
    pub corrected_cps: Option<f64>,
    pub fault_flags: u8,
}
