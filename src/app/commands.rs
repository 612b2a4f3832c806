//! Inbound commands to the control service.
//!
//! These come from outside the control loop (signal handler, console) and
//! are applied by [`ControlService`](super::service::ControlService)
//! between ticks.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Turn HV off, stop counting, flush the output log and stop.
    Shutdown,

    /// Replace the sea-level reference with one from a fresh reading.
    RecalibrateQff,
}
