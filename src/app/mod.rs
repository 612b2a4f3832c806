//! Application core. Domain logic only, no I/O.
//!
//! This module holds the power-control loop: FSM orchestration, the
//! altitude supervisor, per-second records and status events.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod record;
pub mod service;
pub mod status;
