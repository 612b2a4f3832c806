//! Peripheral drivers and platform helpers.

pub mod edge_isr;
pub mod hv_gate;
pub mod indicator;
pub mod task_pin;
pub mod tick;
