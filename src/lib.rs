//! STAR radiation monitor firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module, with host bodies
//! alongside, so the whole library builds and tests on the host.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod counting;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod safety;
pub mod sensors;

pub mod adapters;
pub mod drivers;
