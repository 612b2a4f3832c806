//! Geiger pulse counting.
//!
//! ```text
//!  edge ISR ──▶ PulseCounter::on_edge ──▶ ┌──────────────────┐
//!                                        │ lock {           │
//!  control tick ──▶ roll_over(second) ──▶│   EdgeState,     │
//!                                        │   TimeSeriesBuf  │
//!  RadiationAggregator ◀─── snapshot ────│ }                │
//!                                        └──────────────────┘
//! ```
//!
//! Every mutation of the edge state and the active slot happens inside the
//! single critical section owned by [`detector::PulseCounter`].

pub mod aggregator;
pub mod buffer;
pub mod detector;

pub use aggregator::RadiationAggregator;
pub use buffer::{SecondSlot, TimeSeriesBuffer, RING_LEN};
pub use detector::{EdgeState, PulseCounter};
