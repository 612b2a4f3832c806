//! Two-phase edge timing for the Geiger pulse input.
//!
//! Each tube pulse produces a falling edge (pulse start, counted) followed
//! by a rising edge (tube recovered).  The falling→rising interval is the
//! dead time of that pulse.
//!
//! [`PulseCounter::on_edge`] runs in interrupt context: it never blocks,
//! allocates, or logs.  It shares one critical section with
//! [`PulseCounter::roll_over`], which the control tick calls once per
//! second.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::CriticalSectionMutex;

use super::buffer::{SecondSlot, TimeSeriesBuffer};

/// Indicator time owed is never allowed to exceed one second.
const MAX_PENDING_FLASH_US: u32 = 1_000_000;

/// Phase of the edge-pair decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeState {
    /// Idle; the next edge starts a pulse.
    WaitingFalling,
    /// A pulse started at `falling_ns` and was counted in `slot`.
    WaitingRising { falling_ns: i64, slot: usize },
}

/// What a single edge did to the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// A new pulse was counted.
    Pulse,
    /// The pulse closed with an accepted dead time (ns).
    DeadTime(u64),
    /// Interval exceeded the ceiling; the edge became the new reference.
    Resync,
    /// Non-monotonic timestamp, discarded.
    Anomaly,
    /// Counting is disabled.
    Ignored,
}

struct CounterState {
    edge: EdgeState,
    buffer: TimeSeriesBuffer,
    anomalies: u32,
    enabled: bool,
}

/// Lock-protected pulse counter shared by the edge ISR and the control tick.
pub struct PulseCounter {
    state: CriticalSectionMutex<RefCell<CounterState>>,
    ceiling_ns: i64,
    flash_us: u32,
    /// Indicator on-time owed, drained by the indicator worker.
    pending_flash_us: AtomicU32,
}

impl PulseCounter {
    /// `ceiling_ns` is the longest plausible dead time; `flash_ms` is the
    /// indicator on-time added per counted pulse.
    pub fn new(ceiling_ns: i64, flash_ms: u16) -> Self {
        Self {
            state: CriticalSectionMutex::new(RefCell::new(CounterState {
                edge: EdgeState::WaitingFalling,
                buffer: TimeSeriesBuffer::new(),
                anomalies: 0,
                enabled: true,
            })),
            ceiling_ns,
            flash_us: u32::from(flash_ms) * 1_000,
            pending_flash_us: AtomicU32::new(0),
        }
    }

    /// Feed one hardware transition observed at `now_ns` (monotonic).
    pub fn on_edge(&self, now_ns: i64) -> EdgeOutcome {
        let outcome = self.state.lock(|cell| {
            let mut st = cell.borrow_mut();
            if !st.enabled {
                return EdgeOutcome::Ignored;
            }
            match st.edge {
                EdgeState::WaitingFalling => {
                    st.buffer.record_pulse();
                    st.edge = EdgeState::WaitingRising {
                        falling_ns: now_ns,
                        slot: st.buffer.active_index(),
                    };
                    EdgeOutcome::Pulse
                }
                EdgeState::WaitingRising { falling_ns, slot } => {
                    let dt = now_ns - falling_ns;
                    if dt <= 0 {
                        st.anomalies = st.anomalies.wrapping_add(1);
                        EdgeOutcome::Anomaly
                    } else if dt > self.ceiling_ns {
                        st.edge = EdgeState::WaitingRising {
                            falling_ns: now_ns,
                            slot: st.buffer.active_index(),
                        };
                        EdgeOutcome::Resync
                    } else {
                        st.buffer.record_dead_time(slot, dt as u64);
                        st.edge = EdgeState::WaitingFalling;
                        EdgeOutcome::DeadTime(dt as u64)
                    }
                }
            }
        });

        if outcome == EdgeOutcome::Pulse {
            self.request_flash();
        }
        outcome
    }

    /// Advance the ring to `second` and return the slot that was active
    /// until now, read in the same critical section.  `None` when the
    /// second did not move forward.
    pub fn roll_over(&self, second: i64) -> Option<SecondSlot> {
        self.state.lock(|cell| {
            let mut st = cell.borrow_mut();
            let completed = st.buffer.active_slot();
            st.buffer.advance_to(second).then_some(completed)
        })
    }

    /// Zero every slot and return the decoder to `WaitingFalling`.
    pub fn reset(&self) {
        self.state.lock(|cell| {
            let mut st = cell.borrow_mut();
            st.buffer.clear();
            st.edge = EdgeState::WaitingFalling;
        });
        self.pending_flash_us.store(0, Ordering::Relaxed);
    }

    /// Start or stop accepting edges.  Stopping also drops a half-seen pulse.
    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock(|cell| {
            let mut st = cell.borrow_mut();
            st.enabled = enabled;
            if !enabled {
                st.edge = EdgeState::WaitingFalling;
            }
        });
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock(|cell| cell.borrow().enabled)
    }

    pub fn edge_state(&self) -> EdgeState {
        self.state.lock(|cell| cell.borrow().edge)
    }

    /// Total non-monotonic edges seen since construction.
    pub fn anomaly_count(&self) -> u32 {
        self.state.lock(|cell| cell.borrow().anomalies)
    }

    /// Run `f` against a consistent view of the ring.
    pub fn with_buffer<R>(&self, f: impl FnOnce(&TimeSeriesBuffer) -> R) -> R {
        self.state.lock(|cell| f(&cell.borrow().buffer))
    }

    /// Take all indicator time owed so far (µs).
    pub fn take_pending_flash_us(&self) -> u32 {
        self.pending_flash_us.swap(0, Ordering::Relaxed)
    }

    fn request_flash(&self) {
        let flash = self.flash_us;
        // The closure always returns Some, so this cannot fail.
        let _ = self
            .pending_flash_us
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |owed| {
                Some(owed.saturating_add(flash).min(MAX_PENDING_FLASH_US))
            });
    }
}
