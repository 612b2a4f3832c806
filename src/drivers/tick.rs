//! Drift-corrected once-per-second ticker for the control thread.
//!
//! Every deadline is computed from the fixed start instant, never from the
//! previous wake-up, so scheduling jitter does not accumulate.  The wait is
//! sliced so a cleared running flag is noticed well within one tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::warn;

/// Longest single sleep while waiting for a deadline.
const WAIT_SLICE: Duration = Duration::from_millis(100);

pub struct SecondTicker {
    start: Instant,
    period: Duration,
    next: i64,
    running: Arc<AtomicBool>,
}

impl SecondTicker {
    /// One-second ticks starting now; the first tick is second 1.
    pub fn new(running: Arc<AtomicBool>) -> Self {
        Self::with_period(running, Duration::from_secs(1))
    }

    pub fn with_period(running: Arc<AtomicBool>, period: Duration) -> Self {
        Self {
            start: Instant::now(),
            period,
            next: 1,
            running,
        }
    }

    /// Block until the next boundary and return its index, or `None` once
    /// the running flag clears.  After an overrun the index jumps to the
    /// period actually reached.
    pub fn next(&mut self) -> Option<i64> {
        let target = self.next;
        let due = self.period * target as u32;
        loop {
            if !self.running.load(Ordering::Acquire) {
                return None;
            }
            let elapsed = self.start.elapsed();
            if elapsed >= due {
                break;
            }
            std::thread::sleep((due - elapsed).min(WAIT_SLICE));
        }

        let reached = (self.start.elapsed().as_nanos() / self.period.as_nanos().max(1)) as i64;
        let second = reached.max(target);
        if second > target {
            warn!("Control tick overran, {} tick(s) skipped", second - target);
        }
        self.next = second + 1;
        Some(second)
    }

    /// Time since the ticker was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
