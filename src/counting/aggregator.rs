//! Windowed count averages and dose-rate conversion.

use std::sync::Arc;

use super::buffer::RING_LEN;
use super::detector::PulseCounter;

/// Reads the shared ring and turns counts into rates.
///
/// All sums for one call are taken in a single critical section.
pub struct RadiationAggregator {
    counter: Arc<PulseCounter>,
    /// µSv/h per count/minute for the fitted tube.
    usv_per_cpm: f64,
}

impl RadiationAggregator {
    pub fn new(counter: Arc<PulseCounter>, usv_per_cpm: f64) -> Self {
        Self {
            counter,
            usv_per_cpm,
        }
    }

    /// Mean counts per second over the last `window` slots.
    pub fn average_counts(&self, window: usize) -> f64 {
        let window = clamp_window(window);
        let sum = self.counter.with_buffer(|b| b.sum_counts(window));
        sum as f64 / window as f64
    }

    /// Estimated dose rate in µSv/h.  Short windows are noisy.
    pub fn dose_rate(&self, window: usize) -> f64 {
        self.average_counts(window) * 60.0 * self.usv_per_cpm
    }

    /// Count rate corrected for non-paralysable dead time, `n / (1 - n·τ)`,
    /// with τ the mean measured dead time per pulse in the window.
    ///
    /// `None` when `n·τ ≥ 1`, i.e. the tube is saturated.
    pub fn dead_time_corrected_cps(&self, window: usize) -> Option<f64> {
        let window = clamp_window(window);
        let (counts, dead_s, events) = self.counter.with_buffer(|b| {
            (
                b.sum_counts(window),
                b.sum_dead_time(window),
                b.sum_dead_time_events(window),
            )
        });
        let n = counts as f64 / window as f64;
        if events == 0 {
            return Some(n);
        }
        let tau = dead_s / events as f64;
        let denom = 1.0 - n * tau;
        (denom > 0.0).then(|| n / denom)
    }
}

fn clamp_window(window: usize) -> usize {
    window.clamp(1, RING_LEN)
}
