//! Sixty-slot ring of per-second pulse counters.
//!
//! The buffer itself is not synchronised; it lives inside the critical
//! section owned by [`PulseCounter`](super::PulseCounter) so that rollover
//! and accumulation never interleave.

/// Number of per-second slots in the ring.
pub const RING_LEN: usize = 60;

/// Everything accumulated during one wall-clock second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecondSlot {
    /// Falling edges (pulse starts) seen during the second.
    pub counts: u32,
    /// Sum of accepted falling→rising intervals, in nanoseconds.
    pub dead_time_ns: u64,
    /// Number of accepted falling→rising intervals.
    pub dead_time_events: u32,
}

impl SecondSlot {
    /// Accumulated dead time in seconds.
    pub fn dead_time_secs(&self) -> f64 {
        self.dead_time_ns as f64 / 1e9
    }
}

/// Circular buffer indexed by `second mod 60`.
#[derive(Debug, Clone)]
pub struct TimeSeriesBuffer {
    slots: [SecondSlot; RING_LEN],
    active: usize,
    /// Second last passed to [`advance_to`](Self::advance_to).
    current_second: Option<i64>,
}

impl Default for TimeSeriesBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSeriesBuffer {
    pub const fn new() -> Self {
        Self {
            slots: [SecondSlot {
                counts: 0,
                dead_time_ns: 0,
                dead_time_events: 0,
            }; RING_LEN],
            active: 0,
            current_second: None,
        }
    }

    /// True modulo into `[0, 60)`, valid for negative `i`.
    pub fn get_index(i: i64) -> usize {
        i.rem_euclid(RING_LEN as i64) as usize
    }

    /// Make the slot for `second` the active one.
    ///
    /// Every slot between the previous second and `second` (at most one full
    /// cycle) is zeroed before it becomes writable.  Calling twice with the
    /// same second, or with a second older than the current one, changes
    /// nothing.  Returns `true` when the active slot moved.
    pub fn advance_to(&mut self, second: i64) -> bool {
        let target = Self::get_index(second);
        match self.current_second {
            None => {
                if target != self.active {
                    self.slots[target] = SecondSlot::default();
                }
            }
            Some(current) if second <= current => return false,
            Some(current) => {
                let steps = (second - current).min(RING_LEN as i64);
                for k in 1..=steps {
                    self.slots[Self::get_index(current + k)] = SecondSlot::default();
                }
            }
        }
        self.active = target;
        self.current_second = Some(second);
        true
    }

    /// Index of the slot currently receiving pulses.
    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn slot(&self, index: usize) -> SecondSlot {
        self.slots[index % RING_LEN]
    }

    pub fn active_slot(&self) -> SecondSlot {
        self.slots[self.active]
    }

    /// Count one pulse start in the active slot.
    pub fn record_pulse(&mut self) {
        let slot = &mut self.slots[self.active];
        slot.counts = slot.counts.saturating_add(1);
    }

    /// Accumulate one accepted dead-time interval into slot `index`.
    pub fn record_dead_time(&mut self, index: usize, dt_ns: u64) {
        let slot = &mut self.slots[index % RING_LEN];
        slot.dead_time_ns = slot.dead_time_ns.saturating_add(dt_ns);
        slot.dead_time_events = slot.dead_time_events.saturating_add(1);
    }

    /// Zero every slot without moving the active index.
    pub fn clear(&mut self) {
        self.slots = [SecondSlot::default(); RING_LEN];
    }

    /// Sum of counts over the last `window` slots, the active one included.
    pub fn sum_counts(&self, window: usize) -> u64 {
        self.window_slots(window).map(|s| u64::from(s.counts)).sum()
    }

    /// Sum of dead time (seconds) over the last `window` slots.
    pub fn sum_dead_time(&self, window: usize) -> f64 {
        let ns: u64 = self.window_slots(window).map(|s| s.dead_time_ns).sum();
        ns as f64 / 1e9
    }

    /// Sum of accepted dead-time intervals over the last `window` slots.
    pub fn sum_dead_time_events(&self, window: usize) -> u64 {
        self.window_slots(window)
            .map(|s| u64::from(s.dead_time_events))
            .sum()
    }

    fn window_slots(&self, window: usize) -> impl Iterator<Item = &SecondSlot> {
        let current = self.active as i64;
        (0..window.min(RING_LEN) as i64).map(move |k| &self.slots[Self::get_index(current - k)])
    }
}
