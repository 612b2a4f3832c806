//! Fuzz target: edge timing decoder and ring rollover
//!
//! Interleaves arbitrary edge timestamps (including backwards jumps and
//! huge gaps) with second rollovers and checks:
//! - No panics or overflow
//! - Accepted dead times stay within the ceiling
//! - Dead-time events never exceed counted pulses in the ring
//!
//! cargo fuzz run fuzz_edge_timing

#![no_main]

use libfuzzer_sys::fuzz_target;
use star::counting::PulseCounter;
use star::counting::detector::EdgeOutcome;

fuzz_target!(|data: &[u8]| {
    let counter = PulseCounter::new(800_000, 10);
    let mut now: i64 = 0;
    let mut second: i64 = 0;
    let (mut pulses, mut dead) = (0u64, 0u64);

    for chunk in data.chunks(3) {
        match chunk {
            [0xFF, skip, ..] => {
                second += i64::from(*skip);
                counter.roll_over(second);
            }
            [a, b, c] => {
                let delta = i64::from(i16::from_le_bytes([*a, *b])) * i64::from(*c);
                now = now.saturating_add(delta);
                match counter.on_edge(now) {
                    EdgeOutcome::Pulse => pulses += 1,
                    EdgeOutcome::DeadTime(ns) => {
                        assert!(ns > 0 && ns <= 800_000);
                        dead += 1;
                    }
                    EdgeOutcome::Resync | EdgeOutcome::Anomaly | EdgeOutcome::Ignored => {}
                }
            }
            _ => {}
        }
    }

    assert!(dead <= pulses);
    let (counts, events) = counter.with_buffer(|b| (b.sum_counts(60), b.sum_dead_time_events(60)));
    assert!(counts <= pulses);
    assert!(events <= dead);
});
