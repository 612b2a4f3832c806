//! Log-based event sink adapter (the status log).
//!
//! Implements [`EventSink`] by writing one line per application event to
//! the ESP-IDF logger (UART / USB-CDC on target), prefixed with uptime.

use log::{info, warn};

use crate::app::events::{AppEvent, HeartbeatData};
use crate::app::ports::EventSink;
use crate::fsm::StateId;
use crate::sensors::compensation::{celsius_to_fahrenheit, mbar_to_inhg};

use super::time::MonotonicClock;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    clock: MonotonicClock,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self {
            clock: MonotonicClock::new(),
        }
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        let t = self.clock.uptime_secs();
        match event {
            AppEvent::SensorInit { crc_valid } => {
                info!("[{t:>6}s] SENSOR | altimeter up, PROM CRC {}", if *crc_valid { "ok" } else { "MISMATCH" });
            }
            AppEvent::QffCalibrated {
                qff_mbar,
                recalibrated,
            } => {
                info!(
                    "[{t:>6}s] QFF | {} {:.2} mbar ({:.2} inHg)",
                    if *recalibrated { "recalibrated" } else { "set" },
                    qff_mbar,
                    mbar_to_inhg(*qff_mbar)
                );
            }
            AppEvent::Started(state) => {
                info!("[{t:>6}s] START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                match (from, to) {
                    (_, StateId::SelfTest) => info!("[{t:>6}s] SELF-TEST | enter"),
                    (StateId::SelfTest, _) => info!("[{t:>6}s] SELF-TEST | exit"),
                    _ => {}
                }
                info!("[{t:>6}s] STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::HvSwitched(on) => {
                info!("[{t:>6}s] HV | {}", if *on { "on" } else { "off" });
            }
            AppEvent::Heartbeat(hb) => info!("[{t:>6}s] {}", heartbeat_line(hb)),
            AppEvent::FaultDetected(flags) => {
                warn!("[{t:>6}s] FAULT | detected, flags=0b{:08b}", flags);
            }
            AppEvent::FaultCleared => {
                info!("[{t:>6}s] FAULT | all cleared");
            }
            AppEvent::EdgeAnomalies(n) => {
                warn!("[{t:>6}s] EDGE | {} non-monotonic edge(s) discarded", n);
            }
            AppEvent::ShutdownComplete => {
                info!("[{t:>6}s] SHUTDOWN | HV off, output flushed");
            }
        }
    }
}

fn heartbeat_line(hb: &HeartbeatData) -> String {
    let alt = hb
        .altitude_m
        .map_or_else(|| "unknown".to_string(), |a| format!("{a:.1}m"));
    let env = match (hb.temperature_c, hb.pressure_mbar) {
        (Some(c), Some(p)) => format!(
            "T={:.1}\u{00b0}F P={:.2}inHg",
            celsius_to_fahrenheit(c),
            mbar_to_inhg(p)
        ),
        _ => "T=- P=-".to_string(),
    };
    let cps = hb
        .corrected_cps
        .map_or_else(|| "saturated".to_string(), |c| format!("{c:.2}cps"));
    format!(
        "BEAT | t={}s state={:?} hv={} alt={} {} dose={:.3}uSv/h corr={} faults=0b{:08b}",
        hb.elapsed_s,
        hb.state,
        if hb.hv_on { "on" } else { "off" },
        alt,
        env,
        hb.dose_usv_h,
        cps,
        hb.fault_flags,
    )
}
