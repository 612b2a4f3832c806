//! System configuration parameters
//!
//! All tunable parameters for the STAR monitor.  Flight presets select the
//! altitude gate; a JSON override file (see
//! [`JsonConfigFile`](crate::adapters::config_file::JsonConfigFile)) may
//! replace any field before startup.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sensors::compensation::LaunchSite;
use crate::sensors::transport::Oversampling;

/// Threshold/deadband presets used on different campaign days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightPreset {
    /// Gate sits below any plausible launch-site elevation so HV comes on
    /// at the bench.
    GroundTest,
    /// Free flight.
    LaunchDay,
    /// Tethered flight, low ceiling.
    Tethered,
}

impl FromStr for FlightPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ground-test" | "ground" => Ok(Self::GroundTest),
            "launch-day" | "launch" => Ok(Self::LaunchDay),
            "tethered" => Ok(Self::Tethered),
            _ => Err(Error::Config("unknown flight preset")),
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Altitude gate ---
    /// Altitude (m AMSL) above which HV is energised.
    pub hv_threshold_m: f32,
    /// HV is only de-energised below `hv_threshold_m - hv_deadband_m`.
    pub hv_deadband_m: f32,

    // --- Self-test ---
    /// Run the one-shot power-on self-test while below the gate.
    pub self_test_enabled: bool,
    /// How long HV stays on during the self-test (seconds).
    pub self_test_duration_secs: u16,

    // --- Geiger tube ---
    /// Longest falling→rising interval accepted as dead time (µs).
    pub dead_time_ceiling_us: u32,
    /// Dose conversion factor (µSv/h per count/minute).
    pub usv_per_cpm: f64,
    /// Averaging window for the dose estimate (seconds, 1–60).
    pub dose_window_secs: u16,
    /// Indicator on-time per detected pulse (ms).
    pub indicator_flash_ms: u16,

    // --- Altimeter ---
    pub pressure_osr: Oversampling,
    pub temperature_osr: Oversampling,
    /// SPI clock for the altimeter (Hz).
    pub spi_clock_hz: u32,
    /// Transfer attempts per reading before the tick gives up.
    pub altimeter_retries: u8,
    /// Last good altitude stays valid this long after reads start failing.
    pub altitude_hold_secs: u16,
    /// Abort startup on a PROM CRC mismatch instead of warning.
    pub abort_on_crc_mismatch: bool,

    // --- Launch site (QFF) ---
    pub site_latitude_deg: f32,
    /// Ground elevation above mean sea level (m).
    pub site_elevation_m: f32,
    /// Instrument height above the ground at calibration time (m).
    pub instrument_height_m: f32,

    // --- Timing ---
    /// Status heartbeat interval (seconds).
    pub heartbeat_interval_secs: u32,
    /// Output log flush interval (seconds).
    pub flush_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self::for_preset(FlightPreset::LaunchDay)
    }
}

impl SystemConfig {
    /// Configuration with the altitude gate of `preset`.
    pub fn for_preset(preset: FlightPreset) -> Self {
        let (hv_threshold_m, hv_deadband_m) = match preset {
            FlightPreset::GroundTest => (1.0, 0.5),
            FlightPreset::LaunchDay => (175.0, 25.0),
            FlightPreset::Tethered => (40.0, 10.0),
        };
        Self {
            hv_threshold_m,
            hv_deadband_m,

            self_test_enabled: true,
            self_test_duration_secs: 10,

            dead_time_ceiling_us: 800,
            usv_per_cpm: 0.006_315,
            dose_window_secs: 60,
            indicator_flash_ms: 10,

            pressure_osr: Oversampling::Osr256,
            temperature_osr: Oversampling::Osr4096,
            spi_clock_hz: 4_000_000,
            altimeter_retries: 3,
            altitude_hold_secs: 10,
            abort_on_crc_mismatch: false,

            site_latitude_deg: 42.29,
            site_elevation_m: 45.0,
            instrument_height_m: 2.0,

            heartbeat_interval_secs: 20,
            flush_interval_secs: 60,
        }
    }

    /// Reject values that would make the altitude gate or the counters
    /// meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(self.hv_deadband_m > 0.0) {
            return Err(Error::Config("hv_deadband_m must be positive"));
        }
        if self.hv_deadband_m >= self.hv_threshold_m {
            return Err(Error::Config("hv_deadband_m must be smaller than hv_threshold_m"));
        }
        if self.self_test_enabled && self.self_test_duration_secs == 0 {
            return Err(Error::Config("self_test_duration_secs must be non-zero"));
        }
        if self.dead_time_ceiling_us == 0 {
            return Err(Error::Config("dead_time_ceiling_us must be non-zero"));
        }
        if self.dose_window_secs == 0 || self.dose_window_secs > 60 {
            return Err(Error::Config("dose_window_secs must be within 1..=60"));
        }
        if self.altimeter_retries == 0 {
            return Err(Error::Config("altimeter_retries must be non-zero"));
        }
        if !(-90.0..=90.0).contains(&self.site_latitude_deg) {
            return Err(Error::Config("site_latitude_deg out of range"));
        }
        if self.heartbeat_interval_secs == 0 || self.flush_interval_secs == 0 {
            return Err(Error::Config("log intervals must be non-zero"));
        }
        Ok(())
    }

    /// Altitude below which an energised tube is switched off.
    pub fn hv_off_below_m(&self) -> f32 {
        self.hv_threshold_m - self.hv_deadband_m
    }

    /// Dead-time ceiling in nanoseconds, the unit the edge handler works in.
    pub fn dead_time_ceiling_ns(&self) -> i64 {
        i64::from(self.dead_time_ceiling_us) * 1_000
    }

    /// Site parameters for the QFF projection.
    pub fn launch_site(&self) -> LaunchSite {
        LaunchSite {
            latitude_deg: f64::from(self.site_latitude_deg),
            elevation_m: f64::from(self.site_elevation_m),
            instrument_height_m: f64::from(self.instrument_height_m),
        }
    }
}
