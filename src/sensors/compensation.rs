//! MS5607 first/second-order compensation, hypsometric altitude and QFF.
//!
//! Temperatures inside the compensation are carried in hundredths of a
//! degree Celsius (`2000` = 20.00 °C) as in the datasheet; only the
//! outputs are converted to °C and mbar.

use crate::error::{Result, SensorError};

/// Specific gas constant of dry air (J/(kg·K)).
pub const R_DRY_AIR: f64 = 287.05;
/// Standard gravity (m/s²).
pub const G0: f64 = 9.806_65;
/// Standard sea-level temperature (K).
pub const T_STD_SEA_LEVEL: f64 = 288.15;
const KELVIN: f64 = 273.15;

/// Plausible pressure range for a reading (mbar).
const PRESSURE_RANGE_MBAR: core::ops::RangeInclusive<f64> = 10.0..=1_200.0;

/// The eight PROM words, read once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationCoefficients([u16; 8]);

impl CalibrationCoefficients {
    pub const fn new(words: [u16; 8]) -> Self {
        Self(words)
    }

    pub fn words(&self) -> &[u16; 8] {
        &self.0
    }

    /// `C[i]` as a float.
    fn c(&self, i: usize) -> f64 {
        f64::from(self.0[i])
    }
}

/// Raw D1/D2 conversions (24-bit).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    pub pressure_raw: u32,
    pub temperature_raw: u32,
}

/// A reading converted to physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompensatedSample {
    /// First-order temperature (°C).
    pub temperature_c: f64,
    /// First-order pressure (mbar).
    pub pressure_first_mbar: f64,
    /// Second-order pressure (mbar); used for altitude.
    pub pressure_mbar: f64,
    /// Altitude above mean sea level, `None` until QFF is set.
    pub altitude_m: Option<f64>,
}

/// Launch-site parameters used to project a reading to sea level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchSite {
    pub latitude_deg: f64,
    /// Ground elevation above mean sea level (m).
    pub elevation_m: f64,
    /// Instrument height above ground (m).
    pub instrument_height_m: f64,
}

/// Intermediate values of one compensation pass.
#[derive(Debug, Clone, Copy)]
struct Terms {
    dt: f64,
    temp: f64,
    off: f64,
    sens: f64,
}

impl Terms {
    fn pressure_mbar(&self, d1: f64) -> f64 {
        ((d1 * self.sens / 2f64.powi(21) - self.off) / 2f64.powi(15)) / 100.0
    }
}

/// Converts raw samples with the factory coefficients and the QFF
/// reference.
#[derive(Debug, Clone)]
pub struct SensorCompensator {
    coeffs: CalibrationCoefficients,
    qff_mbar: Option<f64>,
}

impl SensorCompensator {
    pub fn new(coeffs: CalibrationCoefficients) -> Self {
        Self {
            coeffs,
            qff_mbar: None,
        }
    }

    pub fn coefficients(&self) -> &CalibrationCoefficients {
        &self.coeffs
    }

    /// Sea-level reference pressure (mbar), once calibrated.
    pub fn qff(&self) -> Option<f64> {
        self.qff_mbar
    }

    fn first_order(&self, raw: RawSample) -> Terms {
        let c = &self.coeffs;
        let dt = f64::from(raw.temperature_raw) - c.c(5) * 2f64.powi(8);
        Terms {
            dt,
            temp: 2000.0 + dt * c.c(6) / 2f64.powi(23),
            off: c.c(2) * 2f64.powi(17) + dt * c.c(4) / 2f64.powi(6),
            sens: c.c(1) * 2f64.powi(16) + dt * c.c(3) / 2f64.powi(7),
        }
    }

    /// First-order temperature (°C).
    pub fn temperature_c(&self, raw: RawSample) -> f64 {
        self.first_order(raw).temp / 100.0
    }

    /// First-order pressure (mbar).
    pub fn pressure_first_order(&self, raw: RawSample) -> f64 {
        self.first_order(raw).pressure_mbar(f64::from(raw.pressure_raw))
    }

    /// Pressure with the low-temperature correction applied (mbar).
    /// Identical to the first-order value at or above 20 °C.
    pub fn pressure_second_order(&self, raw: RawSample) -> f64 {
        let mut t = self.first_order(raw);
        if t.temp < 2000.0 {
            let t2 = t.dt * t.dt / 2f64.powi(31);
            let mut off2 = 61.0 * (t.temp - 2000.0).powi(2) / 2f64.powi(4);
            let mut sens2 = 2.0 * (t.temp - 2000.0).powi(2);
            if t.temp < -1500.0 {
                off2 += 15.0 * (t.temp + 1500.0).powi(2);
                sens2 += 8.0 * (t.temp + 1500.0).powi(2);
            }
            t.temp -= t2;
            t.off -= off2;
            t.sens -= sens2;
        }
        t.pressure_mbar(f64::from(raw.pressure_raw))
    }

    /// Full conversion of one raw sample.
    pub fn compensate(&self, raw: RawSample) -> Result<CompensatedSample> {
        if raw.pressure_raw == 0 || raw.temperature_raw == 0 {
            // The ADC returns zero when read without a finished conversion.
            return Err(SensorError::OutOfRange.into());
        }
        let pressure_mbar = self.pressure_second_order(raw);
        if !PRESSURE_RANGE_MBAR.contains(&pressure_mbar) {
            return Err(SensorError::OutOfRange.into());
        }
        let temperature_c = self.temperature_c(raw);
        Ok(CompensatedSample {
            temperature_c,
            pressure_first_mbar: self.pressure_first_order(raw),
            pressure_mbar,
            altitude_m: self.altitude(pressure_mbar, temperature_c),
        })
    }

    /// Hypsometric altitude above the QFF reference (m).
    pub fn altitude(&self, pressure_mbar: f64, temperature_c: f64) -> Option<f64> {
        self.qff_mbar
            .map(|qff| hypsometric_altitude(qff, pressure_mbar, temperature_c))
    }

    /// Set the QFF reference from a live reading.  Only the first call
    /// succeeds; use [`recalibrate_qff`](Self::recalibrate_qff) to replace it.
    pub fn calibrate_qff(&mut self, sample: &CompensatedSample, site: &LaunchSite) -> Result<f64> {
        if self.qff_mbar.is_some() {
            return Err(SensorError::AlreadyCalibrated.into());
        }
        self.recalibrate_qff(sample, site)
    }

    /// Replace the QFF reference unconditionally.
    pub fn recalibrate_qff(&mut self, sample: &CompensatedSample, site: &LaunchSite) -> Result<f64> {
        let qff = sea_level_pressure(sample.pressure_mbar, sample.temperature_c, site);
        if !qff.is_finite() || !PRESSURE_RANGE_MBAR.contains(&qff) {
            return Err(SensorError::OutOfRange.into());
        }
        self.qff_mbar = Some(qff);
        Ok(qff)
    }
}

/// `(R/g)·((Ts + T + 273.15)/2)·ln(QFF/P)`
pub fn hypsometric_altitude(qff_mbar: f64, pressure_mbar: f64, temperature_c: f64) -> f64 {
    let mean_temp_k = (T_STD_SEA_LEVEL + temperature_c + KELVIN) / 2.0;
    (R_DRY_AIR / G0) * mean_temp_k * (qff_mbar / pressure_mbar).ln()
}

/// Piecewise-linear virtual temperature approximation (°C in).
fn virtual_temperature(temperature_c: f64) -> f64 {
    if temperature_c < -7.0 {
        0.5 * temperature_c + 275.0
    } else if temperature_c < 2.0 {
        0.535 * temperature_c + 275.6
    } else {
        1.07 * temperature_c + 274.5
    }
}

/// Project a reading taken `site.instrument_height_m` above ground to the
/// station, then to mean sea level.
pub fn sea_level_pressure(pressure_mbar: f64, temperature_c: f64, site: &LaunchSite) -> f64 {
    let qfe = pressure_mbar
        * (G0 * site.instrument_height_m / (R_DRY_AIR * (temperature_c + KELVIN))).exp();
    let gravity_term = 1.0 - 0.002_637_3 * (2.0 * site.latitude_deg.to_radians()).cos();
    qfe * (0.034_163 * gravity_term * site.elevation_m / virtual_temperature(temperature_c)).exp()
}

/// Celsius to Fahrenheit.
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Millibar to inches of mercury.
pub fn mbar_to_inhg(mbar: f64) -> f64 {
    mbar * 0.029_529_983
}
