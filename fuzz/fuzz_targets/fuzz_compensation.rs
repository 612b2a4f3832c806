//! Fuzz target: MS5607 compensation and QFF math
//!
//! Feeds arbitrary PROM words and raw conversions through the
//! compensator and checks:
//! - No panics on any input (zero, saturated, cold or hot)
//! - Accepted samples are finite and inside the plausible pressure range
//! - Altitude is finite whenever QFF calibration succeeded
//!
//! cargo fuzz run fuzz_compensation

#![no_main]

use libfuzzer_sys::fuzz_target;
use star::sensors::compensation::{
    CalibrationCoefficients, LaunchSite, RawSample, SensorCompensator,
};
use star::sensors::crc;

fuzz_target!(|data: &[u8]| {
    if data.len() < 22 {
        return;
    }
    let mut words = [0u16; 8];
    for (i, w) in words.iter_mut().enumerate() {
        *w = u16::from_le_bytes([data[2 * i], data[2 * i + 1]]);
    }
    assert!(crc::crc4(&words) <= 0x0F);

    let raw = RawSample {
        pressure_raw: u32::from_le_bytes([data[16], data[17], data[18], 0]),
        temperature_raw: u32::from_le_bytes([data[19], data[20], data[21], 0]),
    };

    let mut comp = SensorCompensator::new(CalibrationCoefficients::new(words));
    let Ok(sample) = comp.compensate(raw) else {
        return;
    };
    assert!(sample.pressure_mbar.is_finite());
    assert!((10.0..=1200.0).contains(&sample.pressure_mbar));

    let site = LaunchSite {
        latitude_deg: 42.29,
        elevation_m: 45.0,
        instrument_height_m: 2.0,
    };
    if comp.calibrate_qff(&sample, &site).is_ok() {
        if let Ok(again) = comp.compensate(raw) {
            assert!(again.altitude_m.is_some_and(f64::is_finite));
        }
    }
});
