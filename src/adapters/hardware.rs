//! Hardware adapter. Bridges real peripherals to domain port traits.
//!
//! Owns the [`Altimeter`] and the [`HvGate`], exposing them through
//! [`SensorPort`] and [`ActuatorPort`].  Both are generic over
//! embedded-hal traits, so the same adapter runs against ESP-IDF drivers
//! on target and mocks on the host.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::drivers::hv_gate::HvGate;
use crate::error::Result;
use crate::sensors::compensation::LaunchSite;
use crate::sensors::{Altimeter, AltimeterReading, CalibrationStatus};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<SPI, HV> {
    altimeter: Altimeter<SPI>,
    hv: HvGate<HV>,
}

impl<SPI: SpiDevice, HV: OutputPin> HardwareAdapter<SPI, HV> {
    pub fn new(altimeter: Altimeter<SPI>, hv: HvGate<HV>) -> Self {
        Self { altimeter, hv }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<SPI: SpiDevice, HV: OutputPin> SensorPort for HardwareAdapter<SPI, HV> {
    fn init_altimeter(&mut self) -> Result<CalibrationStatus> {
        self.altimeter.init()
    }

    fn calibrate_qff(&mut self, site: &LaunchSite) -> Result<f64> {
        self.altimeter.calibrate_qff(site)
    }

    fn recalibrate_qff(&mut self, site: &LaunchSite) -> Result<f64> {
        self.altimeter.recalibrate_qff(site)
    }

    fn read_altimeter(&mut self) -> Result<AltimeterReading> {
        self.altimeter.read()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<SPI: SpiDevice, HV: OutputPin> ActuatorPort for HardwareAdapter<SPI, HV> {
    fn set_hv(&mut self, on: bool) -> Result<()> {
        self.hv.set(on)
    }

    fn is_hv_on(&self) -> bool {
        self.hv.is_on()
    }
}
