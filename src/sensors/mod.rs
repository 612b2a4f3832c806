//! Barometric altimeter (MS5607 over SPI).
//!
//! [`Altimeter`] combines the byte protocol in [`transport`] with the
//! compensation model in [`compensation`] and adds bounded retries.  It is
//! exposed to the control loop through
//! [`HardwareAdapter`](crate::adapters::hardware::HardwareAdapter).

pub mod compensation;
pub mod crc;
pub mod transport;

use embedded_hal::spi::SpiDevice;
use log::{debug, warn};

use crate::config::SystemConfig;
use crate::error::{Result, SensorError};

use compensation::{
    CalibrationCoefficients, CompensatedSample, LaunchSite, RawSample, SensorCompensator,
};
use transport::{AltimeterTransport, Channel, Oversampling};

/// One altimeter read: the raw conversions and what they mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltimeterReading {
    pub raw: RawSample,
    pub sample: CompensatedSample,
}

/// Outcome of the PROM integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationStatus {
    pub stored_crc: u8,
    pub computed_crc: u8,
}

impl CalibrationStatus {
    pub fn is_valid(&self) -> bool {
        self.stored_crc == self.computed_crc
    }

    /// The mismatch as an error, if there is one.
    pub fn check(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(SensorError::CrcMismatch {
                stored: self.stored_crc,
                computed: self.computed_crc,
            }
            .into())
        }
    }
}

/// MS5607 driver with retry.
pub struct Altimeter<SPI> {
    transport: AltimeterTransport<SPI>,
    compensator: Option<SensorCompensator>,
    pressure_osr: Oversampling,
    temperature_osr: Oversampling,
    attempts: u8,
}

impl<SPI: SpiDevice> Altimeter<SPI> {
    pub fn new(spi: SPI, config: &SystemConfig) -> Self {
        Self {
            transport: AltimeterTransport::new(spi),
            compensator: None,
            pressure_osr: config.pressure_osr,
            temperature_osr: config.temperature_osr,
            attempts: config.altimeter_retries.max(1),
        }
    }

    /// Reset the sensor and load the PROM.  Coefficients are kept even when
    /// the CRC does not match; the caller decides whether that is fatal.
    pub fn init(&mut self) -> Result<CalibrationStatus> {
        self.transport.reset()?;
        let mut words = [0u16; 8];
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.transport.read_prom(i as u8)?;
        }
        debug!("Altimeter PROM: {:04X?}", words);

        let status = CalibrationStatus {
            stored_crc: crc::stored_crc(&words),
            computed_crc: crc::crc4(&words),
        };
        self.compensator = Some(SensorCompensator::new(CalibrationCoefficients::new(words)));
        Ok(status)
    }

    /// D1 then D2 at the configured oversampling, retried as a unit.
    pub fn read_raw(&mut self) -> Result<RawSample> {
        let (p_osr, t_osr) = (self.pressure_osr, self.temperature_osr);
        let mut last_err = None;
        for attempt in 1..=self.attempts {
            let res = self.transport.measure(Channel::Pressure, p_osr).and_then(|pressure_raw| {
                let temperature_raw = self.transport.measure(Channel::Temperature, t_osr)?;
                Ok(RawSample {
                    pressure_raw,
                    temperature_raw,
                })
            });
            match res {
                Ok(raw) => return Ok(raw),
                Err(e) => {
                    warn!("Altimeter read attempt {}/{} failed: {}", attempt, self.attempts, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(SensorError::Transport(embedded_hal::spi::ErrorKind::Other).into()))
    }

    /// Read and compensate one sample.
    pub fn read(&mut self) -> Result<AltimeterReading> {
        let raw = self.read_raw()?;
        let sample = self.compensator()?.compensate(raw)?;
        Ok(AltimeterReading { raw, sample })
    }

    /// Take a live reading and set the QFF reference from it (once).
    pub fn calibrate_qff(&mut self, site: &LaunchSite) -> Result<f64> {
        let reading = self.read()?;
        self.compensator_mut()?.calibrate_qff(&reading.sample, site)
    }

    /// Take a live reading and replace the QFF reference.
    pub fn recalibrate_qff(&mut self, site: &LaunchSite) -> Result<f64> {
        let reading = self.read()?;
        self.compensator_mut()?.recalibrate_qff(&reading.sample, site)
    }

    pub fn qff(&self) -> Option<f64> {
        self.compensator.as_ref().and_then(SensorCompensator::qff)
    }

    fn compensator(&self) -> Result<&SensorCompensator> {
        self.compensator
            .as_ref()
            .ok_or_else(|| SensorError::NotCalibrated.into())
    }

    fn compensator_mut(&mut self) -> Result<&mut SensorCompensator> {
        self.compensator
            .as_mut()
            .ok_or_else(|| SensorError::NotCalibrated.into())
    }
}
