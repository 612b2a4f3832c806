//! MS5607 command protocol over an SPI device.
//!
//! The transport owns a "settling delay" that is inserted after each
//! command byte.  Operations that need a different delay set it for their
//! own duration through [`AltimeterTransport::with_delay`] and restore the
//! previous value afterwards.

use embedded_hal::spi::{Error as _, Operation, SpiDevice};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SensorError};

// MS5607 commands
pub const CMD_RESET: u8 = 0x1E;
pub const CMD_ADC_READ: u8 = 0x00;
pub const CMD_CONVERT: u8 = 0x40;
pub const CMD_PROM_READ: u8 = 0xA0;

/// Reload time after RESET (µs).
pub const RESET_SETTLE_US: u32 = 3_000;

/// ADC oversampling ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Oversampling {
    Osr256,
    Osr512,
    Osr1024,
    Osr2048,
    Osr4096,
}

impl Oversampling {
    /// Bits OR-ed into the conversion command.
    pub const fn code(self) -> u8 {
        match self {
            Self::Osr256 => 0x00,
            Self::Osr512 => 0x02,
            Self::Osr1024 => 0x04,
            Self::Osr2048 => 0x06,
            Self::Osr4096 => 0x08,
        }
    }

    /// Worst-case conversion time (µs).
    pub const fn settle_us(self) -> u32 {
        match self {
            Self::Osr256 => 900,
            Self::Osr512 => 3_000,
            Self::Osr1024 => 4_000,
            Self::Osr2048 => 6_000,
            Self::Osr4096 => 10_000,
        }
    }
}

/// ADC input selected by a conversion command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// D1
    Pressure,
    /// D2
    Temperature,
}

impl Channel {
    const fn code(self) -> u8 {
        match self {
            Self::Pressure => 0x00,
            Self::Temperature => 0x10,
        }
    }
}

/// Conversion-start command byte for `channel` at `osr`.
pub const fn convert_command(channel: Channel, osr: Oversampling) -> u8 {
    CMD_CONVERT | channel.code() | osr.code()
}

/// PROM read command byte for coefficient `index` (0–7).
pub const fn prom_command(index: u8) -> u8 {
    CMD_PROM_READ + ((index & 0x07) << 1)
}

/// Byte-level MS5607 protocol.
pub struct AltimeterTransport<SPI> {
    spi: SPI,
    /// Wait inserted after each command (µs).
    delay_us: u32,
}

impl<SPI: SpiDevice> AltimeterTransport<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi, delay_us: 0 }
    }

    pub fn delay_us(&self) -> u32 {
        self.delay_us
    }

    /// Run `f` with the settling delay set to `delay_us`, then put the
    /// previous delay back whether or not `f` failed.
    pub fn with_delay<R>(&mut self, delay_us: u32, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let saved = self.delay_us;
        self.delay_us = delay_us;
        let out = f(self);
        self.delay_us = saved;
        out
    }

    /// Reload the PROM into the sensor's internal registers.
    pub fn reset(&mut self) -> Result<()> {
        self.with_delay(RESET_SETTLE_US, |t| t.command(CMD_RESET))
    }

    /// Read calibration word `index` (0–7).
    pub fn read_prom(&mut self, index: u8) -> Result<u16> {
        self.with_delay(0, |t| {
            let mut buf = [prom_command(index), 0, 0];
            t.transfer(&mut buf)?;
            Ok(u16::from_be_bytes([buf[1], buf[2]]))
        })
    }

    /// Start a conversion and wait for it to settle.
    pub fn convert(&mut self, channel: Channel, osr: Oversampling) -> Result<()> {
        self.with_delay(osr.settle_us(), |t| t.command(convert_command(channel, osr)))
    }

    /// Shift out the 24-bit result of the last conversion.
    pub fn read_adc(&mut self) -> Result<u32> {
        let mut buf = [CMD_ADC_READ, 0, 0, 0];
        self.transfer(&mut buf)?;
        Ok(u32::from_be_bytes([0, buf[1], buf[2], buf[3]]))
    }

    /// Convert `channel` and return the raw ADC value.
    pub fn measure(&mut self, channel: Channel, osr: Oversampling) -> Result<u32> {
        self.convert(channel, osr)?;
        self.read_adc()
    }

    pub fn release(self) -> SPI {
        self.spi
    }

    fn command(&mut self, cmd: u8) -> Result<()> {
        let bytes = [cmd];
        let res = if self.delay_us == 0 {
            self.spi.write(&bytes)
        } else {
            self.spi.transaction(&mut [
                Operation::Write(&bytes),
                Operation::DelayNs(self.delay_us.saturating_mul(1_000)),
            ])
        };
        res.map_err(|e| SensorError::Transport(e.kind()).into())
    }

    fn transfer(&mut self, buf: &mut [u8]) -> Result<()> {
        self.spi
            .transfer_in_place(buf)
            .map_err(|e| SensorError::Transport(e.kind()).into())
    }
}
