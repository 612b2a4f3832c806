//! Unified error types for the STAR firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! control loop's error handling uniform.  All variants are `Copy` so they
//! can be passed through the altitude supervisor and the FSM without
//! allocation.

use core::fmt;

use embedded_hal::spi::ErrorKind;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The altimeter could not be read or returned unusable data.
    Sensor(SensorError),
    /// An output pin (HV gate, indicator) could not be driven.
    Actuator(ActuatorError),
    /// A latched supervisor fault.
    Fault(Fault),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// The output or status log could not be written.
    Io(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Fault(e) => write!(f, "fault: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The SPI transfer itself failed.
    Transport(ErrorKind),
    /// PROM CRC-4 does not match the stored nibble.
    CrcMismatch { stored: u8, computed: u8 },
    /// Altitude requested before a QFF reference exists.
    NotCalibrated,
    /// A second implicit QFF calibration was attempted.
    AlreadyCalibrated,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(kind) => write!(f, "SPI transfer failed ({kind})"),
            Self::CrcMismatch { stored, computed } => {
                write!(f, "PROM CRC mismatch (stored {stored:#x}, computed {computed:#x})")
            }
            Self::NotCalibrated => write!(f, "QFF reference not set"),
            Self::AlreadyCalibrated => write!(f, "QFF reference already set"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed on the HV gate.
    HvGateWriteFailed,
    /// GPIO set failed on the status indicator.
    IndicatorWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HvGateWriteFailed => write!(f, "HV gate write failed"),
            Self::IndicatorWriteFailed => write!(f, "indicator write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Supervisor faults
// ---------------------------------------------------------------------------

/// Faults are accumulated in a bitfield by the altitude supervisor so that
/// several can be tracked and individually cleared.  None of them toggles
/// HV on its own; they are reported in the heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Fault {
    /// Altimeter reads have failed for longer than the hold time.
    AltimeterLost = 0b0000_0001,
    /// PROM coefficients failed the CRC-4 check at startup.
    CalibrationCrc = 0b0000_0010,
}

impl Fault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AltimeterLost => write!(f, "altimeter lost"),
            Self::CalibrationCrc => write!(f, "calibration CRC mismatch"),
        }
    }
}

impl From<Fault> for Error {
    fn from(e: Fault) -> Self {
        Self::Fault(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
