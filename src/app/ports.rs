//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! Driven adapters (altimeter, HV gate, status log, output log, config
//! file) implement these traits.  The
//! [`ControlService`](super::service::ControlService) consumes them via
//! generics, so the domain core never touches hardware directly.

use crate::config::SystemConfig;
use crate::error::Result;
use crate::sensors::compensation::LaunchSite;
use crate::sensors::{AltimeterReading, CalibrationStatus};

use super::events::AppEvent;
use super::record::OutputRecord;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the barometric altimeter.
pub trait SensorPort {
    /// Reset the sensor and load its calibration PROM.
    fn init_altimeter(&mut self) -> Result<CalibrationStatus>;

    /// Set the sea-level reference from a live reading.  Write-once.
    fn calibrate_qff(&mut self, site: &LaunchSite) -> Result<f64>;

    /// Deliberately replace the sea-level reference.
    fn recalibrate_qff(&mut self, site: &LaunchSite) -> Result<f64>;

    /// One compensated reading, after the adapter's bounded retries.
    fn read_altimeter(&mut self) -> Result<AltimeterReading>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port.  Only the control service calls this.
pub trait ActuatorPort {
    /// Drive the tube's high-voltage enable.
    fn set_hv(&mut self, on: bool) -> Result<()>;

    /// Level last written successfully.
    fn is_hv_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → status log)
// ───────────────────────────────────────────────────────────────

/// The domain emits lifecycle [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Record sink port (driven adapter: domain → output log)
// ───────────────────────────────────────────────────────────────

/// Destination of the one-row-per-second output log.
pub trait RecordSink {
    /// Write the column header.  Called once at startup; failure is fatal.
    fn write_header(&mut self) -> Result<()>;

    fn append(&mut self, record: &OutputRecord) -> Result<()>;

    /// Push buffered rows to persistent storage.
    fn flush(&mut self) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads system configuration.
///
/// Implementations MUST call [`SystemConfig::validate`] before returning;
/// invalid values are rejected, not clamped.
pub trait ConfigPort {
    fn load(&self) -> Result<SystemConfig>;
}
