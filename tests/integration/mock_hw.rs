//! Mock adapters for integration tests.
//!
//! `MockHardware` scripts altitudes (or read failures) and records every
//! HV write.  `Ms5607Sim` answers the altimeter's SPI byte protocol so the
//! real driver can run unmodified.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, ErrorType, Operation, SpiDevice};

use star::app::events::AppEvent;
use star::app::ports::{ActuatorPort, EventSink, RecordSink, SensorPort};
use star::app::record::OutputRecord;
use star::counting::PulseCounter;
use star::error::{ActuatorError, Error, Result, SensorError};
use star::sensors::compensation::{CompensatedSample, LaunchSite, RawSample};
use star::sensors::crc;
use star::sensors::{AltimeterReading, CalibrationStatus};

/// Datasheet calibration words; word 7 gets its CRC nibble in `prom()`.
pub const DATASHEET_PROM: [u16; 8] = [0, 46372, 43981, 29059, 27842, 31553, 28165, 0];
pub const DATASHEET_D1: u32 = 6_465_444;
pub const DATASHEET_D2: u32 = 8_077_636;

pub fn prom(valid_crc: bool) -> [u16; 8] {
    let mut words = DATASHEET_PROM;
    let crc = crc::crc4(&words);
    words[7] |= u16::from(if valid_crc { crc } else { crc ^ 0x5 });
    words
}

/// One counted pulse at `t_ns` with 200 µs dead time.
pub fn pulse(counter: &PulseCounter, t_ns: i64) {
    counter.on_edge(t_ns);
    counter.on_edge(t_ns + 200_000);
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    /// Altitude for each upcoming read; `None` is a failed read.  When the
    /// queue runs dry the last entry repeats.
    pub altitudes: VecDeque<Option<f64>>,
    last: Option<f64>,
    pub crc_valid: bool,
    pub init_fails: bool,
    pub qff_fails: bool,
    pub qff_calls: u32,
    pub recalibrations: u32,
    pub hv_on: bool,
    /// Every HV level written successfully, in order.
    pub hv_writes: Vec<bool>,
    pub fail_hv_writes: usize,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            altitudes: VecDeque::new(),
            last: Some(0.0),
            crc_valid: true,
            init_fails: false,
            qff_fails: false,
            qff_calls: 0,
            recalibrations: 0,
            hv_on: false,
            hv_writes: Vec::new(),
            fail_hv_writes: 0,
        }
    }

    pub fn script(&mut self, altitudes: &[Option<f64>]) {
        self.altitudes.extend(altitudes.iter().copied());
    }

    /// Number of off→on switches recorded.
    pub fn hv_rising(&self) -> usize {
        self.hv_writes.windows(2).filter(|w| !w[0] && w[1]).count()
    }

    fn reading(altitude: f64) -> AltimeterReading {
        AltimeterReading {
            raw: RawSample {
                pressure_raw: DATASHEET_D1,
                temperature_raw: DATASHEET_D2,
            },
            sample: CompensatedSample {
                temperature_c: 20.0,
                pressure_first_mbar: 1000.0,
                pressure_mbar: 1000.0,
                altitude_m: Some(altitude),
            },
        }
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn init_altimeter(&mut self) -> Result<CalibrationStatus> {
        if self.init_fails {
            return Err(SensorError::Transport(spi::ErrorKind::Other).into());
        }
        let words = prom(self.crc_valid);
        Ok(CalibrationStatus {
            stored_crc: crc::stored_crc(&words),
            computed_crc: crc::crc4(&words),
        })
    }

    fn calibrate_qff(&mut self, _site: &LaunchSite) -> Result<f64> {
        if self.qff_fails {
            return Err(SensorError::Transport(spi::ErrorKind::Other).into());
        }
        self.qff_calls += 1;
        Ok(1013.25)
    }

    fn recalibrate_qff(&mut self, _site: &LaunchSite) -> Result<f64> {
        self.recalibrations += 1;
        Ok(1009.5)
    }

    fn read_altimeter(&mut self) -> Result<AltimeterReading> {
        let next = self.altitudes.pop_front().unwrap_or(self.last);
        self.last = next;
        next.map(Self::reading)
            .ok_or(SensorError::Transport(spi::ErrorKind::Other).into())
    }
}

impl ActuatorPort for MockHardware {
    fn set_hv(&mut self, on: bool) -> Result<()> {
        if self.fail_hv_writes > 0 {
            self.fail_hv_writes -= 1;
            return Err(ActuatorError::HvGateWriteFailed.into());
        }
        self.hv_on = on;
        self.hv_writes.push(on);
        Ok(())
    }

    fn is_hv_on(&self) -> bool {
        self.hv_on
    }
}

// ── Sinks ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemRecords {
    pub header: bool,
    pub rows: Vec<OutputRecord>,
    pub flushes: u32,
}

impl RecordSink for MemRecords {
    fn write_header(&mut self) -> Result<()> {
        self.header = true;
        Ok(())
    }

    fn append(&mut self, record: &OutputRecord) -> Result<()> {
        self.rows.push(*record);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct EventLog {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl EventLog {
    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MS5607 bus simulator ──────────────────────────────────────

#[derive(Debug, Default)]
pub struct SimState {
    pub prom: [u16; 8],
    pub d1: u32,
    pub d2: u32,
    pending: Option<u32>,
    pub resets: u32,
    pub conversions: u32,
    /// Fail this many upcoming transactions.
    pub fail_next: usize,
}

/// Behavioural MS5607 behind an [`SpiDevice`].  Clone the handle to tweak
/// the simulated pressure while the driver owns the bus.
#[derive(Clone)]
pub struct Ms5607Sim {
    pub state: Rc<RefCell<SimState>>,
}

#[allow(dead_code)]
impl Ms5607Sim {
    pub fn new(prom: [u16; 8]) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState {
                prom,
                d1: DATASHEET_D1,
                d2: DATASHEET_D2,
                ..SimState::default()
            })),
        }
    }

    pub fn set_d1(&self, d1: u32) {
        self.state.borrow_mut().d1 = d1;
    }

    pub fn fail_next(&self, n: usize) {
        self.state.borrow_mut().fail_next = n;
    }
}

impl ErrorType for Ms5607Sim {
    type Error = spi::ErrorKind;
}

impl SpiDevice for Ms5607Sim {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> core::result::Result<(), spi::ErrorKind> {
        let mut st = self.state.borrow_mut();
        if st.fail_next > 0 {
            st.fail_next -= 1;
            return Err(spi::ErrorKind::Other);
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => match bytes.first().copied() {
                    Some(0x1E) => {
                        st.resets += 1;
                        st.pending = None;
                    }
                    Some(cmd) if cmd & 0xF0 == 0x40 || cmd & 0xF0 == 0x50 => {
                        st.conversions += 1;
                        st.pending = Some(if cmd & 0x10 != 0 { st.d2 } else { st.d1 });
                    }
                    _ => {}
                },
                Operation::TransferInPlace(buf) => match buf[0] {
                    cmd if cmd & 0xF0 == 0xA0 => {
                        let word = st.prom[usize::from((cmd & 0x0E) >> 1)];
                        buf[1..3].copy_from_slice(&word.to_be_bytes());
                    }
                    0x00 => {
                        let value = st.pending.take().unwrap_or(0);
                        buf[1..4].copy_from_slice(&value.to_be_bytes()[1..]);
                    }
                    _ => {}
                },
                Operation::DelayNs(_) | Operation::Read(_) | Operation::Transfer(..) => {}
            }
        }
        Ok(())
    }
}

// ── Recording GPIO ────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingPin {
    pub levels: Rc<RefCell<Vec<bool>>>,
}

#[allow(dead_code)]
impl RecordingPin {
    pub fn level(&self) -> Option<bool> {
        self.levels.borrow().last().copied()
    }
}

impl digital::ErrorType for RecordingPin {
    type Error = digital::ErrorKind;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> core::result::Result<(), digital::ErrorKind> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), digital::ErrorKind> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

#[allow(dead_code)]
pub fn transport_error() -> Error {
    SensorError::Transport(spi::ErrorKind::Other).into()
}
