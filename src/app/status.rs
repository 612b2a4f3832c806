//! Status board shared between the control thread and readers.
//!
//! Only the control service writes it.  Anything else (indicator, console,
//! shutdown path) takes a copy.

use core::cell::Cell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;

use crate::fsm::StateId;

/// Copy of the control flags at the end of the last tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    pub state: StateId,
    /// Level the HV gate holds, which lags the request after a failed write.
    pub hv_on: bool,
    pub self_test_done: bool,
    pub altitude_m: Option<f32>,
    pub fault_flags: u8,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            state: StateId::Startup,
            hv_on: false,
            self_test_done: false,
            altitude_m: None,
            fault_flags: 0,
        }
    }
}

/// Lock-guarded [`StatusSnapshot`].
pub struct StatusBoard {
    inner: CriticalSectionMutex<Cell<StatusSnapshot>>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            inner: CriticalSectionMutex::new(Cell::new(StatusSnapshot::default())),
        }
    }

    pub fn publish(&self, snapshot: StatusSnapshot) {
        self.inner.lock(|cell| cell.set(snapshot));
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.lock(Cell::get)
    }

    pub fn hv_on(&self) -> bool {
        self.snapshot().hv_on
    }
}
