//! One row of the per-second output log.

use core::fmt::Write as _;

use crate::counting::SecondSlot;
use crate::error::{Error, Result};
use crate::sensors::AltimeterReading;

/// Column header, matching [`OutputRecord::to_csv_row`].
pub const CSV_HEADER: &str = "elapsed_s,counts,T_raw,T1_C,P_raw,P1_mbar,P2_mbar,altitude_m,dead_time_s,dead_time_events";

/// Room for the longest possible row.
pub const ROW_CAPACITY: usize = 192;

/// Everything logged for one completed second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputRecord {
    pub elapsed_s: i64,
    pub slot: SecondSlot,
    /// `None` when no fresh altimeter reading exists for this second.
    pub altimeter: Option<AltimeterReading>,
}

impl OutputRecord {
    /// Render as one CSV line without the trailing newline.  Altimeter
    /// columns are left empty when there is no reading; the altitude
    /// column is empty while QFF is unset.
    pub fn to_csv_row(&self) -> Result<heapless::String<ROW_CAPACITY>> {
        let mut row = heapless::String::new();
        self.write_row(&mut row)
            .map_err(|_| Error::Io("output row overflow"))?;
        Ok(row)
    }

    fn write_row(&self, row: &mut heapless::String<ROW_CAPACITY>) -> core::fmt::Result {
        write!(row, "{},{},", self.elapsed_s, self.slot.counts)?;
        match &self.altimeter {
            Some(r) => {
                write!(
                    row,
                    "{},{:.2},{},{:.2},{:.2},",
                    r.raw.temperature_raw,
                    r.sample.temperature_c,
                    r.raw.pressure_raw,
                    r.sample.pressure_first_mbar,
                    r.sample.pressure_mbar,
                )?;
                if let Some(alt) = r.sample.altitude_m {
                    write!(row, "{alt:.2}")?;
                }
                row.push(',').map_err(|_| core::fmt::Error)?;
            }
            None => row.push_str(",,,,,,").map_err(|_| core::fmt::Error)?,
        }
        write!(
            row,
            "{:.6},{}",
            self.slot.dead_time_secs(),
            self.slot.dead_time_events
        )
    }
}
