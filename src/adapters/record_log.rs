//! CSV output log adapter.
//!
//! Implements [`RecordSink`] over any [`Write`].  On target this is a
//! `BufWriter<File>` on the SD card; tests use a `Vec<u8>`.

use std::io::Write;

use crate::app::ports::RecordSink;
use crate::app::record::{CSV_HEADER, OutputRecord};
use crate::error::{Error, Result};

pub struct CsvRecordLog<W: Write> {
    out: W,
    rows: u64,
}

impl<W: Write> CsvRecordLog<W> {
    pub fn new(out: W) -> Self {
        Self { out, rows: 0 }
    }

    /// Rows appended so far (header excluded).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for CsvRecordLog<W> {
    fn write_header(&mut self) -> Result<()> {
        writeln!(self.out, "{CSV_HEADER}").map_err(|_| Error::Io("output header write"))
    }

    fn append(&mut self, record: &OutputRecord) -> Result<()> {
        let row = record.to_csv_row()?;
        writeln!(self.out, "{row}").map_err(|_| Error::Io("output row write"))?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush().map_err(|_| Error::Io("output flush"))
    }
}
