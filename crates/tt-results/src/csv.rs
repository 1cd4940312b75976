//! CSV export of level histories.
//!
//! Four columns, values rounded to three decimals. Rows are written as they
//! arrive so a long run never has to hold its full history.

use crate::types::TimeseriesRecord;
use std::io::{self, Write};

pub const CSV_HEADER: &str = "Time (s),Setpoint (cm),H1 (cm),H2 (cm)";

pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

pub struct CsvSeriesWriter<W: Write> {
    out: W,
    rows: usize,
}

impl<W: Write> CsvSeriesWriter<W> {
    /// Writes the header immediately.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{CSV_HEADER}")?;
        Ok(Self { out, rows: 0 })
    }

    pub fn write_row(&mut self, time_s: f64, setpoint: f64, h1: f64, h2: f64) -> io::Result<()> {
        writeln!(
            self.out,
            "{},{},{},{}",
            round3(time_s),
            round3(setpoint),
            round3(h1),
            round3(h2)
        )?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_record(&mut self, record: &TimeseriesRecord) -> io::Result<()> {
        self.write_row(
            record.time_s,
            record.setpoint_cm,
            record.h1_cm,
            record.h2_cm,
        )
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Flushes and hands back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

pub fn write_csv<W: Write>(out: W, records: &[TimeseriesRecord]) -> io::Result<W> {
    let mut writer = CsvSeriesWriter::new(out)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.finish()
}
