//! Incremental CSV output for a logging session.

use crate::error::Result;
use flight_domain::{TelemetryColumn, TelemetrySample};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Appends telemetry rows to a CSV sink, flushing after every row.
pub struct CsvRecorder<W: Write> {
    writer: csv::Writer<W>,
    path: PathBuf,
    rows: u64,
}

impl CsvRecorder<File> {
    /// Create (or truncate) the file at `path` and write the header row.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        debug!(path = %path.display(), "Created telemetry log");
        Self::new(file, path)
    }
}

impl<W: Write> CsvRecorder<W> {
    /// Wrap any writer; `path` is only used to describe the output.
    pub fn new<P: Into<PathBuf>>(inner: W, path: P) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(TelemetryColumn::ALL.iter().map(TelemetryColumn::as_str))?;
        writer.flush()?;

        Ok(Self {
            writer,
            path: path.into(),
            rows: 0,
        })
    }

    /// Append one row and flush it through to the sink.
    pub fn record(&mut self, sample: &TelemetrySample) -> Result<()> {
        self.writer.serialize(sample)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far, excluding the header.
    pub const fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| err.into_error().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(elapsed_s: f64, height_cm: f64) -> TelemetrySample {
        TelemetrySample {
            elapsed_s,
            height_cm,
            roll_deg: 1.5,
            pitch_deg: -0.5,
            yaw_deg: 12.0,
            battery_pct: 88,
            accel_x: 0.02,
            temperature_c: 30.0,
            horizontal_speed_cm_s: 5.0,
            vertical_speed_cm_s: 50.0,
        }
    }

    #[test]
    fn test_header_written_on_create() {
        let recorder = CsvRecorder::new(Vec::new(), "mem.csv").unwrap();
        let bytes = recorder.finish().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "t_s,height_cm,roll_deg,pitch_deg,yaw_deg,batt_%,accel_x,temp_c,speed_cm_s,vz_cm_s\n"
        );
    }

    #[test]
    fn test_rows_follow_header() {
        let mut recorder = CsvRecorder::new(Vec::new(), "mem.csv").unwrap();
        recorder.record(&sample(0.0, 100.0)).unwrap();
        recorder.record(&sample(0.1, 105.0)).unwrap();
        assert_eq!(recorder.rows(), 2);

        let text = String::from_utf8(recorder.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("0.1,105.0,"));
        assert!(lines[2].contains(",88,"));
    }

    #[test]
    fn test_each_row_flushed_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flight.csv");

        let mut recorder = CsvRecorder::create(&path).unwrap();
        recorder.record(&sample(0.0, 100.0)).unwrap();

        // still open: the row must already be on disk
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk.lines().count(), 2);
        assert_eq!(recorder.path(), path.as_path());

        recorder.finish().unwrap();
    }
}
