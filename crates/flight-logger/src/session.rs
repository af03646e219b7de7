//! Fixed-rate logging session.
//!
//! Polls the device, appends one flushed CSV row per iteration and writes a
//! status line, until the stop signal fires or a read/write fails. Shutdown
//! (land, close, "Saved") always runs afterwards.

use crate::device::TelemetryDevice;
use crate::error::{LoggerError, Result};
use crate::kinematics::SampleDeriver;
use crate::recorder::CsvRecorder;
use flight_domain::{SampleRate, TelemetrySample};
use std::io::Write;
use std::time::Instant;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Outcome of a completed session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    /// Rows written, excluding the header
    pub samples: u64,
    /// Rows whose height marks the drone as in flight
    pub flight_samples: u64,
    /// Wall time between session start and the last sample
    pub elapsed_s: f64,
}

impl SessionSummary {
    /// Average rate actually reached; lags the target under polling load.
    #[must_use]
    pub fn achieved_rate_hz(&self) -> f64 {
        if self.samples < 2 || self.elapsed_s <= 0.0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let intervals = (self.samples - 1) as f64;
            intervals / self.elapsed_s
        }
    }
}

/// Why the polling loop ended.
enum LoopExit {
    Stopped,
    Failed(LoggerError),
}

/// One logging session over a paired device.
pub struct LoggingSession<D: TelemetryDevice, W: Write> {
    device: D,
    recorder: CsvRecorder<W>,
    rate: SampleRate,
    flight_samples: u64,
}

impl<D: TelemetryDevice, W: Write> LoggingSession<D, W> {
    pub const fn new(device: D, recorder: CsvRecorder<W>, rate: SampleRate) -> Self {
        Self {
            device,
            recorder,
            rate,
            flight_samples: 0,
        }
    }

    /// Run until `stop` carries `true`. Console output goes to `out`.
    ///
    /// A dropped stop sender never ends the session. Errors from the loop are
    /// returned only after shutdown has run and `Saved: <path>` was printed.
    pub async fn run<O: Write>(
        mut self,
        out: &mut O,
        mut stop: watch::Receiver<bool>,
    ) -> Result<SessionSummary> {
        writeln!(out, "Logging started. Fly manually. Press Ctrl+C to stop.")?;
        info!(
            path = %self.recorder.path().display(),
            rate_hz = self.rate.hz(),
            "Logging session started"
        );

        let start = Instant::now();
        let mut last_sample_s = 0.0;

        let exit = match self.poll(out, &mut stop, start, &mut last_sample_s).await {
            Ok(()) => LoopExit::Stopped,
            Err(err) => LoopExit::Failed(err),
        };

        match &exit {
            LoopExit::Stopped => {
                // a failed console write must not skip shutdown
                let _ = writeln!(out, "\nStop requested.");
            }
            LoopExit::Failed(err) => warn!(error = %err, "Logging loop aborted"),
        }

        self.shutdown_device();

        let samples = self.recorder.rows();
        let path = self.recorder.path().to_path_buf();
        let finished = self.recorder.finish().map(|_| ());
        if let Err(err) = &finished {
            warn!(error = %err, "Failed to finalize telemetry log");
        }

        writeln!(out, "Saved: {}", path.display())?;

        let summary = SessionSummary {
            samples,
            flight_samples: self.flight_samples,
            elapsed_s: last_sample_s,
        };
        info!(
            samples = summary.samples,
            flight_samples = summary.flight_samples,
            elapsed_s = summary.elapsed_s,
            achieved_rate_hz = summary.achieved_rate_hz(),
            target_rate_hz = self.rate.hz(),
            "Logging session finished"
        );

        match exit {
            LoopExit::Failed(err) => Err(err),
            LoopExit::Stopped => finished.map(|()| summary),
        }
    }

    async fn poll<O: Write>(
        &mut self,
        out: &mut O,
        stop: &mut watch::Receiver<bool>,
        start: Instant,
        last_sample_s: &mut f64,
    ) -> Result<()> {
        let mut deriver = SampleDeriver::new(self.device.height_cm()?);
        let interval = self.rate.interval();

        loop {
            if *stop.borrow() {
                return Ok(());
            }

            let elapsed_s = start.elapsed().as_secs_f64();
            let readings = self.device.read_sensors()?;
            let sample = deriver.derive(elapsed_s, &readings);

            self.recorder.record(&sample)?;
            if sample.is_valid_flight_record() {
                self.flight_samples += 1;
            }
            writeln!(out, "{}", status_line(&sample))?;
            *last_sample_s = elapsed_s;

            tokio::select! {
                () = stop_requested(stop) => return Ok(()),
                () = sleep(interval) => {}
            }
        }
    }

    /// Best-effort: land, then release the connection. Failures are logged
    /// and never abort shutdown.
    fn shutdown_device(&mut self) {
        match self.device.land() {
            Ok(()) => debug!("Land command accepted"),
            Err(err) => warn!(error = %err, "Land command failed during shutdown"),
        }
        match self.device.close() {
            Ok(()) => debug!("Device connection closed"),
            Err(err) => warn!(error = %err, "Closing device failed during shutdown"),
        }
    }
}

/// Resolves once the stop flag is set. A closed channel never resolves.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Live console line for one sample.
pub fn status_line(sample: &TelemetrySample) -> String {
    format!(
        "t={:5.2}s  h={:6.1}cm  roll={:6.1}  pitch={:6.1}  yaw={:6.1}  batt={:3}%  ax={:6.2}  temp={}  vxy={:6.1}  vz={:6.1}",
        sample.elapsed_s,
        sample.height_cm,
        sample.roll_deg,
        sample.pitch_deg,
        sample.yaw_deg,
        sample.battery_pct,
        sample.accel_x,
        sample.temperature_c,
        sample.horizontal_speed_cm_s,
        sample.vertical_speed_cm_s,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceResult;
    use crate::error::DeviceError;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scripted device: fixed heights, cancels the session after `stop_after`
    /// sensor passes, and optionally fails lifecycle or sensor calls.
    struct ScriptedDevice {
        heights: Vec<f64>,
        reads: usize,
        stop_after: usize,
        stop_tx: watch::Sender<bool>,
        fail_height_at: Option<usize>,
        fail_shutdown: bool,
        lifecycle: Rc<RefCell<Vec<&'static str>>>,
    }

    impl ScriptedDevice {
        fn new(stop_tx: watch::Sender<bool>, stop_after: usize) -> Self {
            Self {
                heights: vec![100.0, 105.0, 110.0, 120.0, 130.0, 140.0],
                reads: 0,
                stop_after,
                stop_tx,
                fail_height_at: None,
                fail_shutdown: false,
                lifecycle: Rc::default(),
            }
        }
    }

    impl TelemetryDevice for ScriptedDevice {
        fn pair(&mut self) -> DeviceResult<()> {
            Ok(())
        }
        fn height_cm(&mut self) -> DeviceResult<f64> {
            if self.fail_height_at == Some(self.reads) {
                return Err(DeviceError::Sensor {
                    sensor: "height",
                    reason: "range finder timeout".to_string(),
                });
            }
            let height = self.heights[self.reads.min(self.heights.len() - 1)];
            self.reads += 1;
            if self.reads > self.stop_after {
                self.stop_tx.send_replace(true);
            }
            Ok(height)
        }
        fn roll_deg(&mut self) -> DeviceResult<f64> {
            Ok(0.5)
        }
        fn pitch_deg(&mut self) -> DeviceResult<f64> {
            Ok(-0.5)
        }
        fn yaw_deg(&mut self) -> DeviceResult<f64> {
            Ok(90.0)
        }
        fn battery_pct(&mut self) -> DeviceResult<u8> {
            Ok(80)
        }
        fn accel_x(&mut self) -> DeviceResult<f64> {
            Ok(0.01)
        }
        fn temperature_c(&mut self) -> DeviceResult<f64> {
            Ok(28.0)
        }
        fn flow_velocity_x(&mut self) -> DeviceResult<f64> {
            Ok(3.0)
        }
        fn flow_velocity_y(&mut self) -> DeviceResult<f64> {
            Ok(4.0)
        }
        fn land(&mut self) -> DeviceResult<()> {
            self.lifecycle.borrow_mut().push("land");
            if self.fail_shutdown {
                return Err(DeviceError::Command {
                    command: "land",
                    reason: "link lost".to_string(),
                });
            }
            Ok(())
        }
        fn close(&mut self) -> DeviceResult<()> {
            self.lifecycle.borrow_mut().push("close");
            if self.fail_shutdown {
                return Err(DeviceError::Disconnected);
            }
            Ok(())
        }
    }

    fn fast_rate() -> SampleRate {
        SampleRate::new(1000.0).unwrap()
    }

    fn saved_count(out: &[u8]) -> usize {
        String::from_utf8_lossy(out).matches("Saved: ").count()
    }

    #[tokio::test]
    async fn test_stop_writes_rows_and_saves_once() {
        let (tx, rx) = watch::channel(false);
        let device = ScriptedDevice::new(tx, 3);
        let recorder = CsvRecorder::new(Vec::new(), "flight.csv").unwrap();
        let mut out = Vec::new();

        let summary = LoggingSession::new(device, recorder, fast_rate())
            .run(&mut out, rx)
            .await
            .unwrap();

        // initial height read counts as the first of `stop_after` reads
        assert_eq!(summary.samples, 3);

        let console = String::from_utf8(out).unwrap();
        assert!(console.starts_with("Logging started."));
        assert!(console.contains("Stop requested."));
        assert_eq!(console.matches("Saved: flight.csv").count(), 1);
        assert!(console.trim_end().ends_with("Saved: flight.csv"));
        assert!(console.contains("vxy=   5.0"));
    }

    #[tokio::test]
    async fn test_ground_and_dropout_rows_not_counted_as_flight() {
        let (tx, rx) = watch::channel(false);
        let mut device = ScriptedDevice::new(tx, 5);
        device.heights = vec![100.0, -100.0, 105.0, 999.9, 110.0, 0.0];
        let recorder = CsvRecorder::new(Vec::new(), "flight.csv").unwrap();
        let mut out = Vec::new();

        let summary = LoggingSession::new(device, recorder, fast_rate())
            .run(&mut out, rx)
            .await
            .unwrap();

        assert_eq!(summary.samples, 5);
        assert_eq!(summary.flight_samples, 2);
    }

    #[tokio::test]
    async fn test_shutdown_errors_suppressed() {
        let (tx, rx) = watch::channel(false);
        let mut device = ScriptedDevice::new(tx, 2);
        device.fail_shutdown = true;
        let lifecycle = Rc::clone(&device.lifecycle);
        let recorder = CsvRecorder::new(Vec::new(), "flight.csv").unwrap();
        let mut out = Vec::new();

        let result = LoggingSession::new(device, recorder, fast_rate())
            .run(&mut out, rx)
            .await;

        assert!(result.is_ok());
        assert_eq!(saved_count(&out), 1);
        assert_eq!(*lifecycle.borrow(), vec!["land", "close"]);
    }

    #[tokio::test]
    async fn test_sensor_failure_still_shuts_down() {
        let (tx, rx) = watch::channel(false);
        let mut device = ScriptedDevice::new(tx, 100);
        device.fail_height_at = Some(3);
        let recorder = CsvRecorder::new(Vec::new(), "flight.csv").unwrap();
        let mut out = Vec::new();

        let result = LoggingSession::new(device, recorder, fast_rate())
            .run(&mut out, rx)
            .await;

        assert!(matches!(
            result,
            Err(LoggerError::Device(DeviceError::Sensor { sensor: "height", .. }))
        ));
        let console = String::from_utf8(out).unwrap();
        assert!(!console.contains("Stop requested."));
        assert_eq!(console.matches("Saved: ").count(), 1);
    }

    #[tokio::test]
    async fn test_preset_stop_records_nothing() {
        let (tx, rx) = watch::channel(true);
        let device = ScriptedDevice::new(tx.clone(), 100);
        let recorder = CsvRecorder::new(Vec::new(), "flight.csv").unwrap();
        let mut out = Vec::new();

        let summary = LoggingSession::new(device, recorder, fast_rate())
            .run(&mut out, rx)
            .await
            .unwrap();

        assert_eq!(summary.samples, 0);
        assert_eq!(summary.achieved_rate_hz(), 0.0);
        assert_eq!(saved_count(&out), 1);
        drop(tx);
    }

    #[tokio::test]
    async fn test_rows_land_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.csv");

        let (tx, rx) = watch::channel(false);
        let device = ScriptedDevice::new(tx, 4);
        let recorder = CsvRecorder::create(&path).unwrap();
        let mut out = Vec::new();

        LoggingSession::new(device, recorder, fast_rate())
            .run(&mut out, rx)
            .await
            .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<TelemetrySample> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 4);
        assert!(rows.windows(2).all(|w| w[0].elapsed_s <= w[1].elapsed_s));
        assert!(rows.iter().all(|r| r.horizontal_speed_cm_s == 5.0));
        assert_eq!(rows[0].height_cm, 105.0);
    }

    #[test]
    fn test_status_line_format() {
        let sample = TelemetrySample {
            elapsed_s: 1.5,
            height_cm: 105.0,
            roll_deg: 1.0,
            pitch_deg: -2.0,
            yaw_deg: 30.0,
            battery_pct: 7,
            accel_x: 0.12,
            temperature_c: 31.0,
            horizontal_speed_cm_s: 5.0,
            vertical_speed_cm_s: 50.0,
        };
        assert_eq!(
            status_line(&sample),
            "t= 1.50s  h= 105.0cm  roll=   1.0  pitch=  -2.0  yaw=  30.0  batt=  7%  ax=  0.12  temp=31  vxy=   5.0  vz=  50.0"
        );
    }

    #[test]
    fn test_achieved_rate() {
        let summary = SessionSummary {
            samples: 11,
            flight_samples: 11,
            elapsed_s: 2.0,
        };
        assert_eq!(summary.achieved_rate_hz(), 5.0);
    }
}
