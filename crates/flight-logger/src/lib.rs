//! # Flight Logger
//!
//! Fixed-rate telemetry logger for manually flown drones.
//!
//! ## Features
//!
//! - Device-agnostic sensor polling through [`TelemetryDevice`]
//! - Vertical and horizontal speed derived between samples
//! - One flushed CSV row per sample
//! - Cancellable session with best-effort land/close on shutdown
//! - Seeded simulated drone for running without hardware

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod device;
pub mod error;
pub mod kinematics;
pub mod recorder;
pub mod session;
pub mod shutdown;
pub mod simulated;

pub use device::{SensorReadings, TelemetryDevice};
pub use error::{DeviceError, LoggerError, Result};
pub use kinematics::SampleDeriver;
pub use recorder::CsvRecorder;
pub use session::{LoggingSession, SessionSummary};
pub use shutdown::ShutdownSignal;
pub use simulated::{FlightProfile, SimulatedDrone};
