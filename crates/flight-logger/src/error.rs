//! Logger error types.

use thiserror::Error;

/// Errors raised by a [`TelemetryDevice`](crate::device::TelemetryDevice).
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Operation issued before `pair()`
    #[error("Device is not paired")]
    NotPaired,

    /// Connection already released
    #[error("Device connection is closed")]
    Disconnected,

    /// A single sensor read failed
    #[error("Sensor '{sensor}' read failed: {reason}")]
    Sensor {
        sensor: &'static str,
        reason: String,
    },

    /// Lifecycle command (pair/land/close) rejected by the device
    #[error("Device command '{command}' failed: {reason}")]
    Command {
        command: &'static str,
        reason: String,
    },
}

/// Logger errors.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// Device error
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] flight_domain::DomainError),
}

/// Result type for logger operations.
pub type Result<T> = std::result::Result<T, LoggerError>;
