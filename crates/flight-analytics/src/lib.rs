//! # Flight Analytics
//!
//! Batch analysis of flight telemetry logs. The CSV is loaded into an
//! in-process DuckDB database and every statistic is an aggregate query over
//! the valid flight records.
//!
//! ## Features
//!
//! - Local files and S3-compatible object storage
//! - Schema and numeric validation on load
//! - Data quality counts and flight duration
//! - Altitude, speed, vertical velocity, orientation, battery and temperature statistics
//! - Yaw-variance stability rating

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod queries;
pub mod reports;
pub mod source;

pub use config::{AnalyzerConfig, S3Config};
pub use engine::AnalyticsEngine;
pub use error::{AnalyticsError, Result};
pub use queries::{DataQuality, FlightStatistics, VALID_FLIGHT_PREDICATE};
pub use reports::{BatteryAnalysis, FlightReport};
pub use source::DataSource;
