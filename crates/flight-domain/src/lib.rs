//! # Flight Telemetry - Domain Model
//!
//! Row model and schema for manual-flight telemetry logs. These types are the
//! single source of truth for both sides of the CSV file: the logger writes
//! [`TelemetrySample`] rows, the analyzer validates against
//! [`TelemetryColumn::ALL`] and classifies flights with [`Stability`].

#![forbid(unsafe_code)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Height reported by the range sensor when the drone sits on the ground.
pub const GROUND_SENTINEL_CM: f64 = -100.0;

/// Height reported by the range sensor when the reading is out of range.
pub const OUT_OF_RANGE_SENTINEL_CM: f64 = 999.9;

/// Default logger sampling rate.
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 10.0;

/// Centimeters per meter.
pub const CM_PER_M: f64 = 100.0;

// =============================================================================
// SCHEMA
// =============================================================================

/// Columns of a telemetry CSV file, in header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryColumn {
    ElapsedTime,
    Height,
    Roll,
    Pitch,
    Yaw,
    Battery,
    AccelX,
    Temperature,
    HorizontalSpeed,
    VerticalSpeed,
}

impl TelemetryColumn {
    /// All columns in the order they appear in the header row.
    pub const ALL: [Self; 10] = [
        Self::ElapsedTime,
        Self::Height,
        Self::Roll,
        Self::Pitch,
        Self::Yaw,
        Self::Battery,
        Self::AccelX,
        Self::Temperature,
        Self::HorizontalSpeed,
        Self::VerticalSpeed,
    ];

    /// Header name as written to the CSV file.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ElapsedTime => "t_s",
            Self::Height => "height_cm",
            Self::Roll => "roll_deg",
            Self::Pitch => "pitch_deg",
            Self::Yaw => "yaw_deg",
            Self::Battery => "batt_%",
            Self::AccelX => "accel_x",
            Self::Temperature => "temp_c",
            Self::HorizontalSpeed => "speed_cm_s",
            Self::VerticalSpeed => "vz_cm_s",
        }
    }
}

impl fmt::Display for TelemetryColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TelemetryColumn {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|column| column.as_str() == s)
            .ok_or_else(|| DomainError::UnknownColumn(s.to_string()))
    }
}

// =============================================================================
// ENTITY TYPES
// =============================================================================

/// One telemetry row. Field order matches [`TelemetryColumn::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Seconds since logging started, rounded to 2 decimal places
    #[serde(rename = "t_s")]
    pub elapsed_s: f64,
    pub height_cm: f64,
    pub roll_deg: f64,
    pub pitch_deg: f64,
    pub yaw_deg: f64,
    #[serde(rename = "batt_%")]
    pub battery_pct: u8,
    pub accel_x: f64,
    #[serde(rename = "temp_c")]
    pub temperature_c: f64,
    /// Norm of the two planar flow velocities
    #[serde(rename = "speed_cm_s")]
    pub horizontal_speed_cm_s: f64,
    /// Height delta over time delta since the previous sample
    #[serde(rename = "vz_cm_s")]
    pub vertical_speed_cm_s: f64,
}

impl TelemetrySample {
    /// Whether this row counts towards flight statistics.
    #[must_use]
    pub fn is_valid_flight_record(&self) -> bool {
        is_valid_flight_height(self.height_cm)
    }
}

/// A height is a flight height unless it is a sensor sentinel or not above
/// the ground. NaN is never a flight height.
#[must_use]
pub fn is_valid_flight_height(height_cm: f64) -> bool {
    #[allow(clippy::float_cmp)]
    let sentinel = height_cm == GROUND_SENTINEL_CM || height_cm == OUT_OF_RANGE_SENTINEL_CM;
    !sentinel && height_cm > 0.0
}

/// Convert centimeters (or cm/s) to meters (or m/s).
#[must_use]
pub fn cm_to_m(value_cm: f64) -> f64 {
    value_cm / CM_PER_M
}

// =============================================================================
// VALUE OBJECTS
// =============================================================================

/// Logger sampling rate, always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRate(f64);

impl SampleRate {
    pub fn new(hz: f64) -> Result<Self, DomainError> {
        if hz.is_finite() && hz > 0.0 {
            Ok(Self(hz))
        } else {
            Err(DomainError::InvalidSampleRate(hz))
        }
    }

    #[must_use]
    pub const fn hz(&self) -> f64 {
        self.0
    }

    /// Sleep between iterations. Polling latency is not subtracted.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.0)
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self(DEFAULT_SAMPLE_RATE_HZ)
    }
}

// =============================================================================
// ENUMS
// =============================================================================

/// Flight stability derived from the variance of yaw readings (deg²).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stability {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Stability {
    /// Lower bounds inclusive, upper bounds exclusive.
    #[must_use]
    pub fn from_yaw_variance(variance_deg2: f64) -> Self {
        if variance_deg2 < 10.0 {
            Self::Excellent
        } else if variance_deg2 < 25.0 {
            Self::Good
        } else if variance_deg2 < 50.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "EXCELLENT - Very stable flight",
            Self::Good => "GOOD - Moderately stable flight",
            Self::Fair => "FAIR - Some instability detected",
            Self::Poor => "POOR - Significant instability",
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid sample rate: {0} Hz (must be finite and positive)")]
    InvalidSampleRate(f64),

    #[error("Unknown telemetry column: '{0}'")]
    UnknownColumn(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::Fake;

    fn sample(height_cm: f64) -> TelemetrySample {
        TelemetrySample {
            elapsed_s: 0.0,
            height_cm,
            roll_deg: 0.0,
            pitch_deg: 0.0,
            yaw_deg: 0.0,
            battery_pct: 90,
            accel_x: 0.0,
            temperature_c: 25.0,
            horizontal_speed_cm_s: 0.0,
            vertical_speed_cm_s: 0.0,
        }
    }

    #[test]
    fn test_sentinels_and_ground_are_invalid() {
        assert!(!is_valid_flight_height(GROUND_SENTINEL_CM));
        assert!(!is_valid_flight_height(OUT_OF_RANGE_SENTINEL_CM));
        assert!(!is_valid_flight_height(0.0));
        assert!(!is_valid_flight_height(-3.5));
        assert!(!is_valid_flight_height(f64::NAN));
    }

    #[test]
    fn test_positive_heights_are_valid() {
        assert!(is_valid_flight_height(0.1));
        assert!(is_valid_flight_height(999.8));
        assert!(is_valid_flight_height(1000.0));

        for _ in 0..100 {
            let height: f64 = (0.01..999.0).fake();
            assert!(sample(height).is_valid_flight_record(), "height {height}");
        }
    }

    #[test]
    fn test_stability_boundaries() {
        assert_eq!(Stability::from_yaw_variance(0.0), Stability::Excellent);
        assert_eq!(Stability::from_yaw_variance(9.99), Stability::Excellent);
        assert_eq!(Stability::from_yaw_variance(10.0), Stability::Good);
        assert_eq!(Stability::from_yaw_variance(24.99), Stability::Good);
        assert_eq!(Stability::from_yaw_variance(25.0), Stability::Fair);
        assert_eq!(Stability::from_yaw_variance(49.99), Stability::Fair);
        assert_eq!(Stability::from_yaw_variance(50.0), Stability::Poor);
        assert_eq!(Stability::from_yaw_variance(1e6), Stability::Poor);
    }

    #[test]
    fn test_stability_label() {
        assert_eq!(
            Stability::Fair.to_string(),
            "FAIR - Some instability detected"
        );
    }

    #[test]
    fn test_column_round_trip_by_name() {
        for column in TelemetryColumn::ALL {
            assert_eq!(column.as_str().parse::<TelemetryColumn>().unwrap(), column);
        }
        assert!(matches!(
            "altitude".parse::<TelemetryColumn>(),
            Err(DomainError::UnknownColumn(name)) if name == "altitude"
        ));
    }

    #[test]
    fn test_csv_header_matches_schema() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(sample(120.0)).unwrap();
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap();

        let expected: Vec<&str> = TelemetryColumn::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(header, expected.join(","));
    }

    #[test]
    fn test_sample_rate() {
        let rate = SampleRate::default();
        assert_eq!(rate.interval(), Duration::from_millis(100));
        assert!(SampleRate::new(0.0).is_err());
        assert!(SampleRate::new(f64::INFINITY).is_err());
        assert!(matches!(
            SampleRate::new(-1.0),
            Err(DomainError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn test_cm_to_m() {
        assert_eq!(cm_to_m(150.0), 1.5);
    }
}
