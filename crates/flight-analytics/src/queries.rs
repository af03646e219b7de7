//! Aggregate queries over the loaded telemetry table.
//!
//! Every statistic is computed over valid flight records only (see
//! [`VALID_FLIGHT_PREDICATE`]). Yaw is the only channel with a variance, and
//! it is the population variance; no channel gets a standard deviation.

use crate::engine::{AnalyticsEngine, TELEMETRY_TABLE};
use crate::error::{AnalyticsError, Result};
use flight_domain::Stability;
use tracing::debug;

/// SQL form of `flight_domain::is_valid_flight_height`.
pub const VALID_FLIGHT_PREDICATE: &str = r#""height_cm" <> -100.0 AND "height_cm" <> 999.9 AND "height_cm" > 0 AND NOT isnan("height_cm")"#;

/// Record counts before and after the validity filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataQuality {
    pub total_records: u64,
    pub valid_records: u64,
}

impl DataQuality {
    pub const fn invalid_records(&self) -> u64 {
        self.total_records - self.valid_records
    }

    /// Share of valid records in percent; `None` without records.
    #[must_use]
    pub fn valid_pct(&self) -> Option<f64> {
        if self.total_records == 0 {
            None
        } else {
            #[allow(clippy::cast_precision_loss)]
            let pct = self.valid_records as f64 / self.total_records as f64 * 100.0;
            Some(pct)
        }
    }
}

/// Mean, min and max of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl ChannelStats {
    #[must_use]
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Vertical speed summary. Climb is the largest positive rate, descent the
/// most negative one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalVelocityStats {
    pub mean: f64,
    pub max_climb_rate: f64,
    pub max_descent_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationStats {
    pub mean_roll_deg: f64,
    pub mean_pitch_deg: f64,
    pub mean_yaw_deg: f64,
    /// Population variance of yaw, deg²
    pub yaw_variance: f64,
}

/// Aggregates over valid flight records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightStatistics {
    /// cm
    pub altitude: ChannelStats,
    /// cm/s
    pub speed: ChannelStats,
    pub vertical_velocity: VerticalVelocityStats,
    pub orientation: OrientationStats,
    pub accel_x: ChannelStats,
    /// percent
    pub battery: ChannelStats,
    pub temperature: ChannelStats,
}

impl FlightStatistics {
    #[must_use]
    pub fn stability(&self) -> Stability {
        Stability::from_yaw_variance(self.orientation.yaw_variance)
    }
}

/// Battery at the first and last valid sample, by elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryTrend {
    pub first_pct: f64,
    pub last_pct: f64,
}

impl BatteryTrend {
    /// Whether first/last agree with the max = start, min = end convention.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn matches_min_max(&self, battery: &ChannelStats) -> bool {
        self.first_pct == battery.max && self.last_pct == battery.min
    }
}

/// Aggregate names in `SELECT` order; also used for NULL diagnostics.
const STATISTIC_COLUMNS: [(&str, &str); 22] = [
    ("AVG", "height_cm"),
    ("MIN", "height_cm"),
    ("MAX", "height_cm"),
    ("AVG", "speed_cm_s"),
    ("MIN", "speed_cm_s"),
    ("MAX", "speed_cm_s"),
    ("AVG", "vz_cm_s"),
    ("MAX", "vz_cm_s"),
    ("MIN", "vz_cm_s"),
    ("AVG", "roll_deg"),
    ("AVG", "pitch_deg"),
    ("AVG", "yaw_deg"),
    ("VAR_POP", "yaw_deg"),
    ("AVG", "accel_x"),
    ("MIN", "accel_x"),
    ("MAX", "accel_x"),
    ("AVG", "batt_%"),
    ("MIN", "batt_%"),
    ("MAX", "batt_%"),
    ("AVG", "temp_c"),
    ("MIN", "temp_c"),
    ("MAX", "temp_c"),
];

impl AnalyticsEngine {
    /// Total and valid record counts.
    pub fn data_quality(&self) -> Result<DataQuality> {
        self.require_dataset()?;
        let (total, valid): (i64, i64) = self.conn.query_row(
            &format!(
                "SELECT COUNT(*), COUNT(*) FILTER (WHERE {VALID_FLIGHT_PREDICATE}) FROM {TELEMETRY_TABLE}"
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(DataQuality {
            total_records: u64::try_from(total).unwrap_or_default(),
            valid_records: u64::try_from(valid).unwrap_or_default(),
        })
    }

    /// Span of elapsed time over valid records; zero when there are none.
    pub fn flight_duration(&self) -> Result<f64> {
        self.require_dataset()?;
        let duration: Option<f64> = self.conn.query_row(
            &format!(
                r#"SELECT MAX("t_s") - MIN("t_s") FROM {TELEMETRY_TABLE} WHERE {VALID_FLIGHT_PREDICATE}"#
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(duration.unwrap_or(0.0))
    }

    /// All channel aggregates in one pass over valid records.
    pub fn flight_statistics(&self) -> Result<FlightStatistics> {
        self.require_dataset()?;

        let select = STATISTIC_COLUMNS
            .iter()
            .map(|(func, column)| format!(r#"{func}("{column}")"#))
            .collect::<Vec<_>>()
            .join(", ");
        let query =
            format!("SELECT {select} FROM {TELEMETRY_TABLE} WHERE {VALID_FLIGHT_PREDICATE}");

        let values: Vec<Option<f64>> = self.conn.query_row(&query, [], |row| {
            (0..STATISTIC_COLUMNS.len())
                .map(|idx| row.get(idx))
                .collect()
        })?;

        let value = |idx: usize| -> Result<f64> {
            values[idx].ok_or(AnalyticsError::NullAggregate {
                column: STATISTIC_COLUMNS[idx].1,
            })
        };
        let channel = |first: usize| -> Result<ChannelStats> {
            Ok(ChannelStats {
                mean: value(first)?,
                min: value(first + 1)?,
                max: value(first + 2)?,
            })
        };

        let stats = FlightStatistics {
            altitude: channel(0)?,
            speed: channel(3)?,
            vertical_velocity: VerticalVelocityStats {
                mean: value(6)?,
                max_climb_rate: value(7)?,
                max_descent_rate: value(8)?,
            },
            orientation: OrientationStats {
                mean_roll_deg: value(9)?,
                mean_pitch_deg: value(10)?,
                mean_yaw_deg: value(11)?,
                yaw_variance: value(12)?,
            },
            accel_x: channel(13)?,
            battery: channel(16)?,
            temperature: channel(19)?,
        };

        debug!(
            yaw_variance = stats.orientation.yaw_variance,
            mean_altitude_cm = stats.altitude.mean,
            "Flight statistics computed"
        );
        Ok(stats)
    }

    /// Battery at the earliest and latest valid sample.
    pub fn battery_trend(&self) -> Result<Option<BatteryTrend>> {
        self.require_dataset()?;
        let (first, last): (Option<f64>, Option<f64>) = self.conn.query_row(
            &format!(
                r#"SELECT arg_min("batt_%", "t_s"), arg_max("batt_%", "t_s") FROM {TELEMETRY_TABLE} WHERE {VALID_FLIGHT_PREDICATE}"#
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(first
            .zip(last)
            .map(|(first_pct, last_pct)| BatteryTrend {
                first_pct,
                last_pct,
            }))
    }
}
