//! Flight report assembly and text rendering.

use crate::engine::AnalyticsEngine;
use crate::error::{AnalyticsError, Result};
use crate::queries::{ChannelStats, DataQuality, FlightStatistics};
use flight_domain::{Stability, cm_to_m};
use std::fmt::Write;
use tracing::{info, warn};

const RULE_WIDTH: usize = 70;

/// Battery figures derived from the min/max convention: the fullest reading
/// is the start of the flight, the emptiest the end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryAnalysis {
    pub average_pct: f64,
    pub starting_pct: f64,
    pub ending_pct: f64,
    pub consumed_pct: f64,
    /// %/s, present when the flight has a positive duration
    pub drain_rate_pct_s: Option<f64>,
    /// Seconds left at the drain rate; zero when nothing drained
    pub est_remaining_s: Option<f64>,
}

impl BatteryAnalysis {
    #[must_use]
    pub fn new(battery: &ChannelStats, duration_s: f64) -> Self {
        let consumed_pct = battery.max - battery.min;
        let drain_rate_pct_s = (duration_s > 0.0).then(|| consumed_pct / duration_s);
        let est_remaining_s = drain_rate_pct_s.map(|rate| {
            if rate > 0.0 {
                battery.min / rate
            } else {
                0.0
            }
        });

        Self {
            average_pct: battery.mean,
            starting_pct: battery.max,
            ending_pct: battery.min,
            consumed_pct,
            drain_rate_pct_s,
            est_remaining_s,
        }
    }
}

/// Complete analysis of one telemetry log.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightReport {
    pub source: String,
    pub quality: DataQuality,
    /// Not computed when the dataset has no records
    pub duration_s: Option<f64>,
    /// Not computed when there are no valid flight records
    pub statistics: Option<FlightStatistics>,
}

impl FlightReport {
    #[must_use]
    pub fn battery(&self) -> Option<BatteryAnalysis> {
        let duration_s = self.duration_s.unwrap_or(0.0);
        self.statistics
            .as_ref()
            .map(|stats| BatteryAnalysis::new(&stats.battery, duration_s))
    }

    #[must_use]
    pub fn stability(&self) -> Option<Stability> {
        self.statistics.as_ref().map(FlightStatistics::stability)
    }

    /// Fail when the report carries no flight statistics.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.quality.total_records == 0 {
            return Err(AnalyticsError::EmptyDataset {
                source_name: self.source.clone(),
            });
        }
        if self.statistics.is_none() {
            return Err(AnalyticsError::NoValidRecords {
                source_name: self.source.clone(),
                total: self.quality.total_records,
            });
        }
        Ok(())
    }

    /// Render the fixed-format text report.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> std::fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        let quality = &self.quality;

        writeln!(out, "\n{rule}\nDATA QUALITY ANALYSIS\n{rule}")?;
        writeln!(out, "\nTotal Records: {}", quality.total_records)?;
        writeln!(out, "Valid Flight Records: {}", quality.valid_records)?;
        writeln!(out, "Invalid/Ground Records: {}", quality.invalid_records())?;
        match quality.valid_pct() {
            Some(pct) => writeln!(out, "Data Quality: {pct:.1}%")?,
            None => writeln!(out, "Data Quality: N/A")?,
        }

        let Some(stats) = &self.statistics else {
            return Ok(());
        };
        let duration_s = self.duration_s.unwrap_or(0.0);

        writeln!(out, "\nFlight Duration: {duration_s:.2} seconds")?;
        writeln!(out, "\n{rule}\nDRONE FLIGHT STATISTICS\n{rule}")?;

        let alt = &stats.altitude;
        writeln!(out, "\nALTITUDE STATISTICS:")?;
        writeln!(
            out,
            "  Average Altitude:    {:.2} cm ({:.2} m)",
            alt.mean,
            cm_to_m(alt.mean)
        )?;
        writeln!(out, "  Minimum Altitude:    {:.2} cm", alt.min)?;
        writeln!(
            out,
            "  Maximum Altitude:    {:.2} cm ({:.2} m)",
            alt.max,
            cm_to_m(alt.max)
        )?;
        writeln!(out, "  Altitude Range:      {:.2} cm", alt.range())?;

        let speed = &stats.speed;
        writeln!(out, "\nSPEED STATISTICS:")?;
        writeln!(
            out,
            "  Average Speed:       {:.2} cm/s ({:.2} m/s)",
            speed.mean,
            cm_to_m(speed.mean)
        )?;
        writeln!(out, "  Minimum Speed:       {:.2} cm/s", speed.min)?;
        writeln!(
            out,
            "  Maximum Speed:       {:.2} cm/s ({:.2} m/s)",
            speed.max,
            cm_to_m(speed.max)
        )?;
        writeln!(out, "  Speed Range:         {:.2} cm/s", speed.range())?;

        let vz = &stats.vertical_velocity;
        writeln!(out, "\nVERTICAL VELOCITY:")?;
        writeln!(out, "  Average V-Speed:     {:.2} cm/s", vz.mean)?;
        writeln!(out, "  Max Climb Rate:      {:.2} cm/s", vz.max_climb_rate)?;
        writeln!(out, "  Max Descent Rate:    {:.2} cm/s", vz.max_descent_rate)?;

        let orientation = &stats.orientation;
        writeln!(out, "\nORIENTATION STATISTICS:")?;
        writeln!(out, "  Roll - Avg:          {:.2}°", orientation.mean_roll_deg)?;
        writeln!(out, "  Pitch - Avg:         {:.2}°", orientation.mean_pitch_deg)?;
        writeln!(out, "  Yaw - Avg:           {:.2}°", orientation.mean_yaw_deg)?;

        let accel = &stats.accel_x;
        writeln!(out, "\nACCELERATION STATISTICS:")?;
        writeln!(out, "  Average Accel-X:     {:.2}", accel.mean)?;
        writeln!(out, "  Minimum Accel-X:     {:.2}", accel.min)?;
        writeln!(out, "  Maximum Accel-X:     {:.2}", accel.max)?;

        let battery = BatteryAnalysis::new(&stats.battery, duration_s);
        writeln!(out, "\nBATTERY STATISTICS:")?;
        writeln!(out, "  Average Battery:     {:.2}%", battery.average_pct)?;
        writeln!(out, "  Starting Battery:    {:.2}%", battery.starting_pct)?;
        writeln!(out, "  Ending Battery:      {:.2}%", battery.ending_pct)?;
        writeln!(out, "  Battery Consumed:    {:.2}%", battery.consumed_pct)?;
        if let (Some(rate), Some(remaining)) = (battery.drain_rate_pct_s, battery.est_remaining_s) {
            writeln!(out, "  Drain Rate:          {rate:.2}%/second")?;
            writeln!(out, "  Est. Remaining Time: {remaining:.2} seconds")?;
        }

        let temp = &stats.temperature;
        writeln!(out, "\nTEMPERATURE STATISTICS:")?;
        writeln!(out, "  Average Temp:        {:.2}°C", temp.mean)?;
        writeln!(out, "  Minimum Temp:        {:.2}°C", temp.min)?;
        writeln!(out, "  Maximum Temp:        {:.2}°C", temp.max)?;
        writeln!(out, "  Temp Range:          {:.2}°C", temp.range())?;

        writeln!(out, "\nFLIGHT STABILITY ANALYSIS:")?;
        writeln!(out, "  Yaw Variance:        {:.2} deg²", orientation.yaw_variance)?;
        writeln!(out, "  Flight Stability:    {}", stats.stability())?;

        Ok(())
    }
}

impl AnalyticsEngine {
    /// Build the report for the loaded dataset. Duration and statistics are
    /// skipped when there is nothing to compute them over.
    pub fn analyze(&self) -> Result<FlightReport> {
        let source = self.require_dataset()?.to_string();
        let quality = self.data_quality()?;

        info!(
            total = quality.total_records,
            valid = quality.valid_records,
            invalid = quality.invalid_records(),
            "Data quality assessed"
        );

        if quality.total_records == 0 {
            return Ok(FlightReport {
                source,
                quality,
                duration_s: None,
                statistics: None,
            });
        }

        if quality.valid_records == 0 {
            return Ok(FlightReport {
                source,
                quality,
                duration_s: Some(0.0),
                statistics: None,
            });
        }

        let duration_s = self.flight_duration()?;
        let statistics = self.flight_statistics()?;

        if let Some(trend) = self.battery_trend()? {
            if !trend.matches_min_max(&statistics.battery) {
                warn!(
                    first_pct = trend.first_pct,
                    last_pct = trend.last_pct,
                    max_pct = statistics.battery.max,
                    min_pct = statistics.battery.min,
                    "Battery is not monotonic over the flight; starting/ending figures use max/min"
                );
            }
        }

        Ok(FlightReport {
            source,
            quality,
            duration_s: Some(duration_s),
            statistics: Some(statistics),
        })
    }
}
