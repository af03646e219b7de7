//! Derived quantities computed between consecutive samples.

use crate::device::SensorReadings;
use flight_domain::TelemetrySample;

/// Smallest time delta used for vertical speed.
pub const MIN_TIME_DELTA_S: f64 = 1e-6;

/// Turns raw readings into telemetry rows, tracking the previous height and
/// time for the vertical speed estimate.
#[derive(Debug, Clone, Copy)]
pub struct SampleDeriver {
    prev_height_cm: f64,
    prev_elapsed_s: f64,
}

impl SampleDeriver {
    /// Start from the height read at session start, at elapsed time zero.
    pub const fn new(initial_height_cm: f64) -> Self {
        Self {
            prev_height_cm: initial_height_cm,
            prev_elapsed_s: 0.0,
        }
    }

    /// Build the row for readings taken `elapsed_s` seconds into the session.
    pub fn derive(&mut self, elapsed_s: f64, readings: &SensorReadings) -> TelemetrySample {
        let dt = (elapsed_s - self.prev_elapsed_s).max(MIN_TIME_DELTA_S);
        let vertical_speed_cm_s = (readings.height_cm - self.prev_height_cm) / dt;
        let horizontal_speed_cm_s = readings.flow_velocity_x.hypot(readings.flow_velocity_y);

        self.prev_height_cm = readings.height_cm;
        self.prev_elapsed_s = elapsed_s;

        TelemetrySample {
            elapsed_s: round_to_centiseconds(elapsed_s),
            height_cm: readings.height_cm,
            roll_deg: readings.roll_deg,
            pitch_deg: readings.pitch_deg,
            yaw_deg: readings.yaw_deg,
            battery_pct: readings.battery_pct,
            accel_x: readings.accel_x,
            temperature_c: readings.temperature_c,
            horizontal_speed_cm_s,
            vertical_speed_cm_s,
        }
    }
}

fn round_to_centiseconds(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(height_cm: f64, vx: f64, vy: f64) -> SensorReadings {
        SensorReadings {
            height_cm,
            roll_deg: 1.0,
            pitch_deg: -2.0,
            yaw_deg: 45.0,
            battery_pct: 87,
            accel_x: 0.12,
            temperature_c: 31.0,
            flow_velocity_x: vx,
            flow_velocity_y: vy,
        }
    }

    #[test]
    fn test_vertical_speed_between_samples() {
        let mut deriver = SampleDeriver::new(100.0);

        let first = deriver.derive(0.0, &readings(100.0, 0.0, 0.0));
        assert_eq!(first.vertical_speed_cm_s, 0.0);

        let second = deriver.derive(0.1, &readings(105.0, 0.0, 0.0));
        assert!((second.vertical_speed_cm_s - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_horizontal_speed_is_flow_norm() {
        let mut deriver = SampleDeriver::new(50.0);
        let sample = deriver.derive(0.5, &readings(50.0, 3.0, 4.0));
        assert_eq!(sample.horizontal_speed_cm_s, 5.0);
    }

    #[test]
    fn test_time_delta_floored() {
        let mut deriver = SampleDeriver::new(0.0);
        let sample = deriver.derive(0.0, &readings(1.0, 0.0, 0.0));
        assert!(sample.vertical_speed_cm_s.is_finite());
        assert!((sample.vertical_speed_cm_s - 1.0 / MIN_TIME_DELTA_S).abs() < 1e-3);
    }

    #[test]
    fn test_elapsed_rounded_but_delta_unrounded() {
        let mut deriver = SampleDeriver::new(100.0);
        let first = deriver.derive(0.104, &readings(100.0, 0.0, 0.0));
        assert_eq!(first.elapsed_s, 0.1);

        let second = deriver.derive(0.204, &readings(110.0, 0.0, 0.0));
        assert_eq!(second.elapsed_s, 0.2);
        assert!((second.vertical_speed_cm_s - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_readings_copied_into_sample() {
        let mut deriver = SampleDeriver::new(80.0);
        let sample = deriver.derive(1.0, &readings(80.0, 0.0, 0.0));
        assert_eq!(sample.battery_pct, 87);
        assert_eq!(sample.yaw_deg, 45.0);
        assert_eq!(sample.temperature_c, 31.0);
    }
}
