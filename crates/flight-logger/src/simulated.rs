//! Simulated drone for running the logger without hardware.
//!
//! Produces a ground / climb / hover / descend height profile with Gaussian
//! sensor noise, a monotonically draining battery and occasional out-of-range
//! height readings, so logs exercise the analyzer's ground filter.

use crate::device::{DeviceResult, TelemetryDevice};
use crate::error::DeviceError;
use flight_domain::{GROUND_SENTINEL_CM, OUT_OF_RANGE_SENTINEL_CM};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Shape of the simulated flight, in polling ticks.
#[derive(Debug, Clone, Copy)]
pub struct FlightProfile {
    /// Nominal seconds between ticks
    pub tick_s: f64,
    /// Ticks spent on the ground before takeoff
    pub ground_ticks: u64,
    pub climb_rate_cm_s: f64,
    pub hover_height_cm: f64,
    /// Ticks spent hovering before the automatic descent
    pub hover_ticks: u64,
    pub descent_rate_cm_s: f64,
    /// Probability of an out-of-range height while airborne
    pub dropout_probability: f64,
}

impl Default for FlightProfile {
    fn default() -> Self {
        Self {
            tick_s: 0.1,
            ground_ticks: 20,
            climb_rate_cm_s: 40.0,
            hover_height_cm: 120.0,
            hover_ticks: 600,
            descent_rate_cm_s: 30.0,
            dropout_probability: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Unpaired,
    Paired,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Grounded,
    Climbing,
    Hovering { since_tick: u64 },
    Descending,
    Landed,
}

/// Seeded drone simulator implementing [`TelemetryDevice`].
#[derive(Debug)]
pub struct SimulatedDrone {
    profile: FlightProfile,
    link: Link,
    phase: Phase,
    tick: u64,
    height_cm: f64,
    battery_pct: f64,
    temperature_c: f64,
    yaw_deg: f64,
    rng: StdRng,
}

impl SimulatedDrone {
    /// Create a simulator; the same seed replays the same flight.
    pub fn new(profile: FlightProfile, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self {
            profile,
            link: Link::Unpaired,
            phase: Phase::Grounded,
            tick: 0,
            height_cm: 0.0,
            battery_pct: 100.0,
            temperature_c: 24.0,
            yaw_deg: 0.0,
            rng,
        }
    }

    /// Whether `land()` has been accepted.
    const fn is_landing(&self) -> bool {
        matches!(self.phase, Phase::Descending | Phase::Landed)
    }

    fn ensure_connected(&self) -> DeviceResult<()> {
        match self.link {
            Link::Paired => Ok(()),
            Link::Unpaired => Err(DeviceError::NotPaired),
            Link::Closed => Err(DeviceError::Disconnected),
        }
    }

    fn noise(&mut self, scale: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        z * scale
    }

    fn airborne(&self) -> bool {
        matches!(
            self.phase,
            Phase::Climbing | Phase::Hovering { .. } | Phase::Descending
        )
    }

    /// Advance the flight by one polling tick.
    fn step(&mut self) {
        self.tick += 1;
        let dt = self.profile.tick_s;

        self.phase = match self.phase {
            Phase::Grounded if self.tick > self.profile.ground_ticks => Phase::Climbing,
            Phase::Climbing if self.height_cm >= self.profile.hover_height_cm => Phase::Hovering {
                since_tick: self.tick,
            },
            Phase::Hovering { since_tick }
                if self.tick - since_tick >= self.profile.hover_ticks =>
            {
                Phase::Descending
            }
            Phase::Descending if self.height_cm <= 0.0 => Phase::Landed,
            phase => phase,
        };

        match self.phase {
            Phase::Climbing => self.height_cm += self.profile.climb_rate_cm_s * dt,
            Phase::Hovering { .. } => {
                let drift = self.noise(1.5);
                self.height_cm = (self.height_cm + drift).max(1.0);
            }
            Phase::Descending => {
                self.height_cm = (self.height_cm - self.profile.descent_rate_cm_s * dt).max(0.0);
            }
            Phase::Grounded | Phase::Landed => self.height_cm = 0.0,
        }

        let drain = if self.airborne() { 0.02 } else { 0.002 };
        self.battery_pct = (self.battery_pct - drain * (1.0 + self.noise(0.1)).max(0.0)).max(0.0);
        self.temperature_c += 0.002 + self.noise(0.01);
        self.yaw_deg += self.noise(0.8);
    }
}

impl TelemetryDevice for SimulatedDrone {
    fn pair(&mut self) -> DeviceResult<()> {
        match self.link {
            Link::Closed => Err(DeviceError::Disconnected),
            _ => {
                self.link = Link::Paired;
                Ok(())
            }
        }
    }

    fn height_cm(&mut self) -> DeviceResult<f64> {
        self.ensure_connected()?;
        self.step();

        if !self.airborne() {
            return Ok(GROUND_SENTINEL_CM);
        }
        if self.rng.gen_bool(self.profile.dropout_probability) {
            return Ok(OUT_OF_RANGE_SENTINEL_CM);
        }
        Ok(self.height_cm)
    }

    fn roll_deg(&mut self) -> DeviceResult<f64> {
        self.ensure_connected()?;
        Ok(if self.airborne() { self.noise(3.0) } else { 0.0 })
    }

    fn pitch_deg(&mut self) -> DeviceResult<f64> {
        self.ensure_connected()?;
        Ok(if self.airborne() { self.noise(2.0) } else { 0.0 })
    }

    fn yaw_deg(&mut self) -> DeviceResult<f64> {
        self.ensure_connected()?;
        Ok(self.yaw_deg)
    }

    fn battery_pct(&mut self) -> DeviceResult<u8> {
        self.ensure_connected()?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = self.battery_pct.floor().clamp(0.0, 100.0) as u8;
        Ok(pct)
    }

    fn accel_x(&mut self) -> DeviceResult<f64> {
        self.ensure_connected()?;
        Ok(self.noise(0.05))
    }

    fn temperature_c(&mut self) -> DeviceResult<f64> {
        self.ensure_connected()?;
        Ok((self.temperature_c * 10.0).round() / 10.0)
    }

    fn flow_velocity_x(&mut self) -> DeviceResult<f64> {
        self.ensure_connected()?;
        Ok(if self.airborne() { self.noise(15.0) } else { 0.0 })
    }

    fn flow_velocity_y(&mut self) -> DeviceResult<f64> {
        self.ensure_connected()?;
        Ok(if self.airborne() { self.noise(10.0) } else { 0.0 })
    }

    fn land(&mut self) -> DeviceResult<()> {
        self.ensure_connected()?;
        if !self.is_landing() {
            self.phase = if self.height_cm > 0.0 {
                Phase::Descending
            } else {
                Phase::Landed
            };
        }
        Ok(())
    }

    fn close(&mut self) -> DeviceResult<()> {
        self.ensure_connected()?;
        self.link = Link::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flight_domain::is_valid_flight_height;

    fn paired(seed: u64) -> SimulatedDrone {
        let mut drone = SimulatedDrone::new(FlightProfile::default(), Some(seed));
        drone.pair().unwrap();
        drone
    }

    #[test]
    fn test_reads_require_pairing() {
        let mut drone = SimulatedDrone::new(FlightProfile::default(), Some(1));
        assert!(matches!(drone.height_cm(), Err(DeviceError::NotPaired)));
    }

    #[test]
    fn test_grounded_reports_sentinel() {
        let mut drone = paired(7);
        let first = drone.read_sensors().unwrap();
        assert_eq!(first.height_cm, GROUND_SENTINEL_CM);
        assert_eq!(first.flow_velocity_x, 0.0);
    }

    #[test]
    fn test_takes_off_after_ground_ticks() {
        let profile = FlightProfile {
            dropout_probability: 0.0,
            ..FlightProfile::default()
        };
        let mut drone = SimulatedDrone::new(profile, Some(3));
        drone.pair().unwrap();

        let heights: Vec<f64> = (0..60)
            .map(|_| drone.read_sensors().unwrap().height_cm)
            .collect();
        assert!(heights[..20].iter().all(|h| *h == GROUND_SENTINEL_CM));
        assert!(heights[25..].iter().all(|h| is_valid_flight_height(*h)));
    }

    #[test]
    fn test_battery_never_increases() {
        let mut drone = paired(11);
        let mut last = u8::MAX;
        for _ in 0..500 {
            let battery = drone.read_sensors().unwrap().battery_pct;
            assert!(battery <= last);
            last = battery;
        }
        assert!(last < 100);
    }

    #[test]
    fn test_same_seed_same_flight() {
        let mut a = paired(42);
        let mut b = paired(42);
        for _ in 0..50 {
            assert_eq!(a.read_sensors().unwrap(), b.read_sensors().unwrap());
        }
    }

    #[test]
    fn test_land_then_close() {
        let mut drone = paired(5);
        for _ in 0..40 {
            drone.read_sensors().unwrap();
        }
        drone.land().unwrap();
        assert!(drone.is_landing());

        drone.close().unwrap();
        assert!(matches!(drone.read_sensors(), Err(DeviceError::Disconnected)));
        assert!(matches!(drone.close(), Err(DeviceError::Disconnected)));
    }

    #[test]
    fn test_land_on_ground_settles_landed() {
        let mut drone = paired(9);
        drone.land().unwrap();
        assert_eq!(drone.phase, Phase::Landed);

        drone.land().unwrap();
        assert_eq!(drone.phase, Phase::Landed);
        assert_eq!(drone.height_cm().unwrap(), GROUND_SENTINEL_CM);
    }
}
