//! Device abstraction polled by the logger.
//!
//! Any drone exposing these nine sensor reads plus the pair/land/close
//! lifecycle can be logged. Reads are synchronous with no timeout.

use crate::error::DeviceError;

/// Result of a single device call.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Raw sensor values from one polling pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReadings {
    pub height_cm: f64,
    pub roll_deg: f64,
    pub pitch_deg: f64,
    pub yaw_deg: f64,
    pub battery_pct: u8,
    pub accel_x: f64,
    pub temperature_c: f64,
    /// +X forward/back
    pub flow_velocity_x: f64,
    /// +Y left/right
    pub flow_velocity_y: f64,
}

/// Sensor and lifecycle surface of a programmable drone.
pub trait TelemetryDevice {
    /// Connect to the drone.
    fn pair(&mut self) -> DeviceResult<()>;

    fn height_cm(&mut self) -> DeviceResult<f64>;
    fn roll_deg(&mut self) -> DeviceResult<f64>;
    fn pitch_deg(&mut self) -> DeviceResult<f64>;
    fn yaw_deg(&mut self) -> DeviceResult<f64>;
    fn battery_pct(&mut self) -> DeviceResult<u8>;
    fn accel_x(&mut self) -> DeviceResult<f64>;
    fn temperature_c(&mut self) -> DeviceResult<f64>;
    fn flow_velocity_x(&mut self) -> DeviceResult<f64>;
    fn flow_velocity_y(&mut self) -> DeviceResult<f64>;

    /// Command the drone to land.
    fn land(&mut self) -> DeviceResult<()>;

    /// Release the connection.
    fn close(&mut self) -> DeviceResult<()>;

    /// Poll every sensor once, in a fixed order. The first failing read aborts
    /// the pass.
    fn read_sensors(&mut self) -> DeviceResult<SensorReadings> {
        Ok(SensorReadings {
            height_cm: self.height_cm()?,
            roll_deg: self.roll_deg()?,
            pitch_deg: self.pitch_deg()?,
            yaw_deg: self.yaw_deg()?,
            battery_pct: self.battery_pct()?,
            accel_x: self.accel_x()?,
            temperature_c: self.temperature_c()?,
            flow_velocity_x: self.flow_velocity_x()?,
            flow_velocity_y: self.flow_velocity_y()?,
        })
    }
}

impl<D: TelemetryDevice + ?Sized> TelemetryDevice for Box<D> {
    fn pair(&mut self) -> DeviceResult<()> {
        (**self).pair()
    }
    fn height_cm(&mut self) -> DeviceResult<f64> {
        (**self).height_cm()
    }
    fn roll_deg(&mut self) -> DeviceResult<f64> {
        (**self).roll_deg()
    }
    fn pitch_deg(&mut self) -> DeviceResult<f64> {
        (**self).pitch_deg()
    }
    fn yaw_deg(&mut self) -> DeviceResult<f64> {
        (**self).yaw_deg()
    }
    fn battery_pct(&mut self) -> DeviceResult<u8> {
        (**self).battery_pct()
    }
    fn accel_x(&mut self) -> DeviceResult<f64> {
        (**self).accel_x()
    }
    fn temperature_c(&mut self) -> DeviceResult<f64> {
        (**self).temperature_c()
    }
    fn flow_velocity_x(&mut self) -> DeviceResult<f64> {
        (**self).flow_velocity_x()
    }
    fn flow_velocity_y(&mut self) -> DeviceResult<f64> {
        (**self).flow_velocity_y()
    }
    fn land(&mut self) -> DeviceResult<()> {
        (**self).land()
    }
    fn close(&mut self) -> DeviceResult<()> {
        (**self).close()
    }
    fn read_sensors(&mut self) -> DeviceResult<SensorReadings> {
        (**self).read_sensors()
    }
}
