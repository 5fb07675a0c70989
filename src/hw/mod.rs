// Robot hardware seams
//
// The control core only talks to these traits:
// - SensorRead: one numeric reading per sensor, degraded to a sentinel on failure
// - Actuators: motor power and servo angles
//
// Provides:
// - Raw reading conversions (ADC counts, echo pulse widths)
// - A simulated robot for running without hardware

pub mod convert;
pub mod sim;

pub use sim::SimRobot;

use crate::messages::Rgb;

/// Which drive motor a power value is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Servo-actuated mechanisms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Servo {
    Claw,
    Launcher,
}

/// Sensor-read interface. Reads never fail: a read that times out returns
/// the sensor's sentinel value instead (see [`crate::config::NO_ECHO_CM`]).
pub trait SensorRead {
    fn read_ir_left(&mut self) -> i32;
    fn read_ir_right(&mut self) -> i32;
    fn read_distance_cm(&mut self) -> i32;
    fn read_battery_v(&mut self) -> f32;
    fn read_color(&mut self) -> Rgb;
}

/// Actuator interface
pub trait Actuators {
    /// `power` is already clamped to the motor range
    fn set_motor(&mut self, side: Side, power: i16);
    fn set_servo(&mut self, servo: Servo, angle: u8);

    fn set_claw(&mut self, angle: u8) {
        self.set_servo(Servo::Claw, angle);
    }

    fn set_launcher(&mut self, angle: u8) {
        self.set_servo(Servo::Launcher, angle);
    }
}

/// Everything the runtime needs from the robot
pub trait Robot: SensorRead + Actuators {}

impl<T: SensorRead + Actuators> Robot for T {}
