// Simulated robot for running the runtime without hardware
//
// Produces raw readings (ADC counts, echo pulse widths) the way the real sensors
// do and converts them through hw::convert, so the control core sees the same
// quantisation and sentinels it would on the robot.

use tracing::debug;

use super::convert::{battery_adc, battery_voltage, echo_to_cm};
use super::{Actuators, SensorRead, Servo, Side};
use crate::config::{BatteryConfig, CLAW_OPEN_DEG, ECHO_US_PER_CM, LAUNCHER_READY_DEG};
use crate::messages::Rgb;

/// Beyond this the simulated ultrasonic sensor gets no echo
pub const SIM_MAX_RANGE_CM: f32 = 400.0;

/// How far the robot moves per distance read, per unit of mean motor power
const CM_PER_POWER_PER_READ: f32 = 0.002;

/// Battery drain per distance read, per unit of absolute motor power
const VOLTS_PER_POWER_PER_READ: f32 = 1e-7;

#[derive(Debug, Clone)]
pub struct SimRobot {
    obstacle_cm: f32,
    battery_v: f32,
    battery_cfg: BatteryConfig,
    ir: (i32, i32),
    color: Rgb,
    motors: (i16, i16),
    claw: u8,
    launcher: u8,
}

impl SimRobot {
    pub fn new(battery_cfg: BatteryConfig) -> Self {
        Self {
            obstacle_cm: SIM_MAX_RANGE_CM * 2.0,
            battery_v: 7.4,
            battery_cfg,
            ir: (120, 130),
            color: Rgb { r: 180, g: 190, b: 200 },
            motors: (0, 0),
            claw: CLAW_OPEN_DEG,
            launcher: LAUNCHER_READY_DEG,
        }
    }

    /// Place an obstacle straight ahead
    pub fn with_obstacle_cm(mut self, cm: f32) -> Self {
        self.obstacle_cm = cm;
        self
    }

    pub fn with_ir(mut self, left: i32, right: i32) -> Self {
        self.ir = (left, right);
        self
    }

    pub fn motors(&self) -> (i16, i16) {
        self.motors
    }

    pub fn servo(&self, servo: Servo) -> u8 {
        match servo {
            Servo::Claw => self.claw,
            Servo::Launcher => self.launcher,
        }
    }

    pub fn obstacle_cm(&self) -> f32 {
        self.obstacle_cm
    }

    fn step_world(&mut self) {
        let (left, right) = (self.motors.0 as f32, self.motors.1 as f32);
        let advance = (left + right) / 2.0 * CM_PER_POWER_PER_READ;
        self.obstacle_cm = (self.obstacle_cm - advance).max(0.0);
        self.battery_v -= (left.abs() + right.abs()) * VOLTS_PER_POWER_PER_READ;
    }
}

impl SensorRead for SimRobot {
    fn read_ir_left(&mut self) -> i32 {
        self.ir.0
    }

    fn read_ir_right(&mut self) -> i32 {
        self.ir.1
    }

    fn read_distance_cm(&mut self) -> i32 {
        self.step_world();
        let pulse_us = if self.obstacle_cm > SIM_MAX_RANGE_CM {
            0
        } else {
            (self.obstacle_cm * ECHO_US_PER_CM as f32) as u32
        };
        echo_to_cm(pulse_us)
    }

    fn read_battery_v(&mut self) -> f32 {
        let raw = battery_adc(self.battery_v, &self.battery_cfg);
        battery_voltage(raw, &self.battery_cfg)
    }

    fn read_color(&mut self) -> Rgb {
        self.color
    }
}

impl Actuators for SimRobot {
    fn set_motor(&mut self, side: Side, power: i16) {
        match side {
            Side::Left => self.motors.0 = power,
            Side::Right => self.motors.1 = power,
        }
    }

    fn set_servo(&mut self, servo: Servo, angle: u8) {
        debug!("Sim servo {:?} -> {} deg", servo, angle);
        match servo {
            Servo::Claw => self.claw = angle,
            Servo::Launcher => self.launcher = angle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IR_LINE_THRESHOLD, NO_ECHO_CM};
    use crate::messages::SensorSnapshot;

    #[test]
    fn test_out_of_range_is_no_echo() {
        let mut sim = SimRobot::new(BatteryConfig::default());
        assert_eq!(sim.read_distance_cm(), NO_ECHO_CM);
    }

    #[test]
    fn test_driving_closes_distance() {
        let mut sim = SimRobot::new(BatteryConfig::default()).with_obstacle_cm(30.0);
        assert_eq!(sim.read_distance_cm(), 30);

        sim.set_motor(Side::Left, 250);
        sim.set_motor(Side::Right, 250);
        for _ in 0..20 {
            sim.read_distance_cm();
        }
        // 20 reads at 0.5cm each
        assert_eq!(sim.read_distance_cm(), 19);
    }

    #[test]
    fn test_battery_is_quantised_through_adc() {
        let mut sim = SimRobot::new(BatteryConfig::default());
        let v = sim.read_battery_v();
        assert!((v - 7.4).abs() < 0.01);
    }

    #[test]
    fn test_servo_positions() {
        let mut sim = SimRobot::new(BatteryConfig::default());
        assert_eq!(sim.servo(Servo::Claw), CLAW_OPEN_DEG);
        sim.set_claw(95);
        sim.set_launcher(110);
        assert_eq!(sim.servo(Servo::Claw), 95);
        assert_eq!(sim.servo(Servo::Launcher), 110);
    }

    #[test]
    fn test_ir_line_seen_in_snapshot() {
        let mut sim = SimRobot::new(BatteryConfig::default());
        let snap = SensorSnapshot::capture(&mut sim);
        assert_eq!(snap.line_under(IR_LINE_THRESHOLD), (false, false));

        let mut sim = SimRobot::new(BatteryConfig::default()).with_ir(820, 140);
        let snap = SensorSnapshot::capture(&mut sim);
        assert_eq!((snap.left_ir, snap.right_ir), (820, 140));
        assert_eq!(snap.line_under(IR_LINE_THRESHOLD), (true, false));
    }
}
