// Message types shared by the decoder, the motion core and telemetry

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::value::RawValue;

use crate::config::MOTOR_POWER_MAX;
use crate::hw::{SensorRead, convert};

/// One read cycle's sensor values. Captured once per cycle and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    pub left_ir: i32,
    pub right_ir: i32,
    pub distance_cm: i32,
    pub battery_v: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl SensorSnapshot {
    pub fn capture<S: SensorRead + ?Sized>(sensors: &mut S) -> Self {
        Self {
            left_ir: sensors.read_ir_left(),
            right_ir: sensors.read_ir_right(),
            distance_cm: sensors.read_distance_cm(),
            battery_v: sensors.read_battery_v(),
            color: sensors.read_color(),
        }
    }

    /// Which IR sensors currently see the line, as (left, right)
    pub fn line_under(&self, threshold: i32) -> (bool, bool) {
        (
            convert::ir_on_line(self.left_ir, threshold),
            convert::ir_on_line(self.right_ir, threshold),
        )
    }
}

/// The operator's most recently requested motor power. Kept unclamped;
/// clamping happens when it is turned into a [`MotorOutput`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveCommand {
    pub left: i32,
    pub right: i32,
}

impl DriveCommand {
    pub fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    pub fn stop() -> Self {
        Self::default()
    }

    pub fn is_stopped(&self) -> bool {
        self.left == 0 && self.right == 0
    }
}

/// Motor power actually handed to the actuators. Always within
/// `[-MOTOR_POWER_MAX, MOTOR_POWER_MAX]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorOutput {
    left: i16,
    right: i16,
}

impl MotorOutput {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn left(&self) -> i16 {
        self.left
    }

    pub fn right(&self) -> i16 {
        self.right
    }

    pub fn is_zero(&self) -> bool {
        self.left == 0 && self.right == 0
    }
}

impl From<&DriveCommand> for MotorOutput {
    fn from(cmd: &DriveCommand) -> Self {
        Self {
            left: clamp_power(cmd.left),
            right: clamp_power(cmd.right),
        }
    }
}

fn clamp_power(power: i32) -> i16 {
    // MOTOR_POWER_MAX fits in i16, so the cast is lossless after clamping
    power.clamp(-MOTOR_POWER_MAX, MOTOR_POWER_MAX) as i16
}

/// The robot's high-level operating state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    #[default]
    Idle,
    Drive,
    Stop,
    ObstacleStop,
    PickupBox,
    DropBox,
    Shoot,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Idle => "IDLE",
            Mode::Drive => "DRIVE",
            Mode::Stop => "STOP",
            Mode::ObstacleStop => "OBSTACLE_STOP",
            Mode::PickupBox => "PICKUP_BOX",
            Mode::DropBox => "DROP_BOX",
            Mode::Shoot => "SHOOT",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named actions accepted from the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRequest {
    Stop,
    PickupBox,
    DropBox,
    Shoot,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown action name: {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for ActionRequest {
    type Err = UnknownAction;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "STOP" => Ok(ActionRequest::Stop),
            "PICKUP_BOX" => Ok(ActionRequest::PickupBox),
            "DROP_BOX" => Ok(ActionRequest::DropBox),
            "SHOOT" => Ok(ActionRequest::Shoot),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// Result of decoding one inbound line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    NoCommand,
    Drive { left: i32, right: i32 },
    Action(String),
}

/// One telemetry line, written once per cycle. Field order is the wire order.
#[derive(Debug, Clone, Serialize)]
pub struct Telemetry {
    pub t_ms: u64,
    #[serde(rename = "irL")]
    pub ir_left: i32,
    #[serde(rename = "irR")]
    pub ir_right: i32,
    pub dist_cm: i32,
    #[serde(serialize_with = "three_decimals")]
    pub bat_v: f32,
    pub rgb: [u16; 3],
    pub mode: Mode,
}

impl Telemetry {
    pub fn new(t_ms: u64, snapshot: &SensorSnapshot, mode: Mode) -> Self {
        Self {
            t_ms,
            ir_left: snapshot.left_ir,
            ir_right: snapshot.right_ir,
            dist_cm: snapshot.distance_cm,
            bat_v: snapshot.battery_v,
            rgb: [snapshot.color.r, snapshot.color.g, snapshot.color.b],
            mode,
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// Writes e.g. 7.400 rather than 7.4; NaN/inf become null so the line stays valid JSON
fn three_decimals<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    if !value.is_finite() {
        return serializer.serialize_none();
    }
    let raw = RawValue::from_string(format!("{value:.3}")).map_err(serde::ser::Error::custom)?;
    raw.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SensorSnapshot {
        SensorSnapshot {
            left_ir: 512,
            right_ir: 130,
            distance_cm: 42,
            battery_v: 7.4,
            color: Rgb { r: 300, g: 20, b: 1023 },
        }
    }

    #[test]
    fn test_clamp_to_motor_range() {
        let out = MotorOutput::from(&DriveCommand::new(400, -1000));
        assert_eq!(out.left(), 255);
        assert_eq!(out.right(), -255);

        let out = MotorOutput::from(&DriveCommand::new(i32::MIN, i32::MAX));
        assert_eq!(out.left(), -255);
        assert_eq!(out.right(), 255);

        let out = MotorOutput::from(&DriveCommand::new(-17, 255));
        assert_eq!((out.left(), out.right()), (-17, 255));
    }

    #[test]
    fn test_action_names() {
        assert_eq!("SHOOT".parse::<ActionRequest>(), Ok(ActionRequest::Shoot));
        assert_eq!("PICKUP_BOX".parse::<ActionRequest>(), Ok(ActionRequest::PickupBox));
        assert_eq!(
            "shoot".parse::<ActionRequest>(),
            Err(UnknownAction("shoot".to_string()))
        );
    }

    #[test]
    fn test_telemetry_wire_format() {
        let line = Telemetry::new(1234, &snapshot(), Mode::ObstacleStop)
            .to_line()
            .unwrap();
        assert_eq!(
            line,
            r#"{"t_ms":1234,"irL":512,"irR":130,"dist_cm":42,"bat_v":7.400,"rgb":[300,20,1023],"mode":"OBSTACLE_STOP"}"#
        );
    }

    #[test]
    fn test_telemetry_non_finite_battery() {
        let mut snap = snapshot();
        snap.battery_v = f32::NAN;
        let line = Telemetry::new(0, &snap, Mode::Idle).to_line().unwrap();
        assert!(line.contains(r#""bat_v":null"#));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["mode"], "IDLE");
    }

    #[test]
    fn test_line_under() {
        assert_eq!(snapshot().line_under(500), (true, false));
    }
}
