// Timing, safety limits, servo angles and sensor calibration
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// Control loop period (~20Hz)
pub const CYCLE_PERIOD_MS: u64 = 50;

// Stop if an obstacle is closer than this while driving
pub const OBSTACLE_THRESHOLD_CM: i32 = 12;

// IR reading above this means the line is under the sensor
pub const IR_LINE_THRESHOLD: i32 = 500;

// Motor power range accepted by the H-bridge driver
pub const MOTOR_POWER_MAX: i32 = 255;

// Servo angles (degrees)
pub const CLAW_OPEN_DEG: u8 = 20;
pub const CLAW_CLOSE_DEG: u8 = 95;
pub const LAUNCHER_READY_DEG: u8 = 20;
pub const LAUNCHER_FIRE_DEG: u8 = 110;

// Sequence settle times
pub const PICKUP_OPEN_SETTLE_MS: u64 = 250;
pub const PICKUP_CLOSE_SETTLE_MS: u64 = 400;
pub const DROP_OPEN_SETTLE_MS: u64 = 500;
pub const SHOOT_READY_SETTLE_MS: u64 = 250;
pub const SHOOT_FIRE_SETTLE_MS: u64 = 300;
pub const SHOOT_RECOVER_SETTLE_MS: u64 = 250;

// Ultrasonic ranging
pub const NO_ECHO_CM: i32 = 999;
pub const ECHO_TIMEOUT_US: u32 = 25_000;
pub const ECHO_US_PER_CM: u32 = 58;

// Battery divider: Vbat -> R1 -> adc -> R2 -> GND
pub const ADC_REF_V: f32 = 5.0;
pub const ADC_MAX: f32 = 1023.0;
pub const BATTERY_R1_OHM: f32 = 10_000.0;
pub const BATTERY_R2_OHM: f32 = 10_000.0;

// Serial link to the operator
pub const SERIAL_BAUDRATE: u32 = 115_200;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load-time configuration. Every field falls back to the constants above,
/// so a config file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub cycle_period_ms: u64,
    pub safety: SafetyConfig,
    pub servos: ServoConfig,
    pub timings: SequenceTimings,
    pub battery: BatteryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub obstacle_threshold_cm: i32,
    pub ir_line_threshold: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    pub claw_open: u8,
    pub claw_close: u8,
    pub launcher_ready: u8,
    pub launcher_fire: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceTimings {
    pub pickup_open_ms: u64,
    pub pickup_close_ms: u64,
    pub drop_open_ms: u64,
    pub shoot_ready_ms: u64,
    pub shoot_fire_ms: u64,
    pub shoot_recover_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    pub adc_ref_v: f32,
    pub adc_max: f32,
    pub r1_ohm: f32,
    pub r2_ohm: f32,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            cycle_period_ms: CYCLE_PERIOD_MS,
            safety: SafetyConfig::default(),
            servos: ServoConfig::default(),
            timings: SequenceTimings::default(),
            battery: BatteryConfig::default(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            obstacle_threshold_cm: OBSTACLE_THRESHOLD_CM,
            ir_line_threshold: IR_LINE_THRESHOLD,
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            claw_open: CLAW_OPEN_DEG,
            claw_close: CLAW_CLOSE_DEG,
            launcher_ready: LAUNCHER_READY_DEG,
            launcher_fire: LAUNCHER_FIRE_DEG,
        }
    }
}

impl Default for SequenceTimings {
    fn default() -> Self {
        Self {
            pickup_open_ms: PICKUP_OPEN_SETTLE_MS,
            pickup_close_ms: PICKUP_CLOSE_SETTLE_MS,
            drop_open_ms: DROP_OPEN_SETTLE_MS,
            shoot_ready_ms: SHOOT_READY_SETTLE_MS,
            shoot_fire_ms: SHOOT_FIRE_SETTLE_MS,
            shoot_recover_ms: SHOOT_RECOVER_SETTLE_MS,
        }
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            adc_ref_v: ADC_REF_V,
            adc_max: ADC_MAX,
            r1_ohm: BATTERY_R1_OHM,
            r2_ohm: BATTERY_R2_OHM,
        }
    }
}

impl RobotConfig {
    /// Read a JSON config file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_period_ms == 0 {
            return Err(ConfigError::Invalid("cycle_period_ms must be > 0".into()));
        }
        if self.safety.obstacle_threshold_cm <= 0 {
            return Err(ConfigError::Invalid(
                "safety.obstacle_threshold_cm must be > 0".into(),
            ));
        }
        if self.safety.obstacle_threshold_cm >= NO_ECHO_CM {
            return Err(ConfigError::Invalid(format!(
                "safety.obstacle_threshold_cm must be below the no-echo value ({NO_ECHO_CM})"
            )));
        }
        if self.battery.adc_max <= 0.0 {
            return Err(ConfigError::Invalid("battery.adc_max must be > 0".into()));
        }
        if self.battery.r2_ohm <= 0.0 {
            return Err(ConfigError::Invalid("battery.r2_ohm must be > 0".into()));
        }
        Ok(())
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }
}
