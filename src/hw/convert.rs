// Conversions from raw sensor readings to the units the control core uses

use crate::config::{BatteryConfig, ECHO_TIMEOUT_US, ECHO_US_PER_CM, NO_ECHO_CM};

/// Battery voltage from the divider tap ADC reading
///
/// Vbat = Vadc * (R1 + R2) / R2
pub fn battery_voltage(raw_adc: u16, cfg: &BatteryConfig) -> f32 {
    let v_adc = raw_adc as f32 * cfg.adc_ref_v / cfg.adc_max;
    v_adc * (cfg.r1_ohm + cfg.r2_ohm) / cfg.r2_ohm
}

/// Inverse of [`battery_voltage`], rounded to the nearest ADC count
pub fn battery_adc(volts: f32, cfg: &BatteryConfig) -> u16 {
    let v_adc = volts * cfg.r2_ohm / (cfg.r1_ohm + cfg.r2_ohm);
    let raw = (v_adc * cfg.adc_max / cfg.adc_ref_v).round();
    raw.clamp(0.0, cfg.adc_max) as u16
}

/// Distance from an ultrasonic echo pulse width
///
/// A zero-width pulse means the echo never came back within the timeout, which
/// maps to the no-echo sentinel rather than a distance.
pub fn echo_to_cm(pulse_us: u32) -> i32 {
    if pulse_us == 0 || pulse_us > ECHO_TIMEOUT_US {
        return NO_ECHO_CM;
    }
    (pulse_us / ECHO_US_PER_CM) as i32
}

/// Whether a distance reading is the no-echo sentinel
pub fn is_no_echo(distance_cm: i32) -> bool {
    distance_cm == NO_ECHO_CM
}

/// IR reflectance above the threshold means the line is under the sensor
pub fn ir_on_line(reading: i32, threshold: i32) -> bool {
    reading > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_divider() {
        let cfg = BatteryConfig::default();
        // Full-scale ADC on a 1:1 divider with a 5V reference
        assert!((battery_voltage(1023, &cfg) - 10.0).abs() < 1e-4);
        // 7.4V pack -> 3.7V at the tap -> ~757 counts
        assert_eq!(battery_adc(7.4, &cfg), 757);
        assert!((battery_voltage(757, &cfg) - 7.4).abs() < 0.01);
    }

    #[test]
    fn test_battery_uneven_divider() {
        let cfg = BatteryConfig {
            r1_ohm: 20_000.0,
            r2_ohm: 10_000.0,
            ..BatteryConfig::default()
        };
        assert!((battery_voltage(1023, &cfg) - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_echo_conversion() {
        assert_eq!(echo_to_cm(0), NO_ECHO_CM);
        assert_eq!(echo_to_cm(ECHO_TIMEOUT_US + 1), NO_ECHO_CM);
        assert_eq!(echo_to_cm(580), 10);
        assert_eq!(echo_to_cm(57), 0);
        assert!(is_no_echo(echo_to_cm(0)));
        assert!(!is_no_echo(echo_to_cm(580)));
    }

    #[test]
    fn test_ir_threshold() {
        assert!(ir_on_line(501, 500));
        assert!(!ir_on_line(500, 500));
    }
}
