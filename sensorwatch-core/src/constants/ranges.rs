//! Plausibility ranges, expected ranges, precision and units
//!
//! Two range tables exist on purpose:
//! - **Clamp ranges** bound what a sensor type can physically report. The
//!   Cleaning Stage forces values into them.
//! - **Expected ranges** bound normal operating conditions. Values outside
//!   them are plausible but suspicious and cost quality score.

use super::ValueRange;

// ===== CLAMP RANGES =====

/// Temperature plausibility range (°C)
pub const TEMPERATURE_CLAMP: ValueRange = ValueRange::new(-100.0, 150.0);

/// Relative humidity plausibility range (%)
pub const HUMIDITY_CLAMP: ValueRange = ValueRange::new(0.0, 100.0);

/// Pressure plausibility range (hPa)
pub const PRESSURE_CLAMP: ValueRange = ValueRange::new(0.0, 2000.0);

/// pH plausibility range
pub const PH_CLAMP: ValueRange = ValueRange::new(0.0, 14.0);

/// Voltage plausibility range (V)
pub const VOLTAGE_CLAMP: ValueRange = ValueRange::new(-50.0, 50.0);

/// Current plausibility range (A)
pub const CURRENT_CLAMP: ValueRange = ValueRange::new(-100.0, 100.0);

/// Clamp range for a sensor type; `None` means the type is not clamped
pub fn clamp_range(sensor_type: &str) -> Option<ValueRange> {
    match sensor_type {
        "temperature" => Some(TEMPERATURE_CLAMP),
        "humidity" => Some(HUMIDITY_CLAMP),
        "pressure" => Some(PRESSURE_CLAMP),
        "ph" => Some(PH_CLAMP),
        "voltage" => Some(VOLTAGE_CLAMP),
        "current" => Some(CURRENT_CLAMP),
        _ => None,
    }
}

// ===== PRECISION =====

/// Decimal places kept when no type-specific precision exists
pub const DEFAULT_PRECISION: u32 = 2;

/// Decimal places kept for a sensor type
pub fn precision(sensor_type: &str) -> u32 {
    match sensor_type {
        "temperature" => 2,
        "humidity" => 1,
        "pressure" => 1,
        "ph" => 2,
        "voltage" => 3,
        "current" => 3,
        _ => DEFAULT_PRECISION,
    }
}

/// Round `value` half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // Very large magnitudes overflow the scaled intermediate
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

// ===== EXPECTED RANGES =====

/// Expected operating range for a sensor type, if one is defined
pub fn expected_range(sensor_type: &str) -> Option<ValueRange> {
    match sensor_type {
        "temperature" => Some(ValueRange::new(-20.0, 50.0)),
        "humidity" => Some(ValueRange::new(20.0, 80.0)),
        "pressure" => Some(ValueRange::new(950.0, 1050.0)),
        "ph" => Some(ValueRange::new(6.0, 8.5)),
        "voltage" => Some(ValueRange::new(0.0, 24.0)),
        "current" => Some(ValueRange::new(0.0, 20.0)),
        "co2" => Some(ValueRange::new(400.0, 2000.0)),
        _ => None,
    }
}

// ===== UNITS =====

/// Unit reported when a reading arrives without one
pub fn canonical_unit(sensor_type: &str) -> &'static str {
    match sensor_type {
        "temperature" => "°C",
        "humidity" => "%",
        "pressure" => "hPa",
        "ph" => "pH",
        "voltage" => "V",
        "current" => "A",
        "co2" => "ppm",
        _ => "",
    }
}

/// Whether a unit string denotes degrees Celsius
pub fn is_celsius(unit: &str) -> bool {
    matches!(unit.trim(), "°C" | "C" | "degC" | "celsius" | "Celsius")
}

/// Whether a unit string denotes hectopascals
pub fn is_hectopascal(unit: &str) -> bool {
    matches!(unit.trim(), "hPa" | "hpa" | "mbar")
}

/// Offset between Celsius and Kelvin
pub const KELVIN_OFFSET: f64 = 273.15;

/// Pounds per square inch in one hectopascal
pub const PSI_PER_HPA: f64 = 0.014_503_773_8;

/// Inches of mercury in one hectopascal
pub const INHG_PER_HPA: f64 = 0.029_529_983_1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_clamp_ranges() {
        assert_eq!(clamp_range("ph"), Some(PH_CLAMP));
        assert_eq!(clamp_range("co2"), None);
        assert_eq!(clamp_range("Temperature"), None);
    }

    #[test]
    fn precision_table() {
        assert_eq!(precision("voltage"), 3);
        assert_eq!(precision("humidity"), 1);
        assert_eq!(precision("lux"), DEFAULT_PRECISION);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(21.456, 2), 21.46);
        assert_eq!(round_to(-3.25, 1), -3.3);
        assert_eq!(round_to(f64::MAX, 3), f64::MAX);
    }

    #[test]
    fn unit_recognition() {
        assert!(is_celsius("°C"));
        assert!(is_celsius(" C "));
        assert!(!is_celsius("°F"));
        assert!(is_hectopascal("hPa"));
        assert!(!is_hectopascal("kPa"));
    }
}
