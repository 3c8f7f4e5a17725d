//! Sensor readings reported by devices.

use serde::{Deserialize, Serialize};

/// Pin a reading was taken from.
///
/// Devices report either a numeric GPIO/ADC channel or a free-form label;
/// the form received is preserved so it round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorPin {
    Number(i64),
    Label(String),
}

impl std::fmt::Display for SensorPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => n.fmt(f),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// One value read from one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Instance name, e.g. `LDR1`, `motion2`.
    pub sensor_name: String,
    /// Type class, e.g. `LDR`, `motion`, `temperature`.
    pub sensor_type: String,
    pub sensor_pin: SensorPin,
    #[serde(rename = "sensor_value")]
    pub value: f64,
}

impl SensorReading {
    #[must_use]
    pub fn new(
        sensor_name: impl Into<String>,
        sensor_type: impl Into<String>,
        sensor_pin: SensorPin,
        value: f64,
    ) -> Self {
        Self {
            sensor_name: sensor_name.into(),
            sensor_type: sensor_type.into(),
            sensor_pin,
            value,
        }
    }
}
