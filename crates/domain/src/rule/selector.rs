//! Selector: names either one sensor instance or a whole sensor type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::sensor::SensorReading;

/// Which readings a rule or condition looks at.
///
/// A selector containing a digit (`LDR1`, `motion2`) names one sensor
/// instance; anything else (`LDR`, `motion`) names a sensor type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Selector {
    Name(String),
    Class(String),
}

impl Selector {
    #[must_use]
    pub fn matches(&self, reading: &SensorReading) -> bool {
        match self {
            Self::Name(name) => reading.sensor_name == *name,
            Self::Class(class) => reading.sensor_type == *class,
        }
    }

    /// Readings picked out by this selector, in input order.
    pub fn filter<'a>(
        &'a self,
        readings: &'a [SensorReading],
    ) -> impl Iterator<Item = &'a SensorReading> + 'a {
        readings.iter().filter(move |r| self.matches(r))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Name(s) | Self::Class(s) => s,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Selector {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::EmptySelector);
        }
        if s.chars().any(|c| c.is_ascii_digit()) {
            Ok(Self::Name(s.to_string()))
        } else {
            Ok(Self::Class(s.to_string()))
        }
    }
}
