//! Condition: a guard evaluated against the current sensor status.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::RuleId;
use crate::rule::{Comparator, Selector};
use crate::sensor::SensorReading;
use crate::time;

/// How the selected readings are reduced before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Sum,
    Average,
    Time,
}

impl ConditionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Average => "average",
            Self::Time => "time",
        }
    }
}

impl FromStr for ConditionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "average" | "mean" => Ok(Self::Average),
            "time" => Ok(Self::Time),
            other => Err(ValidationError::UnknownConditionKind(other.to_string())),
        }
    }
}

/// Right-hand side of the comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Number(f64),
    /// Zero-padded `HH:MM`.
    Clock(String),
}

/// Condition row as stored, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionDefinition {
    pub rule_id: RuleId,
    pub kind: String,
    pub selector: String,
    pub comparator: String,
    pub threshold: String,
}

/// A validated predicate over the sensor status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub rule_id: RuleId,
    pub kind: ConditionKind,
    pub selector: Selector,
    pub comparator: Comparator,
    pub threshold: Threshold,
}

impl Condition {
    /// Evaluate against `readings` using the current local time of day.
    ///
    /// `readings` is the whole status snapshot; the selector picks the
    /// relevant subset.
    #[must_use]
    pub fn evaluate(&self, readings: &[SensorReading]) -> bool {
        self.evaluate_at(readings, time::local_time_of_day())
    }

    /// Evaluate with an explicit time of day.
    #[must_use]
    pub fn evaluate_at(&self, readings: &[SensorReading], now: NaiveTime) -> bool {
        match (&self.kind, &self.threshold) {
            (ConditionKind::Sum, Threshold::Number(threshold)) => {
                let sum: f64 = self.selector.filter(readings).map(|r| r.value).sum();
                self.comparator.compare(&sum, threshold)
            }
            (ConditionKind::Average, Threshold::Number(threshold)) => {
                let (count, sum) = self
                    .selector
                    .filter(readings)
                    .fold((0_u32, 0.0_f64), |(n, s), r| (n + 1, s + r.value));
                if count == 0 {
                    return false;
                }
                let mean = sum / f64::from(count);
                self.comparator.compare(&mean, threshold)
            }
            (ConditionKind::Time, Threshold::Clock(threshold)) => {
                let current = time::clock_string(now);
                self.comparator.compare(current.as_str(), threshold.as_str())
            }
            _ => false,
        }
    }
}

impl TryFrom<ConditionDefinition> for Condition {
    type Error = ValidationError;

    fn try_from(def: ConditionDefinition) -> Result<Self, Self::Error> {
        let kind: ConditionKind = def.kind.parse()?;
        let comparator: Comparator = def.comparator.parse()?;
        let threshold_text = def.threshold.trim();
        let threshold = match kind {
            ConditionKind::Sum | ConditionKind::Average => threshold_text
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Threshold::Number)
                .ok_or_else(|| ValidationError::InvalidThreshold {
                    kind: kind.as_str(),
                    value: def.threshold.clone(),
                })?,
            ConditionKind::Time => {
                if !time::is_clock_string(threshold_text) {
                    return Err(ValidationError::InvalidClockTime(def.threshold));
                }
                Threshold::Clock(threshold_text.to_string())
            }
        };
        // Time conditions do not read sensors; the selector is informational.
        let selector = match kind {
            ConditionKind::Time if def.selector.trim().is_empty() => {
                Selector::Class("time".to_string())
            }
            _ => def.selector.parse()?,
        };

        Ok(Self {
            rule_id: def.rule_id,
            kind,
            selector,
            comparator,
            threshold,
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let threshold = match &self.threshold {
            Threshold::Number(n) => n.to_string(),
            Threshold::Clock(c) => c.clone(),
        };
        write!(
            f,
            "{}({}) {} {}",
            self.kind.as_str(),
            self.selector,
            self.comparator,
            threshold
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorPin;

    fn definition(kind: &str, selector: &str, comparator: &str, threshold: &str) -> ConditionDefinition {
        ConditionDefinition {
            rule_id: RuleId::new(1),
            kind: kind.to_string(),
            selector: selector.to_string(),
            comparator: comparator.to_string(),
            threshold: threshold.to_string(),
        }
    }

    fn condition(kind: &str, selector: &str, comparator: &str, threshold: &str) -> Condition {
        Condition::try_from(definition(kind, selector, comparator, threshold)).unwrap()
    }

    fn ldr(values: &[f64]) -> Vec<SensorReading> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SensorReading::new(format!("LDR{}", i + 1), "LDR", SensorPin::Number(i64::try_from(i).unwrap()), *v))
            .collect()
    }

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn should_pass_sum_condition_above_threshold() {
        let c = condition("sum", "LDR", ">", "50");
        assert!(c.evaluate_at(&ldr(&[30.0, 25.0]), noon()));
    }

    #[test]
    fn should_fail_sum_condition_below_threshold() {
        let c = condition("sum", "LDR", ">", "50");
        assert!(!c.evaluate_at(&ldr(&[10.0, 5.0]), noon()));
    }

    #[test]
    fn should_only_sum_selected_readings() {
        let mut readings = ldr(&[30.0, 25.0]);
        readings.push(SensorReading::new("motion1", "motion", SensorPin::Number(17), 100.0));
        let c = condition("sum", "LDR", "<", "56");
        assert!(c.evaluate_at(&readings, noon()));
    }

    #[test]
    fn should_filter_by_instance_name_when_selector_has_digit() {
        let c = condition("sum", "LDR2", "==", "25");
        assert!(c.evaluate_at(&ldr(&[30.0, 25.0]), noon()));
    }

    #[test]
    fn should_fail_average_condition_on_empty_readings() {
        let c = condition("average", "LDR", "<=", "20");
        assert!(!c.evaluate_at(&[], noon()));
    }

    #[test]
    fn should_compare_average_of_readings() {
        let c = condition("average", "LDR", "<=", "20");
        assert!(c.evaluate_at(&ldr(&[10.0, 30.0]), noon()));
        assert!(!c.evaluate_at(&ldr(&[10.0, 40.0]), noon()));
    }

    #[test]
    fn should_compare_time_of_day() {
        let c = condition("time", "", ">=", "18:00");
        let evening = NaiveTime::from_hms_opt(18, 0, 30).unwrap();
        assert!(c.evaluate_at(&[], evening));
        assert!(!c.evaluate_at(&[], noon()));
    }

    #[test]
    fn should_compare_early_morning_before_late_morning() {
        let c = condition("time", "clock", "<", "09:30");
        let early = NaiveTime::from_hms_opt(9, 5, 0).unwrap();
        assert!(c.evaluate_at(&[], early));
    }

    #[test]
    fn should_reject_unknown_comparator_at_load_time() {
        let result = Condition::try_from(definition("sum", "LDR", "=<", "50"));
        assert_eq!(
            result,
            Err(ValidationError::UnknownComparator("=<".to_string()))
        );
    }

    #[test]
    fn should_reject_unknown_kind_at_load_time() {
        let result = Condition::try_from(definition("max", "LDR", ">", "50"));
        assert_eq!(
            result,
            Err(ValidationError::UnknownConditionKind("max".to_string()))
        );
    }

    #[test]
    fn should_reject_non_numeric_threshold() {
        let result = Condition::try_from(definition("sum", "LDR", ">", "bright"));
        assert!(matches!(
            result,
            Err(ValidationError::InvalidThreshold { kind: "sum", .. })
        ));
    }

    #[test]
    fn should_reject_unpadded_clock_threshold() {
        let result = Condition::try_from(definition("time", "", ">", "8:00"));
        assert_eq!(
            result,
            Err(ValidationError::InvalidClockTime("8:00".to_string()))
        );
    }

    #[test]
    fn should_display_condition() {
        let c = condition("average", "LDR", "<=", "20");
        assert_eq!(c.to_string(), "average(LDR) <= 20");
    }
}
