//! Rule: sensor selector → conditions → primary / secondary command.
//!
//! A [`Rule`] is scoped to one topology node. It applies to a sensor event
//! when the event's reading matches the rule's sensor [`Selector`]. When
//! every [`Condition`] holds, the primary [`Command`] runs immediately and
//! the optional secondary one runs after `timer_seconds`, debounced on the
//! rule's trigger key.

mod command;
mod comparator;
mod condition;
mod selector;

pub use command::{ANY_PLAYLIST, Command, CommandDefinition, CommandKind};
pub use comparator::Comparator;
pub use condition::{Condition, ConditionDefinition, ConditionKind, Threshold};
pub use selector::Selector;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HomeError, ValidationError};
use crate::id::{NodeId, RuleId};
use crate::sensor::SensorReading;

/// An automation rule attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub node_id: NodeId,
    pub name: String,
    pub sensor: Selector,
    pub primary: Command,
    pub secondary: Option<Command>,
    pub timer_seconds: u64,
    pub conditions: Vec<Condition>,
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Key scoping debounce timers: the rule's sensor selector text.
    #[must_use]
    pub fn trigger_key(&self) -> &str {
        self.sensor.as_str()
    }

    /// Whether `reading` is one this rule reacts to.
    #[must_use]
    pub fn applies_to(&self, reading: &SensorReading) -> bool {
        self.sensor.matches(reading)
    }

    /// Delay and command for the debounced secondary action, if any.
    #[must_use]
    pub fn delayed(&self) -> Option<(Duration, &Command)> {
        if self.timer_seconds == 0 {
            return None;
        }
        self.secondary
            .as_ref()
            .map(|cmd| (Duration::from_secs(self.timer_seconds), cmd))
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HomeError::Validation`] when `name` is empty.
    pub fn validate(&self) -> Result<(), HomeError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    id: Option<RuleId>,
    node_id: Option<NodeId>,
    name: Option<String>,
    sensor: Option<Selector>,
    primary: Option<Command>,
    secondary: Option<Command>,
    timer_seconds: u64,
    conditions: Vec<Condition>,
}

impl RuleBuilder {
    #[must_use]
    pub fn id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn sensor(mut self, sensor: Selector) -> Self {
        self.sensor = Some(sensor);
        self
    }

    #[must_use]
    pub fn primary(mut self, command: Command) -> Self {
        self.primary = Some(command);
        self
    }

    #[must_use]
    pub fn secondary(mut self, command: Command) -> Self {
        self.secondary = Some(command);
        self
    }

    #[must_use]
    pub fn timer_seconds(mut self, seconds: u64) -> Self {
        self.timer_seconds = seconds;
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`HomeError::Validation`] when the name is empty, the sensor
    /// selector is missing, or no primary command was given.
    pub fn build(self) -> Result<Rule, HomeError> {
        let sensor = self.sensor.ok_or(ValidationError::EmptySelector)?;
        let primary = self.primary.ok_or(ValidationError::MissingPrimaryCommand)?;
        let rule = Rule {
            id: self.id.unwrap_or(RuleId::new(0)),
            node_id: self.node_id.unwrap_or(NodeId::new(0)),
            name: self.name.unwrap_or_default(),
            sensor,
            primary,
            secondary: self.secondary,
            timer_seconds: self.timer_seconds,
            conditions: self.conditions,
        };
        rule.validate()?;
        Ok(rule)
    }
}

/// Rule row as stored, with its commands and conditions joined in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefinition {
    pub id: RuleId,
    pub node_id: NodeId,
    pub name: String,
    pub sensor: String,
    pub timer_seconds: i64,
    pub primary: Option<CommandDefinition>,
    pub secondary: Option<CommandDefinition>,
    pub conditions: Vec<ConditionDefinition>,
}

impl TryFrom<RuleDefinition> for Rule {
    type Error = HomeError;

    /// Validate every part of a stored rule; any bad part rejects the rule.
    fn try_from(def: RuleDefinition) -> Result<Self, Self::Error> {
        let primary = def
            .primary
            .ok_or(ValidationError::MissingPrimaryCommand)
            .and_then(Command::try_from)?;
        let secondary = def.secondary.map(Command::try_from).transpose()?;
        let conditions = def
            .conditions
            .into_iter()
            .map(Condition::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = Rule::builder()
            .id(def.id)
            .node_id(def.node_id)
            .name(def.name)
            .sensor(def.sensor.parse()?)
            .primary(primary)
            // negative delays from old rows mean "no delay"
            .timer_seconds(u64::try_from(def.timer_seconds).unwrap_or_default());
        if let Some(secondary) = secondary {
            builder = builder.secondary(secondary);
        }
        for condition in conditions {
            builder = builder.condition(condition);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SensorPin;

    fn command(name: &str) -> Command {
        Command::new(name, CommandKind::LightGroup, "1", r#"{"on": true}"#)
    }

    fn command_definition(name: &str, kind: &str) -> CommandDefinition {
        CommandDefinition {
            name: name.to_string(),
            kind: kind.to_string(),
            target: "1".to_string(),
            value: r#"{"on": true}"#.to_string(),
        }
    }

    fn definition() -> RuleDefinition {
        RuleDefinition {
            id: RuleId::new(7),
            node_id: NodeId::new(2),
            name: "Motion lights".to_string(),
            sensor: "motion".to_string(),
            timer_seconds: 300,
            primary: Some(command_definition("Lights on", "hue")),
            secondary: Some(command_definition("Lights off", "hue")),
            conditions: vec![ConditionDefinition {
                rule_id: RuleId::new(7),
                kind: "average".to_string(),
                selector: "LDR".to_string(),
                comparator: "<".to_string(),
                threshold: "20".to_string(),
            }],
        }
    }

    #[test]
    fn should_build_rule_when_required_fields_provided() {
        let rule = Rule::builder()
            .name("Motion lights")
            .sensor(Selector::Class("motion".to_string()))
            .primary(command("on"))
            .build()
            .unwrap();
        assert_eq!(rule.trigger_key(), "motion");
        assert!(rule.conditions.is_empty());
        assert!(rule.delayed().is_none());
    }

    #[test]
    fn should_return_validation_error_when_name_is_empty() {
        let result = Rule::builder()
            .sensor(Selector::Class("motion".to_string()))
            .primary(command("on"))
            .build();
        assert!(matches!(
            result,
            Err(HomeError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_return_validation_error_when_primary_is_missing() {
        let result = Rule::builder()
            .name("No command")
            .sensor(Selector::Class("motion".to_string()))
            .build();
        assert!(matches!(
            result,
            Err(HomeError::Validation(ValidationError::MissingPrimaryCommand))
        ));
    }

    #[test]
    fn should_only_delay_when_timer_and_secondary_present() {
        let without_secondary = Rule::builder()
            .name("r")
            .sensor(Selector::Class("motion".to_string()))
            .primary(command("on"))
            .timer_seconds(60)
            .build()
            .unwrap();
        assert!(without_secondary.delayed().is_none());

        let with_secondary = Rule::builder()
            .name("r")
            .sensor(Selector::Class("motion".to_string()))
            .primary(command("on"))
            .secondary(command("off"))
            .timer_seconds(60)
            .build()
            .unwrap();
        let (delay, cmd) = with_secondary.delayed().unwrap();
        assert_eq!(delay, Duration::from_secs(60));
        assert_eq!(cmd.name, "off");
    }

    #[test]
    fn should_apply_to_matching_readings_only() {
        let rule = Rule::try_from(definition()).unwrap();
        let motion = SensorReading::new("motion1", "motion", SensorPin::Number(17), 1.0);
        let light = SensorReading::new("LDR1", "LDR", SensorPin::Number(0), 12.0);
        assert!(rule.applies_to(&motion));
        assert!(!rule.applies_to(&light));
    }

    #[test]
    fn should_convert_stored_definition() {
        let rule = Rule::try_from(definition()).unwrap();
        assert_eq!(rule.id, RuleId::new(7));
        assert_eq!(rule.node_id, NodeId::new(2));
        assert_eq!(rule.primary.kind, CommandKind::LightGroup);
        assert_eq!(rule.secondary.as_ref().map(|c| c.name.as_str()), Some("Lights off"));
        assert_eq!(rule.conditions.len(), 1);
        assert_eq!(rule.timer_seconds, 300);
    }

    #[test]
    fn should_reject_definition_with_invalid_condition() {
        let mut def = definition();
        def.conditions[0].comparator = "~".to_string();
        let result = Rule::try_from(def);
        assert!(matches!(
            result,
            Err(HomeError::Validation(ValidationError::UnknownComparator(_)))
        ));
    }

    #[test]
    fn should_reject_definition_without_primary_command() {
        let mut def = definition();
        def.primary = None;
        let result = Rule::try_from(def);
        assert!(matches!(
            result,
            Err(HomeError::Validation(ValidationError::MissingPrimaryCommand))
        ));
    }

    #[test]
    fn should_treat_negative_timer_as_no_delay() {
        let mut def = definition();
        def.timer_seconds = -5;
        let rule = Rule::try_from(def).unwrap();
        assert!(rule.delayed().is_none());
    }
}
