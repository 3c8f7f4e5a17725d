//! `SQLite` implementation of [`RuleStore`].
//!
//! Rules reference their commands by id; conditions reference their rule.
//! Everything is read back as raw definitions and validated by the loader.

use std::collections::HashMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::ports::RuleStore;
use smarthome_domain::error::HomeError;
use smarthome_domain::id::{NodeId, RuleId};
use smarthome_domain::rule::{CommandDefinition, ConditionDefinition, RuleDefinition};

use crate::error::StorageError;

const RULES_QUERY: &str = "\
SELECT r.id, r.node_id, r.name, r.sensor, r.timer_seconds,
       p.name AS primary_name, p.kind AS primary_kind,
       p.target AS primary_target, p.value AS primary_value,
       s.name AS secondary_name, s.kind AS secondary_kind,
       s.target AS secondary_target, s.value AS secondary_value
FROM rules r
LEFT JOIN commands p ON p.id = r.primary_command_id
LEFT JOIN commands s ON s.id = r.secondary_command_id
WHERE r.node_id = ?
ORDER BY r.id";

const CONDITIONS_QUERY: &str = "\
SELECT c.rule_id, c.kind, c.selector, c.comparator, c.threshold
FROM conditions c
JOIN rules r ON r.id = c.rule_id
WHERE r.node_id = ?
ORDER BY c.id";

struct RuleRow(RuleDefinition);

/// Read the joined command columns sharing `prefix`, `None` when no
/// command is attached.
fn command(row: &SqliteRow, prefix: &str) -> Result<Option<CommandDefinition>, sqlx::Error> {
    let name: Option<String> = row.try_get(format!("{prefix}_name").as_str())?;
    let Some(name) = name else {
        return Ok(None);
    };
    Ok(Some(CommandDefinition {
        name,
        kind: row.try_get(format!("{prefix}_kind").as_str())?,
        target: row.try_get(format!("{prefix}_target").as_str())?,
        value: row.try_get(format!("{prefix}_value").as_str())?,
    }))
}

impl<'r> FromRow<'r, SqliteRow> for RuleRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(RuleDefinition {
            id: RuleId::new(row.try_get("id")?),
            node_id: NodeId::new(row.try_get("node_id")?),
            name: row.try_get("name")?,
            sensor: row.try_get("sensor")?,
            timer_seconds: row.try_get("timer_seconds")?,
            primary: command(row, "primary")?,
            secondary: command(row, "secondary")?,
            conditions: Vec::new(),
        }))
    }
}

struct ConditionRow(ConditionDefinition);

impl<'r> FromRow<'r, SqliteRow> for ConditionRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(ConditionDefinition {
            rule_id: RuleId::new(row.try_get("rule_id")?),
            kind: row.try_get("kind")?,
            selector: row.try_get("selector")?,
            comparator: row.try_get("comparator")?,
            threshold: row.try_get("threshold")?,
        }))
    }
}

/// `SQLite`-backed rule store.
pub struct SqliteRuleStore {
    pool: SqlitePool,
}

impl SqliteRuleStore {
    /// Create a new store backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RuleStore for SqliteRuleStore {
    async fn rules_for(&self, node: NodeId) -> Result<Vec<RuleDefinition>, HomeError> {
        let rules: Vec<RuleRow> = sqlx::query_as(RULES_QUERY)
            .bind(node.get())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        let conditions: Vec<ConditionRow> = sqlx::query_as(CONDITIONS_QUERY)
            .bind(node.get())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let mut by_rule: HashMap<RuleId, Vec<ConditionDefinition>> = HashMap::new();
        for ConditionRow(condition) in conditions {
            by_rule.entry(condition.rule_id).or_default().push(condition);
        }

        Ok(rules
            .into_iter()
            .map(|RuleRow(mut rule)| {
                rule.conditions = by_rule.remove(&rule.id).unwrap_or_default();
                rule
            })
            .collect())
    }
}
