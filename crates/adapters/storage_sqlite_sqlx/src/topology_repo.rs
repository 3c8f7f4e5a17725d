//! `SQLite` implementation of [`TopologyStore`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use smarthome_app::ports::TopologyStore;
use smarthome_domain::error::HomeError;
use smarthome_domain::id::NodeId;
use smarthome_domain::topology::NodeRecord;

use crate::error::StorageError;

struct Wrapper(NodeRecord);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let parent_id: Option<i64> = row.try_get("parent_id")?;
        let level: String = row.try_get("level")?;
        let name: String = row.try_get("name")?;
        let subscribe_json: Option<String> = row.try_get("subscribe_topics")?;
        let publish_topic: Option<String> = row.try_get("publish_topic")?;

        let subscribe_topics = subscribe_json
            .filter(|json| !json.trim().is_empty())
            .map(|json| {
                serde_json::from_str::<Vec<String>>(&json)
                    .map_err(|err| sqlx::Error::Decode(Box::new(err)))
            })
            .transpose()?;

        Ok(Self(NodeRecord {
            id: NodeId::new(id),
            parent_id: parent_id.map(NodeId::new),
            level,
            name,
            subscribe_topics,
            publish_topic,
        }))
    }
}

/// `SQLite`-backed topology store.
pub struct SqliteTopologyStore {
    pool: SqlitePool,
}

impl SqliteTopologyStore {
    /// Create a new store backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TopologyStore for SqliteTopologyStore {
    async fn nodes(&self) -> Result<Vec<NodeRecord>, HomeError> {
        let rows: Vec<Wrapper> = sqlx::query_as(
            "SELECT id, parent_id, level, name, subscribe_topics, publish_topic FROM nodes ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
