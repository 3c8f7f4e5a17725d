//! Topology: the Home → Room → Device tree.
//!
//! [`NodeRecord`]s are flat rows from the store. [`NodeSpec::assemble`]
//! turns them into a validated tree, deriving transport topics from the
//! taxonomy in [`crate::topic`] wherever the store leaves them blank.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HomeError, NotFoundError, ValidationError};
use crate::id::NodeId;
use crate::topic::{self, MessageKind};

/// Position of a node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Home,
    Room,
    Device,
}

impl Level {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Room => "room",
            Self::Device => "device",
        }
    }

    /// Leaves publish requests and wait; every other level aggregates.
    #[must_use]
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::Device)
    }

    fn child_level(self) -> Option<Self> {
        match self {
            Self::Home => Some(Self::Room),
            Self::Room => Some(Self::Device),
            Self::Device => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ValidationError;

    /// Accepts names as well as the legacy numeric levels `1`, `2`, `3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" | "1" => Ok(Self::Home),
            "room" | "2" => Ok(Self::Room),
            "device" | "thing" | "3" => Ok(Self::Device),
            other => Err(ValidationError::UnknownLevel(other.to_string())),
        }
    }
}

/// One topology row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub level: String,
    pub name: String,
    pub subscribe_topics: Option<Vec<String>>,
    pub publish_topic: Option<String>,
}

/// Immutable description of a node and its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub id: NodeId,
    pub name: String,
    pub level: Level,
    pub subscribe_topics: Vec<String>,
    pub publish_topic: String,
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    /// Build the tree rooted at `root` from flat store rows.
    ///
    /// Children keep the order in which their rows were returned.
    ///
    /// # Errors
    ///
    /// Returns [`HomeError::NotFound`] when `root` is not among `records`,
    /// and [`HomeError::Validation`] for unknown levels, empty names, levels
    /// nested out of order, or rows whose parent does not exist.
    pub fn assemble(records: Vec<NodeRecord>, root: NodeId) -> Result<Self, HomeError> {
        let known: HashSet<NodeId> = records.iter().map(|r| r.id).collect();
        let mut by_parent: HashMap<Option<NodeId>, Vec<NodeRecord>> = HashMap::new();
        for record in records {
            if let Some(parent) = record.parent_id {
                if !known.contains(&parent) {
                    return Err(ValidationError::OrphanNode {
                        node: record.id.to_string(),
                        parent: parent.to_string(),
                    }
                    .into());
                }
            }
            by_parent.entry(record.parent_id).or_default().push(record);
        }

        let root_record = by_parent
            .values_mut()
            .find_map(|siblings| {
                let pos = siblings.iter().position(|r| r.id == root)?;
                Some(siblings.remove(pos))
            })
            .ok_or_else(|| NotFoundError {
                entity: "Node",
                id: root.to_string(),
            })?;

        build(root_record, None, &mut by_parent)
    }

    /// Depth-first iterator over this node and all descendants.
    pub fn walk(&self) -> impl Iterator<Item = &NodeSpec> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

fn build(
    record: NodeRecord,
    room_slug: Option<&str>,
    by_parent: &mut HashMap<Option<NodeId>, Vec<NodeRecord>>,
) -> Result<NodeSpec, HomeError> {
    let level: Level = record.level.parse()?;
    if record.name.trim().is_empty() {
        return Err(ValidationError::EmptyName.into());
    }

    let own_slug = topic::slug(&record.name);
    let (default_subscribe, default_publish) = default_topics(level, room_slug, &own_slug);
    let subscribe_topics = record
        .subscribe_topics
        .filter(|topics| !topics.is_empty())
        .unwrap_or(default_subscribe);
    let publish_topic = record
        .publish_topic
        .filter(|t| !t.is_empty())
        .unwrap_or(default_publish);

    let child_room_slug = match level {
        Level::Room => Some(own_slug.as_str()),
        _ => room_slug,
    };
    let mut children = Vec::new();
    for child in by_parent.remove(&Some(record.id)).unwrap_or_default() {
        let child_spec = build(child, child_room_slug, by_parent)?;
        if level.child_level() != Some(child_spec.level) {
            return Err(ValidationError::InvalidNesting {
                parent: level.as_str(),
                child: child_spec.level.as_str(),
            }
            .into());
        }
        children.push(child_spec);
    }

    Ok(NodeSpec {
        id: record.id,
        name: record.name,
        level,
        subscribe_topics,
        publish_topic,
        children,
    })
}

fn default_topics(level: Level, room: Option<&str>, own: &str) -> (Vec<String>, String) {
    match level {
        Level::Home => (
            vec![topic::home(MessageKind::Request)],
            topic::home(MessageKind::Response),
        ),
        Level::Room => (
            vec![
                topic::room(own, MessageKind::Request),
                topic::room(own, MessageKind::Interrupt),
                topic::room_device_interrupts(own),
            ],
            topic::room(own, MessageKind::Response),
        ),
        Level::Device => {
            let room = room.unwrap_or("unassigned");
            (
                vec![topic::device(room, own, MessageKind::Response)],
                topic::device(room, own, MessageKind::Request),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, parent: Option<i64>, level: &str, name: &str) -> NodeRecord {
        NodeRecord {
            id: NodeId::new(id),
            parent_id: parent.map(NodeId::new),
            level: level.to_string(),
            name: name.to_string(),
            subscribe_topics: None,
            publish_topic: None,
        }
    }

    fn house() -> Vec<NodeRecord> {
        vec![
            record(1, None, "home", "Home"),
            record(2, Some(1), "room", "Kitchen"),
            record(3, Some(2), "device", "Front Door"),
            record(4, Some(2), "device", "Window"),
            record(5, Some(1), "room", "Garage"),
        ]
    }

    #[test]
    fn should_parse_named_and_numeric_levels() {
        assert_eq!("Home".parse::<Level>().unwrap(), Level::Home);
        assert_eq!("2".parse::<Level>().unwrap(), Level::Room);
        assert_eq!("thing".parse::<Level>().unwrap(), Level::Device);
        assert!("floor".parse::<Level>().is_err());
    }

    #[test]
    fn should_assemble_tree_in_row_order() {
        let tree = NodeSpec::assemble(house(), NodeId::new(1)).unwrap();
        assert_eq!(tree.level, Level::Home);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].name, "Kitchen");
        let names: Vec<_> = tree.children[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Front Door", "Window"]);
        assert!(tree.children[1].children.is_empty());
    }

    #[test]
    fn should_derive_topics_from_taxonomy() {
        let tree = NodeSpec::assemble(house(), NodeId::new(1)).unwrap();
        assert_eq!(tree.subscribe_topics, ["home/requests"]);
        assert_eq!(tree.publish_topic, "home/response");

        let kitchen = &tree.children[0];
        assert_eq!(kitchen.publish_topic, "home/rooms/kitchen/response");
        assert!(kitchen
            .subscribe_topics
            .contains(&"home/rooms/kitchen/things/+/interrupt".to_string()));

        let door = &kitchen.children[0];
        assert_eq!(
            door.subscribe_topics,
            ["home/rooms/kitchen/things/front_door/response"]
        );
        assert_eq!(
            door.publish_topic,
            "home/rooms/kitchen/things/front_door/requests"
        );
    }

    #[test]
    fn should_keep_explicit_topics_from_store() {
        let mut records = house();
        records[2].subscribe_topics = Some(vec!["custom/door/response".to_string()]);
        records[2].publish_topic = Some("custom/door/requests".to_string());
        let tree = NodeSpec::assemble(records, NodeId::new(1)).unwrap();
        let door = &tree.children[0].children[0];
        assert_eq!(door.subscribe_topics, ["custom/door/response"]);
        assert_eq!(door.publish_topic, "custom/door/requests");
    }

    #[test]
    fn should_assemble_subtree_from_non_root_record() {
        let tree = NodeSpec::assemble(house(), NodeId::new(2)).unwrap();
        assert_eq!(tree.level, Level::Room);
        assert_eq!(tree.children.len(), 2);
    }

    #[test]
    fn should_return_not_found_when_root_missing() {
        let result = NodeSpec::assemble(house(), NodeId::new(99));
        assert!(matches!(result, Err(HomeError::NotFound(_))));
    }

    #[test]
    fn should_reject_orphan_rows() {
        let mut records = house();
        records.push(record(6, Some(42), "device", "Lost"));
        let result = NodeSpec::assemble(records, NodeId::new(1));
        assert!(matches!(
            result,
            Err(HomeError::Validation(ValidationError::OrphanNode { .. }))
        ));
    }

    #[test]
    fn should_reject_device_directly_under_home() {
        let records = vec![
            record(1, None, "home", "Home"),
            record(2, Some(1), "device", "Doorbell"),
        ];
        let result = NodeSpec::assemble(records, NodeId::new(1));
        assert!(matches!(
            result,
            Err(HomeError::Validation(ValidationError::InvalidNesting { .. }))
        ));
    }

    #[test]
    fn should_walk_every_node_depth_first() {
        let tree = NodeSpec::assemble(house(), NodeId::new(1)).unwrap();
        let ids: Vec<i64> = tree.walk().map(|n| n.id.get()).collect();
        assert_eq!(ids, [1, 2, 3, 4, 5]);
    }
}
