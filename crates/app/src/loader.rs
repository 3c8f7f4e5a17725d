//! Loader: builds the runtime tree from the store at startup.
//!
//! Topology problems are fatal. A rule that fails validation is logged and
//! left out; the remaining rules still load.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use smarthome_domain::error::HomeError;
use smarthome_domain::id::NodeId;
use smarthome_domain::rule::Rule;
use smarthome_domain::topology::NodeSpec;

use crate::dispatcher::Dispatch;
use crate::hub::Hub;
use crate::node::Node;
use crate::ports::{Publisher, RuleStore, TopologyStore};

/// Validated topology and rules, ready to be wired to a transport.
#[derive(Debug)]
pub struct Blueprint {
    pub tree: NodeSpec,
    pub rules: HashMap<NodeId, Vec<Rule>>,
    /// Rules left out because their definition was invalid.
    pub rejected: usize,
}

impl Blueprint {
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    /// Instantiate the live tree and wrap it in a [`Hub`].
    pub fn into_hub<P, D>(
        self,
        publisher: &Arc<P>,
        dispatcher: &Arc<D>,
        request_timeout: Duration,
    ) -> Hub<P, D>
    where
        P: Publisher,
        D: Dispatch,
    {
        let mut rules = self.rules;
        let root = Node::from_spec(self.tree, &mut rules, publisher, dispatcher, request_timeout);
        Hub::new(root)
    }
}

/// Load the tree rooted at `root` and the rules of every node in it.
///
/// # Errors
///
/// Returns an error when the store fails or the topology is invalid.
pub async fn load<T, R>(topology: &T, rule_store: &R, root: NodeId) -> Result<Blueprint, HomeError>
where
    T: TopologyStore,
    R: RuleStore,
{
    let records = topology.nodes().await?;
    let tree = NodeSpec::assemble(records, root)?;

    let mut rules: HashMap<NodeId, Vec<Rule>> = HashMap::new();
    let mut rejected = 0;
    for node in tree.walk() {
        for definition in rule_store.rules_for(node.id).await? {
            let rule_id = definition.id;
            let rule_name = definition.name.clone();
            match Rule::try_from(definition) {
                Ok(rule) => rules.entry(node.id).or_default().push(rule),
                Err(err) => {
                    tracing::warn!(node = %node.name, rule_id = %rule_id, rule = %rule_name, error = %err, "rule excluded");
                    rejected += 1;
                }
            }
        }
    }

    tracing::info!(
        root = %tree.name,
        nodes = tree.walk().count(),
        rules = rules.values().map(Vec::len).sum::<usize>(),
        rejected,
        "topology loaded"
    );
    Ok(Blueprint {
        tree,
        rules,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SpyDispatcher, SpyPublisher};
    use smarthome_domain::error::ValidationError;
    use smarthome_domain::id::RuleId;
    use smarthome_domain::rule::{CommandDefinition, ConditionDefinition, RuleDefinition};
    use smarthome_domain::topology::NodeRecord;
    use std::future::Future;

    struct InMemoryStore {
        nodes: Vec<NodeRecord>,
        rules: Vec<RuleDefinition>,
    }

    impl TopologyStore for InMemoryStore {
        fn nodes(&self) -> impl Future<Output = Result<Vec<NodeRecord>, HomeError>> + Send {
            let nodes = self.nodes.clone();
            async { Ok(nodes) }
        }
    }

    impl RuleStore for InMemoryStore {
        fn rules_for(
            &self,
            node: NodeId,
        ) -> impl Future<Output = Result<Vec<RuleDefinition>, HomeError>> + Send {
            let rules: Vec<_> = self
                .rules
                .iter()
                .filter(|r| r.node_id == node)
                .cloned()
                .collect();
            async { Ok(rules) }
        }
    }

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

    fn rule(id: i64, node: i64, comparator: &str) -> RuleDefinition {
        RuleDefinition {
            id: RuleId::new(id),
            node_id: NodeId::new(node),
            name: format!("rule {id}"),
            sensor: "motion".to_string(),
            timer_seconds: 0,
            primary: Some(CommandDefinition {
                name: "on".to_string(),
                kind: "hue".to_string(),
                target: "1".to_string(),
                value: "{'on': true}".to_string(),
            }),
            secondary: None,
            conditions: vec![ConditionDefinition {
                rule_id: RuleId::new(id),
                kind: "sum".to_string(),
                selector: "LDR".to_string(),
                comparator: comparator.to_string(),
                threshold: "50".to_string(),
            }],
        }
    }

    fn store() -> InMemoryStore {
        InMemoryStore {
            nodes: vec![
                record(1, None, "1", "Home"),
                record(2, Some(1), "2", "Kitchen"),
                record(3, Some(2), "3", "Front Door"),
            ],
            rules: vec![rule(1, 2, ">"), rule(2, 2, "=>"), rule(3, 1, "<")],
        }
    }

    #[tokio::test]
    async fn should_load_valid_rules_and_exclude_invalid_ones() {
        let store = store();

        let blueprint = load(&store, &store, NodeId::new(1)).await.unwrap();

        assert_eq!(blueprint.rejected, 1);
        assert_eq!(blueprint.rule_count(), 2);
        let kitchen: Vec<_> = blueprint.rules[&NodeId::new(2)]
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(kitchen, [RuleId::new(1)]);
    }

    #[tokio::test]
    async fn should_fail_when_root_is_unknown() {
        let store = store();

        let result = load(&store, &store, NodeId::new(9)).await;

        assert!(matches!(result, Err(HomeError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_fail_on_invalid_topology() {
        let mut store = store();
        store.nodes.push(record(4, Some(3), "room", "Closet"));

        let result = load(&store, &store, NodeId::new(1)).await;

        assert!(matches!(
            result,
            Err(HomeError::Validation(ValidationError::InvalidNesting { .. }))
        ));
    }

    #[tokio::test]
    async fn should_wire_rules_to_their_nodes() {
        let store = store();
        let blueprint = load(&store, &store, NodeId::new(1)).await.unwrap();

        let hub = blueprint.into_hub(
            &Arc::new(SpyPublisher::default()),
            &Arc::new(SpyDispatcher::default()),
            Duration::from_secs(5),
        );

        let kitchen = hub.find(NodeId::new(2)).unwrap();
        assert_eq!(kitchen.engine().rules().len(), 1);
        assert_eq!(hub.root().engine().rules().len(), 1);
        assert!(hub.find(NodeId::new(3)).unwrap().engine().rules().is_empty());
    }
}
