//! Store ports: read-only access to topology and rule definitions.

use std::future::Future;

use smarthome_domain::error::HomeError;
use smarthome_domain::id::NodeId;
use smarthome_domain::rule::RuleDefinition;
use smarthome_domain::topology::NodeRecord;

/// Source of topology rows.
pub trait TopologyStore: Send + Sync {
    /// Every node row, parents and children in insertion order.
    fn nodes(&self) -> impl Future<Output = Result<Vec<NodeRecord>, HomeError>> + Send;
}

/// Source of rule definitions.
pub trait RuleStore: Send + Sync {
    /// Rules attached to `node`, with commands and conditions joined in.
    fn rules_for(
        &self,
        node: NodeId,
    ) -> impl Future<Output = Result<Vec<RuleDefinition>, HomeError>> + Send;
}
