//! Hub: owns the live topology and routes inbound transport messages.
//!
//! Every message goes to each node with a subscription filter matching its
//! topic. Responses are resolved inline; requests and interrupts are handled
//! on spawned tasks so the transport is never blocked.

use std::sync::Arc;

use smarthome_domain::id::NodeId;
use smarthome_domain::topic::{self, MessageKind};

use crate::dispatcher::Dispatch;
use crate::node::Node;
use crate::ports::{InboundHandler, Publisher};

/// The root node plus a flat index of every node under it.
pub struct Hub<P, D> {
    root: Arc<Node<P, D>>,
    nodes: Vec<Arc<Node<P, D>>>,
}

impl<P, D> Hub<P, D>
where
    P: Publisher,
    D: Dispatch,
{
    pub fn new(root: Arc<Node<P, D>>) -> Self {
        let mut nodes = Vec::new();
        let mut stack = vec![Arc::clone(&root)];
        while let Some(node) = stack.pop() {
            stack.extend(node.children().iter().rev().cloned());
            nodes.push(node);
        }
        Self { root, nodes }
    }

    #[must_use]
    pub fn root(&self) -> &Arc<Node<P, D>> {
        &self.root
    }

    /// Every node, depth first from the root.
    #[must_use]
    pub fn nodes(&self) -> &[Arc<Node<P, D>>] {
        &self.nodes
    }

    #[must_use]
    pub fn find(&self, id: NodeId) -> Option<&Arc<Node<P, D>>> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    /// Distinct topic filters the transport must subscribe to.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        let mut filters: Vec<String> = Vec::new();
        for node in &self.nodes {
            for filter in node.subscribe_topics() {
                if !filters.contains(filter) {
                    filters.push(filter.clone());
                }
            }
        }
        filters
    }

    /// Deliver one message; returns how many nodes it was routed to.
    ///
    /// Must be called from within a tokio runtime.
    pub fn route(&self, topic: &str, payload: &[u8]) -> usize {
        let Some(kind) = MessageKind::from_topic(topic) else {
            tracing::debug!(topic, "ignoring message outside the topic taxonomy");
            return 0;
        };

        let mut routed = 0;
        for node in &self.nodes {
            if !node
                .subscribe_topics()
                .iter()
                .any(|filter| topic::matches(filter, topic))
            {
                continue;
            }
            routed += 1;
            match kind {
                MessageKind::Response => node.on_response(payload),
                MessageKind::Request => {
                    let node = Arc::clone(node);
                    let payload = payload.to_vec();
                    tokio::spawn(async move { node.on_request(&payload).await });
                }
                MessageKind::Interrupt => {
                    let node = Arc::clone(node);
                    let payload = payload.to_vec();
                    tokio::spawn(async move { node.on_interrupt(&payload).await });
                }
            }
        }

        if routed == 0 {
            tracing::debug!(topic, "no node subscribed to topic");
        }
        routed
    }

    /// Cancel every pending debounce timer in the tree.
    pub fn shutdown(&self) {
        for node in &self.nodes {
            node.engine().shutdown();
        }
    }
}

impl<P, D> InboundHandler for Hub<P, D>
where
    P: Publisher,
    D: Dispatch,
{
    fn handle(&self, topic: &str, payload: &[u8]) {
        self.route(topic, payload);
    }
}
