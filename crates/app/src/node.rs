//! Runtime topology node: request dispatch, fan-out and inbound handling.
//!
//! A [`Node`] is built from a [`NodeSpec`] and owns its children. Leaf
//! nodes (devices) answer a request by publishing it on the transport and
//! waiting for the correlated response. Composite nodes (home, rooms) fan
//! the request out to all children concurrently and concatenate the
//! results.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinSet;

use smarthome_domain::id::{NodeId, RequestId};
use smarthome_domain::message::{
    self, InterruptMessage, RequestMessage, ResponseMessage, STATUS_REQUEST,
};
use smarthome_domain::rule::Rule;
use smarthome_domain::sensor::SensorReading;
use smarthome_domain::topology::{Level, NodeSpec};

use crate::correlation::{CorrelationTable, TimedOut};
use crate::dispatcher::Dispatch;
use crate::ports::Publisher;
use crate::rule_engine::{RuleEngine, SensorEvent, StatusSource};

/// Result of a request over a subtree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Status {
    pub readings: Vec<SensorReading>,
    /// `false` when at least one device of the subtree did not answer.
    pub complete: bool,
}

impl Status {
    #[must_use]
    pub fn complete(readings: Vec<SensorReading>) -> Self {
        Self {
            readings,
            complete: true,
        }
    }

    #[must_use]
    pub fn unresponsive() -> Self {
        Self {
            readings: Vec::new(),
            complete: false,
        }
    }

    fn merge(&mut self, other: Status) {
        self.readings.extend(other.readings);
        self.complete &= other.complete;
    }
}

type BoxedStatus = Pin<Box<dyn Future<Output = Status> + Send + 'static>>;

/// One element of the live topology tree.
pub struct Node<P, D> {
    id: NodeId,
    name: String,
    level: Level,
    subscribe_topics: Vec<String>,
    publish_topic: String,
    children: Vec<Arc<Node<P, D>>>,
    publisher: Arc<P>,
    correlation: CorrelationTable,
    last_status: RwLock<Option<Vec<SensorReading>>>,
    engine: RuleEngine<D>,
    request_timeout: Duration,
}

impl<P, D> Node<P, D>
where
    P: Publisher,
    D: Dispatch,
{
    /// Build the subtree described by `spec`, attaching the rules keyed by
    /// node id from `rules`.
    pub fn from_spec(
        spec: NodeSpec,
        rules: &mut HashMap<NodeId, Vec<Rule>>,
        publisher: &Arc<P>,
        dispatcher: &Arc<D>,
        request_timeout: Duration,
    ) -> Arc<Self> {
        let children = spec
            .children
            .into_iter()
            .map(|child| Self::from_spec(child, rules, publisher, dispatcher, request_timeout))
            .collect();
        let node_rules = rules.remove(&spec.id).unwrap_or_default();
        Arc::new(Self {
            id: spec.id,
            engine: RuleEngine::new(spec.name.clone(), node_rules, Arc::clone(dispatcher)),
            name: spec.name,
            level: spec.level,
            subscribe_topics: spec.subscribe_topics,
            publish_topic: spec.publish_topic,
            children,
            publisher: Arc::clone(publisher),
            correlation: CorrelationTable::new(),
            last_status: RwLock::new(None),
            request_timeout,
        })
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn subscribe_topics(&self) -> &[String] {
        &self.subscribe_topics
    }

    #[must_use]
    pub fn publish_topic(&self) -> &str {
        &self.publish_topic
    }

    #[must_use]
    pub fn children(&self) -> &[Arc<Node<P, D>>] {
        &self.children
    }

    #[must_use]
    pub fn engine(&self) -> &RuleEngine<D> {
        &self.engine
    }

    #[must_use]
    pub fn correlation(&self) -> &CorrelationTable {
        &self.correlation
    }

    /// Last complete status of this subtree, if any.
    #[must_use]
    pub fn cached_status(&self) -> Option<Vec<SensorReading>> {
        self.last_status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send `request` to this node and everything below it.
    ///
    /// Never fails: devices that do not answer within `timeout` (or that
    /// cannot be reached) contribute nothing and mark the status incomplete.
    pub fn send_request(self: &Arc<Self>, request: &str, timeout: Duration) -> BoxedStatus {
        let node = Arc::clone(self);
        let request = request.to_string();
        if self.level.is_leaf() {
            Box::pin(async move { node.request_device(request, timeout).await })
        } else {
            Box::pin(async move { node.fan_out(request, timeout).await })
        }
    }

    async fn request_device(&self, request: String, timeout: Duration) -> Status {
        let pending = self.correlation.register(RequestId::generate());
        let outbound = RequestMessage {
            request_id: pending.request_id().clone(),
            request,
        };
        let payload = match message::encode(&outbound) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(node = %self.name, error = %err, "unable to encode request");
                self.correlation.abandon(pending);
                return Status::unresponsive();
            }
        };
        if let Err(err) = self.publisher.publish(&self.publish_topic, payload).await {
            tracing::warn!(node = %self.name, topic = %self.publish_topic, error = %err, "device unreachable");
            self.correlation.abandon(pending);
            return Status::unresponsive();
        }
        match self.correlation.wait(pending, timeout).await {
            Ok(readings) => Status::complete(readings),
            Err(TimedOut) => {
                tracing::warn!(node = %self.name, request_id = %outbound.request_id, ?timeout, "device unresponsive");
                Status::unresponsive()
            }
        }
    }

    async fn fan_out(&self, request: String, timeout: Duration) -> Status {
        let mut tasks = JoinSet::new();
        for child in &self.children {
            tasks.spawn(child.send_request(&request, timeout));
        }
        let mut status = Status::complete(Vec::new());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(child) => status.merge(child),
                Err(err) => {
                    tracing::error!(node = %self.name, error = %err, "child request task failed");
                    status.complete = false;
                }
            }
        }
        status
    }

    /// Current status of the subtree, falling back to the last complete
    /// one when some device did not answer.
    pub async fn status_snapshot(self: &Arc<Self>) -> Vec<SensorReading> {
        let status = self
            .send_request(STATUS_REQUEST, self.request_timeout)
            .await;
        if status.complete {
            *self
                .last_status
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(status.readings.clone());
            return status.readings;
        }
        match self.cached_status() {
            Some(cached) => {
                tracing::info!(node = %self.name, "incomplete status, using last known one");
                cached
            }
            None => status.readings,
        }
    }

    /// Resolve a pending request from a response payload.
    pub fn on_response(&self, payload: &[u8]) {
        match message::decode::<ResponseMessage>(payload) {
            Ok(response) => {
                self.correlation
                    .resolve(&response.request_id, response.response);
            }
            Err(err) => {
                tracing::warn!(node = %self.name, error = %err, "dropping malformed response");
            }
        }
    }

    /// Answer a request addressed to this (composite) node, then run the
    /// node's rules against the resulting snapshot.
    pub async fn on_request(self: &Arc<Self>, payload: &[u8]) {
        if self.level.is_leaf() {
            tracing::debug!(node = %self.name, "devices do not serve requests");
            return;
        }
        let request = match message::decode::<RequestMessage>(payload) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(node = %self.name, error = %err, "dropping malformed request");
                return;
            }
        };
        tracing::info!(node = %self.name, request_id = %request.request_id, request = %request.request, "serving request");

        let readings = if request.request == STATUS_REQUEST {
            self.status_snapshot().await
        } else {
            self.send_request(&request.request, self.request_timeout)
                .await
                .readings
        };

        let response = ResponseMessage {
            request_id: request.request_id,
            response: readings,
            thing_id: None,
        };
        match message::encode(&response) {
            Ok(payload) => {
                if let Err(err) = self.publisher.publish(&self.publish_topic, payload).await {
                    tracing::warn!(node = %self.name, error = %err, "unable to publish response");
                }
            }
            Err(err) => tracing::error!(node = %self.name, error = %err, "unable to encode response"),
        }

        self.engine
            .on_event(self, SensorEvent::Request(response.response))
            .await;
    }

    /// Feed a device interrupt to the node's rules.
    pub async fn on_interrupt(self: &Arc<Self>, payload: &[u8]) {
        let interrupt = match message::decode::<InterruptMessage>(payload) {
            Ok(interrupt) => interrupt,
            Err(err) => {
                tracing::warn!(node = %self.name, error = %err, "dropping malformed interrupt");
                return;
            }
        };
        tracing::info!(
            node = %self.name,
            device = interrupt.thing_name.as_deref().unwrap_or("unknown"),
            sensor = %interrupt.interrupt.sensor_name,
            value = interrupt.interrupt.value,
            "interrupt received"
        );
        self.engine
            .on_event(self, SensorEvent::Interrupt(interrupt.interrupt))
            .await;
    }
}

impl<P, D> StatusSource for Arc<Node<P, D>>
where
    P: Publisher,
    D: Dispatch,
{
    fn level(&self) -> Level {
        self.level
    }

    fn snapshot(&self) -> impl Future<Output = Vec<SensorReading>> + Send {
        self.status_snapshot()
    }
}
