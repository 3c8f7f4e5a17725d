//! Rule engine: reacts to sensor events by evaluating a node's rules.
//!
//! For each event the engine selects the rules whose sensor selector
//! matches, evaluates every condition of a rule concurrently against the
//! node's status snapshot, and fires the rules whose conditions all hold.
//! Firing dispatches the primary command right away and (re-)arms the
//! debounced secondary command on the rule's trigger key.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;

use smarthome_domain::rule::Rule;
use smarthome_domain::sensor::SensorReading;
use smarthome_domain::topology::Level;

use crate::debounce::DebounceScheduler;
use crate::dispatcher::Dispatch;

/// Where the engine gets the current status of the node it serves.
pub trait StatusSource: Send + Sync {
    fn level(&self) -> Level;

    /// Fresh status of the subtree, or the last complete one when some
    /// device did not answer.
    fn snapshot(&self) -> impl Future<Output = Vec<SensorReading>> + Send;
}

/// What woke the engine up.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    /// A device pushed a reading on its own.
    Interrupt(SensorReading),
    /// A request was answered; carries the resulting snapshot.
    Request(Vec<SensorReading>),
}

/// The rules of one node together with their debounce timers.
pub struct RuleEngine<D> {
    node: String,
    rules: Vec<Arc<Rule>>,
    dispatcher: Arc<D>,
    scheduler: DebounceScheduler<D>,
}

impl<D: Dispatch> RuleEngine<D> {
    pub fn new(node: impl Into<String>, rules: Vec<Rule>, dispatcher: Arc<D>) -> Self {
        Self {
            node: node.into(),
            rules: rules.into_iter().map(Arc::new).collect(),
            scheduler: DebounceScheduler::new(Arc::clone(&dispatcher)),
            dispatcher,
        }
    }

    #[must_use]
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    #[must_use]
    pub fn scheduler(&self) -> &DebounceScheduler<D> {
        &self.scheduler
    }

    /// Handle one sensor event and return the names of the rules that fired.
    ///
    /// Interrupts only drive rules on room nodes. Each rule is evaluated on
    /// its own: a failing condition in one rule never affects another.
    pub async fn on_event<S: StatusSource>(&self, source: &S, event: SensorEvent) -> Vec<String> {
        if self.rules.is_empty() {
            return Vec::new();
        }

        let (applicable, snapshot): (Vec<Arc<Rule>>, Vec<SensorReading>) = match event {
            SensorEvent::Interrupt(reading) => {
                if source.level() != Level::Room {
                    tracing::debug!(node = %self.node, level = %source.level(), "ignoring interrupt outside a room");
                    return Vec::new();
                }
                let applicable = self.matching(|rule| rule.applies_to(&reading));
                if applicable.is_empty() {
                    return Vec::new();
                }
                (applicable, source.snapshot().await)
            }
            SensorEvent::Request(snapshot) => {
                let applicable =
                    self.matching(|rule| snapshot.iter().any(|reading| rule.applies_to(reading)));
                (applicable, snapshot)
            }
        };

        let snapshot: Arc<[SensorReading]> = snapshot.into();
        let mut dispatches = JoinSet::new();
        let mut fired = Vec::new();
        for rule in applicable {
            if check_conditions(&rule, Arc::clone(&snapshot)).await {
                self.fire(&rule, &mut dispatches);
                fired.push(rule.name.clone());
            } else {
                tracing::debug!(node = %self.node, rule = %rule.name, "conditions not met");
            }
        }
        while let Some(joined) = dispatches.join_next().await {
            if let Err(err) = joined {
                tracing::error!(node = %self.node, error = %err, "primary command dispatch failed");
            }
        }
        fired
    }

    fn matching(&self, predicate: impl Fn(&Rule) -> bool) -> Vec<Arc<Rule>> {
        self.rules
            .iter()
            .filter(|rule| predicate(rule))
            .cloned()
            .collect()
    }

    /// (Re-)arm the secondary command, then dispatch the primary one on its
    /// own task in `dispatches`.
    fn fire(&self, rule: &Arc<Rule>, dispatches: &mut JoinSet<()>) {
        tracing::info!(node = %self.node, rule = %rule.name, key = rule.trigger_key(), "rule fired");
        match rule.delayed() {
            Some((delay, secondary)) => {
                self.scheduler
                    .arm(rule.trigger_key(), delay, secondary.clone());
            }
            None => {
                self.scheduler.cancel(rule.trigger_key());
            }
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let node = self.node.clone();
        let rule = Arc::clone(rule);
        dispatches.spawn(async move {
            let outcome = dispatcher.dispatch(&rule.primary).await;
            tracing::debug!(%node, rule = %rule.name, ?outcome, "primary command dispatched");
        });
    }

    /// Cancel every pending debounce timer.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}

/// Evaluate every condition of `rule` concurrently and AND the results.
///
/// All conditions run to completion. A condition that panics counts as
/// not satisfied. A rule without conditions is always satisfied.
pub async fn check_conditions(rule: &Rule, snapshot: Arc<[SensorReading]>) -> bool {
    let mut tasks = JoinSet::new();
    for condition in rule.conditions.iter().cloned() {
        let snapshot = Arc::clone(&snapshot);
        tasks.spawn(async move { condition.evaluate(&snapshot) });
    }

    let mut satisfied = true;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(passed) => satisfied &= passed,
            Err(err) => {
                tracing::error!(rule = %rule.name, error = %err, "condition evaluation failed");
                satisfied = false;
            }
        }
    }
    satisfied
}
