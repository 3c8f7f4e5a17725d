//! In-memory fakes shared by the unit tests of this crate.

use std::future::Future;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio::time::Instant;

use smarthome_domain::error::HomeError;
use smarthome_domain::rule::Command;

use crate::dispatcher::{Dispatch, DispatchOutcome};
use crate::ports::Publisher;

// ── Spy publisher ──────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct SpyPublisher {
    pub(crate) published: Mutex<Vec<(String, String)>>,
    forward: Option<mpsc::UnboundedSender<(String, String)>>,
    fail: bool,
}

impl SpyPublisher {
    /// A publisher that also forwards every message to the returned receiver.
    pub(crate) fn with_channel() -> (Self, mpsc::UnboundedReceiver<(String, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let spy = Self {
            forward: Some(tx),
            ..Self::default()
        };
        (spy, rx)
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn topics(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }
}

impl Publisher for SpyPublisher {
    fn publish(
        &self,
        topic: &str,
        payload: String,
    ) -> impl Future<Output = Result<(), HomeError>> + Send {
        let result = if self.fail {
            Err(HomeError::Transport("broker unreachable".into()))
        } else {
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.clone()));
            if let Some(forward) = &self.forward {
                let _ = forward.send((topic.to_string(), payload));
            }
            Ok(())
        };
        async { result }
    }
}

// ── Spy dispatcher ─────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct SpyDispatcher {
    pub(crate) dispatched: Mutex<Vec<(String, Instant)>>,
}

impl SpyDispatcher {
    pub(crate) fn names(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl Dispatch for SpyDispatcher {
    fn dispatch(&self, command: &Command) -> impl Future<Output = DispatchOutcome> + Send {
        self.dispatched
            .lock()
            .unwrap()
            .push((command.name.clone(), Instant::now()));
        async { DispatchOutcome::Delivered }
    }
}
