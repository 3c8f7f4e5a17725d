//! Correlation table: matches asynchronous responses to their request.
//!
//! Each registered request owns a one-shot slot. The table lock is only
//! held for the insert or remove; waiting happens on the slot itself.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;

use smarthome_domain::id::RequestId;
use smarthome_domain::sensor::SensorReading;
use smarthome_domain::time::{self, Timestamp};

/// The wait for a response expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

/// Handle on a registered request, the only way to receive its response.
#[derive(Debug)]
pub struct PendingRequest {
    request_id: RequestId,
    created_at: Timestamp,
    receiver: oneshot::Receiver<Vec<SensorReading>>,
}

impl PendingRequest {
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }
}

/// Per-node map from request id to pending response slot.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    pending: Mutex<HashMap<RequestId, oneshot::Sender<Vec<SensorReading>>>>,
}

impl CorrelationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, oneshot::Sender<Vec<SensorReading>>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `request_id` and hand out its single receiver.
    ///
    /// Registering an id that is still pending replaces the previous slot;
    /// its waiter sees the request as timed out.
    pub fn register(&self, request_id: RequestId) -> PendingRequest {
        let (sender, receiver) = oneshot::channel();
        if self.lock().insert(request_id.clone(), sender).is_some() {
            tracing::warn!(%request_id, "request id registered twice, previous waiter dropped");
        }
        PendingRequest {
            request_id,
            created_at: time::now(),
            receiver,
        }
    }

    /// Deliver `response` to the waiter of `request_id`.
    ///
    /// Returns `false` when nothing is waiting: the id is unknown, already
    /// resolved, or timed out.
    pub fn resolve(&self, request_id: &RequestId, response: Vec<SensorReading>) -> bool {
        let Some(sender) = self.lock().remove(request_id) else {
            tracing::debug!(%request_id, "discarding stale response");
            return false;
        };
        if sender.send(response).is_err() {
            tracing::debug!(%request_id, "waiter went away before the response arrived");
            return false;
        }
        true
    }

    /// Wait up to `timeout` for the response to `pending`.
    ///
    /// On timeout the entry is removed; a response that raced in between
    /// the deadline and the removal is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`TimedOut`] when no response arrived in time.
    pub async fn wait(
        &self,
        pending: PendingRequest,
        timeout: Duration,
    ) -> Result<Vec<SensorReading>, TimedOut> {
        let PendingRequest {
            request_id,
            created_at,
            mut receiver,
        } = pending;
        match tokio::time::timeout(timeout, &mut receiver).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(TimedOut),
            Err(_) => {
                self.lock().remove(&request_id);
                receiver.try_recv().map_err(|_| {
                    let waited_ms = (time::now() - created_at).num_milliseconds();
                    tracing::debug!(%request_id, waited_ms, "no response before the deadline");
                    TimedOut
                })
            }
        }
    }

    /// Drop `pending` without waiting, e.g. when the request could not be sent.
    pub fn abandon(&self, pending: PendingRequest) {
        self.lock().remove(&pending.request_id);
    }

    /// Number of requests still waiting for a response.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
