//! Debounce scheduler: one delayed command per trigger key.
//!
//! Arming a key that already has a timer cancels the old timer and starts
//! a fresh delay, so the command only runs once triggers stop for the whole
//! delay. A timer claims its slot under the slot lock before dispatching;
//! a cancel that finds the slot already claimed is a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use smarthome_domain::rule::Command;
use smarthome_domain::time::{self, Timestamp};

use crate::dispatcher::Dispatch;

struct Slot {
    generation: u64,
    scheduled_at: Timestamp,
    command: String,
    handle: JoinHandle<()>,
}

type Slots = Arc<Mutex<HashMap<String, Slot>>>;

fn lock(slots: &Mutex<HashMap<String, Slot>>) -> MutexGuard<'_, HashMap<String, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-key cancel-and-replace timers dispatching through `D`.
pub struct DebounceScheduler<D> {
    slots: Slots,
    next_generation: AtomicU64,
    dispatcher: Arc<D>,
}

impl<D: Dispatch> DebounceScheduler<D> {
    pub fn new(dispatcher: Arc<D>) -> Self {
        Self {
            slots: Arc::default(),
            next_generation: AtomicU64::new(0),
            dispatcher,
        }
    }

    /// Dispatch `command` after `delay`, replacing any timer armed for `key`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&self, key: &str, delay: Duration, command: Command) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut slots = lock(&self.slots);
        if let Some(previous) = slots.remove(key) {
            previous.handle.abort();
            let armed_ms = (time::now() - previous.scheduled_at).num_milliseconds();
            tracing::debug!(key, command = %previous.command, armed_ms, "re-arming debounce timer");
        }

        let task_slots = Arc::clone(&self.slots);
        let dispatcher = Arc::clone(&self.dispatcher);
        let task_key = key.to_string();
        let command_name = command.name.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let claimed = {
                let mut slots = lock(&task_slots);
                match slots.get(&task_key) {
                    Some(slot) if slot.generation == generation => {
                        slots.remove(&task_key);
                        true
                    }
                    _ => false,
                }
            };
            if !claimed {
                return;
            }
            tracing::info!(key = %task_key, command = %command.name, "debounce timer fired");
            dispatcher.dispatch(&command).await;
        });

        slots.insert(
            key.to_string(),
            Slot {
                generation,
                scheduled_at: time::now(),
                command: command_name,
                handle,
            },
        );
    }

    /// Cancel the timer armed for `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &str) -> bool {
        match lock(&self.slots).remove(key) {
            Some(slot) => {
                slot.handle.abort();
                tracing::debug!(key, command = %slot.command, "debounce timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether a timer is pending for `key`.
    #[must_use]
    pub fn is_armed(&self, key: &str) -> bool {
        lock(&self.slots).contains_key(key)
    }

    /// Number of pending timers.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.slots).len()
    }

    /// Cancel every pending timer.
    pub fn shutdown(&self) {
        let drained: Vec<_> = lock(&self.slots).drain().collect();
        for (key, slot) in drained {
            slot.handle.abort();
            tracing::debug!(%key, command = %slot.command, "debounce timer dropped on shutdown");
        }
    }
}

impl<D> Drop for DebounceScheduler<D> {
    fn drop(&mut self) {
        for (_, slot) in lock(&self.slots).drain() {
            slot.handle.abort();
        }
    }
}
