//! Command dispatcher: routes a fired [`Command`] to its actuator.
//!
//! Dispatch never fails loudly: an unconfigured actuator, an undecodable
//! value, or an actuator error is logged and reported as an outcome.

use std::future::Future;
use std::sync::Arc;

use smarthome_domain::message;
use smarthome_domain::rule::{ANY_PLAYLIST, Command, CommandKind};

use crate::ports::{Lighting, Publisher, Speech, Webhook};

/// Webhooks take at most `value1`, `value2` and `value3`.
pub const MAX_WEBHOOK_VALUES: usize = 3;

/// What happened to a dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The actuator accepted the command.
    Delivered,
    /// The command was not sent: no actuator configured, or a bad value.
    Skipped,
    /// The actuator was called and reported an error.
    Failed,
}

/// Anything able to carry out a [`Command`].
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(&self, command: &Command) -> impl Future<Output = DispatchOutcome> + Send;
}

/// Routes commands by kind to the configured actuators and the transport.
pub struct CommandDispatcher<P, L, S, W> {
    publisher: Arc<P>,
    lighting: Option<L>,
    speech: Option<S>,
    webhook: Option<W>,
}

impl<P, L, S, W> CommandDispatcher<P, L, S, W>
where
    P: Publisher,
    L: Lighting,
    S: Speech,
    W: Webhook,
{
    /// Create a dispatcher; `None` disables the matching command kinds.
    pub fn new(
        publisher: Arc<P>,
        lighting: Option<L>,
        speech: Option<S>,
        webhook: Option<W>,
    ) -> Self {
        Self {
            publisher,
            lighting,
            speech,
            webhook,
        }
    }

    async fn light(&self, command: &Command, group: bool) -> DispatchOutcome {
        let Some(lighting) = &self.lighting else {
            return skip(command, "no lighting bridge configured");
        };
        let Some(state) = parse_light_state(&command.value) else {
            return skip(command, "light state is not a JSON object");
        };
        let result = if group {
            lighting.set_group(&command.target, &state).await
        } else {
            lighting.set_light(&command.target, &state).await
        };
        report(command, result)
    }

    async fn speak(&self, command: &Command) -> DispatchOutcome {
        let Some(speech) = &self.speech else {
            return skip(command, "no speaker configured");
        };
        if command.value.trim().is_empty() {
            return skip(command, "nothing to say");
        }
        report(command, speech.speak(&command.target, &command.value).await)
    }

    async fn play(&self, command: &Command) -> DispatchOutcome {
        let Some(speech) = &self.speech else {
            return skip(command, "no speaker configured");
        };
        let playlist = match command.value.trim() {
            "" => ANY_PLAYLIST,
            name => name,
        };
        report(command, speech.play_playlist(&command.target, playlist).await)
    }

    async fn notify(&self, command: &Command) -> DispatchOutcome {
        let Some(webhook) = &self.webhook else {
            return skip(command, "no webhook configured");
        };
        let Some(values) = parse_webhook_values(&command.value) else {
            return skip(command, "webhook values are not a list of strings");
        };
        report(command, webhook.trigger(&command.target, &values).await)
    }

    async fn publish(&self, command: &Command) -> DispatchOutcome {
        if command.target.trim().is_empty() {
            return skip(command, "no topic to publish on");
        }
        let result = self
            .publisher
            .publish(&command.target, command.value.clone())
            .await;
        report(command, result)
    }
}

impl<P, L, S, W> Dispatch for CommandDispatcher<P, L, S, W>
where
    P: Publisher,
    L: Lighting,
    S: Speech,
    W: Webhook,
{
    async fn dispatch(&self, command: &Command) -> DispatchOutcome {
        tracing::info!(command = %command.name, kind = %command.kind, target = %command.target, "dispatching command");
        match command.kind {
            CommandKind::Light => self.light(command, false).await,
            CommandKind::LightGroup => self.light(command, true).await,
            CommandKind::Speech => self.speak(command).await,
            CommandKind::Music => self.play(command).await,
            CommandKind::Webhook => self.notify(command).await,
            CommandKind::Transport => self.publish(command).await,
        }
    }
}

fn skip(command: &Command, reason: &str) -> DispatchOutcome {
    tracing::warn!(command = %command.name, kind = %command.kind, reason, "command skipped");
    DispatchOutcome::Skipped
}

fn report<E: std::fmt::Display>(command: &Command, result: Result<(), E>) -> DispatchOutcome {
    match result {
        Ok(()) => DispatchOutcome::Delivered,
        Err(err) => {
            tracing::warn!(command = %command.name, kind = %command.kind, error = %err, "command failed");
            DispatchOutcome::Failed
        }
    }
}

/// Decode a light state, accepting single-quoted objects.
#[must_use]
pub fn parse_light_state(value: &str) -> Option<serde_json::Value> {
    message::decode::<serde_json::Value>(value.as_bytes())
        .ok()
        .filter(serde_json::Value::is_object)
}

/// Decode webhook values: a JSON list of up to three entries, or a plain
/// string used as the first value. Extra entries are dropped.
#[must_use]
pub fn parse_webhook_values(value: &str) -> Option<Vec<String>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(Vec::new());
    }
    if !trimmed.starts_with('[') {
        return Some(vec![trimmed.to_string()]);
    }
    let entries = message::decode::<Vec<serde_json::Value>>(trimmed.as_bytes()).ok()?;
    if entries.len() > MAX_WEBHOOK_VALUES {
        tracing::warn!(count = entries.len(), "webhook takes three values, extra dropped");
    }
    Some(
        entries
            .into_iter()
            .take(MAX_WEBHOOK_VALUES)
            .map(|entry| match entry {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
    )
}
