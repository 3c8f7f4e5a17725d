//! Command: the effect a rule produces when it fires.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Music command value asking the speaker to pick any saved playlist.
pub const ANY_PLAYLIST: &str = "random";

/// Which actuator a command is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Set the state of a single light; value is a JSON light state.
    Light,
    /// Set the state of a light group; value is a JSON light state.
    LightGroup,
    /// Say a sentence on a speaker; value is the text.
    Speech,
    /// Play a saved playlist on a speaker; value is part of its name, or
    /// [`ANY_PLAYLIST`].
    Music,
    /// Fire a notification webhook; target is the event/channel name.
    Webhook,
    /// Publish the value verbatim on the transport; target is the topic.
    Transport,
}

impl CommandKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::LightGroup => "light_group",
            Self::Speech => "speech",
            Self::Music => "music",
            Self::Webhook => "webhook",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = ValidationError;

    /// Accepts the canonical names and the vendor names used by older rows.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "light_group" | "hue" | "lighting" => Ok(Self::LightGroup),
            "speech" | "sonos" | "audio" => Ok(Self::Speech),
            "music" | "playlist" => Ok(Self::Music),
            "webhook" | "ifttt" | "notification" => Ok(Self::Webhook),
            "transport" | "mqtt" => Ok(Self::Transport),
            other => Err(ValidationError::UnknownCommandKind(other.to_string())),
        }
    }
}

/// Command row as stored, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    pub name: String,
    pub kind: String,
    pub target: String,
    pub value: String,
}

/// A validated, dispatchable command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    pub kind: CommandKind,
    pub target: String,
    /// Kind-specific encoding, see [`CommandKind`].
    pub value: String,
}

impl Command {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: CommandKind,
        target: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            value: value.into(),
        }
    }
}

impl TryFrom<CommandDefinition> for Command {
    type Error = ValidationError;

    fn try_from(def: CommandDefinition) -> Result<Self, Self::Error> {
        if def.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let kind = def.kind.parse()?;
        Ok(Self {
            name: def.name,
            kind,
            target: def.target,
            value: def.value,
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.name, self.kind, self.target, self.value
        )
    }
}
