use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Name of the native sensor interface that bridges simulator bodies with the
/// external transform tree.
pub const PLUGIN_INTERFACE: &str = "or_tf";

/// Tracking loop state of a plugin instance.
///
/// A freshly created plugin starts [`Active`][TrackingState::Active];
/// `Pause` and `Resume` toggle between the two states without touching the
/// registration set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    #[default]
    Active,
    Paused,
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingState::Active => write!(f, "active"),
            TrackingState::Paused => write!(f, "paused"),
        }
    }
}

/// One command line handed to a plugin's command channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Name of the plugin instance that received the line, e.g. `"or_tf"`.
    pub plugin: String,
    /// The exact line, e.g. `"RegisterBody object_1 goal/base_link"`.
    pub line: String,
}

impl CommandRecord {
    /// Stamp `line` with a fresh id and the current UTC time.
    pub fn new(plugin: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            plugin: plugin.into(),
            line: line.into(),
        }
    }

    /// First whitespace-separated token of the line (the command name).
    pub fn command_name(&self) -> &str {
        self.line.split_whitespace().next().unwrap_or("")
    }
}

/// Error type shared by every ortf crate.
///
/// The variants let callers tell "the plugin is unusable" apart from "this one
/// command was bad".
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrTfError {
    /// The plugin could not be created or attached to its environment.
    #[error("Plugin Construction Failed for {plugin}: {details}")]
    ConstructionFailure { plugin: String, details: String },

    /// The command channel rejected or failed to deliver a command.
    #[error("Command Dispatch Failed for `{command}`: {details}")]
    DispatchFailure { command: String, details: String },

    /// A body or frame name unknown to the environment.
    #[error("Invalid Reference: {0}")]
    InvalidReference(String),

    /// A command could not be expressed in (or read from) the wire grammar.
    #[error("Malformed Command: {0}")]
    MalformedCommand(String),
}
