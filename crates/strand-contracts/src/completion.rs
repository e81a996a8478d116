//! Externally observable lifecycle of a running agent process.
//!
//! A `Completion` is a read-only snapshot. It is recomputed on every
//! observation and never updated in place.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of an agent process.
///
/// `Completed` and `Failed` are terminal: once reached, the status never
/// changes again for that process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Running,
    Waiting,
    Completed,
    Failed,
}

impl AgentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Parse the `status` value an agent keeps in its own state.
    ///
    /// Accepts the lowercase names; anything else yields `None`.
    pub fn from_state_value(value: &Value) -> Option<Self> {
        match value.as_str()? {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "waiting" => Some(Self::Waiting),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Waiting => "waiting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A status snapshot of an agent process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub status: AgentStatus,
    /// The agent's result at the time of the snapshot, if any.
    pub result: Option<Value>,
    /// Failure description when `status` is `Failed`.
    pub error: Option<String>,
}

impl Completion {
    pub fn completed(result: Option<Value>) -> Self {
        Self {
            status: AgentStatus::Completed,
            result,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, result: Option<Value>) -> Self {
        Self {
            status: AgentStatus::Failed,
            result,
            error: Some(error.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
