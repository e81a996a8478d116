//! Runtime error types for the STRAND execution pipeline.
//!
//! All fallible operations return `StrandResult<T>`. The enum is `Clone` and
//! `PartialEq` because the same error value is fanned out to every waiter of
//! a failed agent and compared in tests.

use serde_json::Value;
use thiserror::Error;

/// The unified error type for the STRAND runtime.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrandError {
    /// The action definition does not satisfy the action contract.
    #[error("invalid action: {reason}")]
    InvalidAction { reason: String },

    /// Params or context failed normalization or schema validation.
    #[error("validation failed on [{}]: {reason}", .fields.join(", "))]
    Validation { fields: Vec<String>, reason: String },

    /// The action body returned a failure or panicked.
    #[error("action '{action}' failed: {reason}")]
    Execution { action: String, reason: String },

    /// The action body did not return within its time bound.
    #[error("action '{action}' timed out after {timeout_ms}ms")]
    Timeout { action: String, timeout_ms: u64 },

    /// The action failed and compensation was attempted.
    ///
    /// The original failure is always preserved, whatever happened to the
    /// compensation itself.
    #[error("action '{action}' failed and compensation {}: {original}", outcome_word(.compensated))]
    Compensation {
        action: String,
        compensated: bool,
        result: Option<Value>,
        compensation_error: Option<String>,
        original: Box<StrandError>,
    },

    /// A directive failed structural validation.
    #[error("invalid directive: {reason}")]
    InvalidDirective { reason: String },

    /// A malformed or already-consumed handle was passed to await/cancel.
    #[error("invalid handle: {reason}")]
    InvalidAsyncHandle { reason: String },

    /// A coordination call ran out of its time budget.
    #[error("await timed out after {timeout_ms}ms")]
    AwaitTimeout { timeout_ms: u64 },

    /// A watched agent process exited or vanished before reaching a
    /// terminal status.
    #[error("agent '{agent_id}' is down: {reason}")]
    ProcessDown { agent_id: String, reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

fn outcome_word(compensated: &bool) -> &'static str {
    if *compensated {
        "succeeded"
    } else {
        "failed"
    }
}

impl StrandError {
    /// Build an `Execution` error for `action`.
    pub fn execution(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Execution {
            action: action.into(),
            reason: reason.into(),
        }
    }

    /// Build a `Validation` error naming a single field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            fields: vec![field.into()],
            reason: reason.into(),
        }
    }

    /// Whether the engine may retry after this error.
    ///
    /// Only failures of the action body are retried. Timeouts, structural
    /// and validation errors surface immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// Short machine-readable discriminant, used in telemetry and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAction { .. } => "invalid_action",
            Self::Validation { .. } => "validation_error",
            Self::Execution { .. } => "execution_error",
            Self::Timeout { .. } => "timeout",
            Self::Compensation { .. } => "compensation_error",
            Self::InvalidDirective { .. } => "invalid_directive",
            Self::InvalidAsyncHandle { .. } => "invalid_async_handle",
            Self::AwaitTimeout { .. } => "await_timeout",
            Self::ProcessDown { .. } => "process_down",
            Self::ConfigError { .. } => "config_error",
        }
    }
}

/// Convenience alias used throughout the STRAND crates.
pub type StrandResult<T> = Result<T, StrandError>;
