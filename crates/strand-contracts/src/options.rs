//! Execution and runner option structs.
//!
//! Every field has a documented default so callers can build options with
//! `..Default::default()` and only override what they care about.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound on a single action attempt.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Default number of retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 1;
/// Default initial backoff between attempts.
pub const DEFAULT_BACKOFF_MS: u64 = 250;
/// Upper bound for any single backoff sleep.
pub const MAX_BACKOFF_MS: u64 = 30_000;
/// Default bound on a compensation call.
pub const DEFAULT_COMPENSATION_TIMEOUT_MS: u64 = 5_000;
/// Default cap on runner invocations per agent-server drain.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;
/// Default supervisor restart budget.
pub const DEFAULT_MAX_RESTARTS: u32 = 3;
/// Default supervisor restart window.
pub const DEFAULT_RESTART_WINDOW_MS: u64 = 5_000;
/// Default poll interval while waiting for a child agent to be registered.
pub const DEFAULT_CHILD_POLL_INTERVAL_MS: u64 = 50;

/// How much instrumentation the engine emits.
///
/// Only verbosity changes; control flow never depends on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryLevel {
    /// Start, stop and exception events, with params.
    #[default]
    Full,
    /// Stop and exception events only, without params.
    Minimal,
    /// No events.
    Silent,
}

/// Options for one engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecOptions {
    /// Per-attempt bound in milliseconds. `0` runs the action inline with
    /// no bound.
    pub timeout_ms: u64,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Initial backoff in milliseconds; doubles every attempt.
    pub backoff_ms: u64,
    pub telemetry: TelemetryLevel,
    /// Global switch for compensation. An action must also declare it.
    pub compensation: bool,
    /// Bound on the compensation call in milliseconds.
    pub compensation_timeout_ms: u64,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_ms: DEFAULT_BACKOFF_MS,
            telemetry: TelemetryLevel::Full,
            compensation: true,
            compensation_timeout_ms: DEFAULT_COMPENSATION_TIMEOUT_MS,
        }
    }
}

impl ExecOptions {
    /// The sleep before retry number `attempt` (0-based):
    /// `backoff_ms * 2^attempt`, capped at `MAX_BACKOFF_MS`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self.backoff_ms.saturating_mul(factor).min(MAX_BACKOFF_MS);
        Duration::from_millis(ms)
    }

    /// `None` when the action should run inline without a bound.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Options for one runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Chain only: keep executing after a step emits directives. When
    /// false the chain halts after that step and returns what it has.
    pub continue_on_directive: bool,
    /// Merge step outputs into agent state. When false the state is left
    /// untouched and outputs are only recorded as the agent's result.
    pub merge_results: bool,
    /// Engine options for instructions that carry none of their own.
    pub exec: ExecOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            continue_on_directive: true,
            merge_results: true,
            exec: ExecOptions::default(),
        }
    }
}

/// Which runner an agent server drains its queue with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    Simple,
    #[default]
    Chain,
}

/// Options for an agent server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    pub runner: RunnerKind,
    pub run: RunOptions,
    /// Upper bound on runner invocations per drain. Guards agents whose
    /// actions keep re-enqueueing themselves.
    pub max_iterations: u32,
    /// Mark the agent failed when a runner invocation errors.
    pub fail_on_error: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            runner: RunnerKind::Chain,
            run: RunOptions::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            fail_on_error: true,
        }
    }
}

/// Supervisor restart policy: at most `max_restarts` restarts within any
/// sliding window of `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartPolicy {
    pub max_restarts: u32,
    pub window_ms: u64,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: DEFAULT_MAX_RESTARTS,
            window_ms: DEFAULT_RESTART_WINDOW_MS,
        }
    }
}

impl RestartPolicy {
    /// Never restart.
    pub fn never() -> Self {
        Self {
            max_restarts: 0,
            window_ms: DEFAULT_RESTART_WINDOW_MS,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}
