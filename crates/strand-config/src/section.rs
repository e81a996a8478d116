//! Configuration sections as they appear in TOML.
//!
//! Every section and every key is optional; omitted values take the
//! documented defaults from `strand_contracts::options`.
//!
//! Example:
//! ```toml
//! [execution]
//! timeout_ms = 2000
//! max_retries = 2
//! backoff_ms = 100
//! telemetry = "minimal"
//!
//! [runner]
//! kind = "simple"
//! ```

use serde::{Deserialize, Serialize};

use strand_contracts::options::{
    RunnerKind, TelemetryLevel, DEFAULT_BACKOFF_MS, DEFAULT_CHILD_POLL_INTERVAL_MS,
    DEFAULT_COMPENSATION_TIMEOUT_MS, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_RESTARTS,
    DEFAULT_MAX_RETRIES, DEFAULT_RESTART_WINDOW_MS, DEFAULT_TIMEOUT_MS,
};

/// `[execution]`: engine defaults for every action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    /// Per-attempt bound. `0` disables the bound.
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub telemetry: TelemetryLevel,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_ms: DEFAULT_BACKOFF_MS,
            telemetry: TelemetryLevel::Full,
        }
    }
}

/// `[compensation]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompensationSection {
    pub enabled: bool,
    pub timeout_ms: u64,
}

impl Default for CompensationSection {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: DEFAULT_COMPENSATION_TIMEOUT_MS,
        }
    }
}

/// `[runner]`: which runner agent servers use and how it behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub kind: RunnerKind,
    pub continue_on_directive: bool,
    pub merge_results: bool,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            kind: RunnerKind::Chain,
            continue_on_directive: true,
            merge_results: true,
        }
    }
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub max_iterations: u32,
    pub fail_on_error: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            fail_on_error: true,
        }
    }
}

/// `[supervisor]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorSection {
    pub max_restarts: u32,
    pub window_ms: u64,
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            max_restarts: DEFAULT_MAX_RESTARTS,
            window_ms: DEFAULT_RESTART_WINDOW_MS,
        }
    }
}

/// `[coordination]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationSection {
    pub child_poll_interval_ms: u64,
}

impl Default for CoordinationSection {
    fn default() -> Self {
        Self {
            child_poll_interval_ms: DEFAULT_CHILD_POLL_INTERVAL_MS,
        }
    }
}
