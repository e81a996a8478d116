//! The top-level runtime configuration document.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use strand_contracts::{
    error::{StrandError, StrandResult},
    options::{ExecOptions, RestartPolicy, RunOptions, ServerOptions},
};

use crate::section::{
    CompensationSection, CoordinationSection, ExecutionSection, RunnerSection, ServerSection,
    SupervisorSection,
};

/// Runtime configuration loaded from a TOML document.
///
/// Construct via `from_toml_str` or `from_file`, then convert into the
/// typed option structs the engine, runners and servers take.
///
/// ```rust,ignore
/// use strand_config::RuntimeConfig;
///
/// let config = RuntimeConfig::from_file(Path::new("config/runtime.toml"))?;
/// let server = AgentServer::new(executor).with_options(config.server_options());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub execution: ExecutionSection,
    pub compensation: CompensationSection,
    pub runner: RunnerSection,
    pub server: ServerSection,
    pub supervisor: SupervisorSection,
    pub coordination: CoordinationSection,
}

impl RuntimeConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `StrandError::ConfigError` if the TOML is malformed, does not
    /// match the expected layout, or holds out-of-range values.
    pub fn from_toml_str(s: &str) -> StrandResult<Self> {
        let config: RuntimeConfig = toml::from_str(s).map_err(|e| StrandError::ConfigError {
            reason: format!("failed to parse runtime TOML: {}", e),
        })?;
        config.validate()?;
        debug!(
            runner = ?config.runner.kind,
            timeout_ms = config.execution.timeout_ms,
            max_retries = config.execution.max_retries,
            "runtime configuration loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as runtime configuration.
    pub fn from_file(path: &Path) -> StrandResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StrandError::ConfigError {
            reason: format!("failed to read runtime config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject values the runtime cannot honor.
    pub fn validate(&self) -> StrandResult<()> {
        if self.server.max_iterations == 0 {
            return Err(invalid("server.max_iterations must be at least 1"));
        }
        if self.supervisor.max_restarts > 0 && self.supervisor.window_ms == 0 {
            return Err(invalid(
                "supervisor.window_ms must be positive when max_restarts > 0",
            ));
        }
        if self.coordination.child_poll_interval_ms == 0 {
            return Err(invalid("coordination.child_poll_interval_ms must be positive"));
        }
        Ok(())
    }

    pub fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            timeout_ms: self.execution.timeout_ms,
            max_retries: self.execution.max_retries,
            backoff_ms: self.execution.backoff_ms,
            telemetry: self.execution.telemetry,
            compensation: self.compensation.enabled,
            compensation_timeout_ms: self.compensation.timeout_ms,
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            continue_on_directive: self.runner.continue_on_directive,
            merge_results: self.runner.merge_results,
            exec: self.exec_options(),
        }
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            runner: self.runner.kind,
            run: self.run_options(),
            max_iterations: self.server.max_iterations,
            fail_on_error: self.server.fail_on_error,
        }
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy {
            max_restarts: self.supervisor.max_restarts,
            window_ms: self.supervisor.window_ms,
        }
    }

    pub fn child_poll_interval(&self) -> Duration {
        Duration::from_millis(self.coordination.child_poll_interval_ms)
    }
}

fn invalid(reason: &str) -> StrandError {
    StrandError::ConfigError {
        reason: reason.to_string(),
    }
}
