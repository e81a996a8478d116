//! Core trait definitions for the STRAND execution pipeline.
//!
//! These four traits define the seams of the runtime:
//!
//! - `Action`        : a named, stateless unit of behavior (user code)
//! - `ParamValidator`: checks and coerces params against an action's schema
//! - `TelemetrySink` : observes start/stop/exception events, never steers
//! - `Runner`        : drains an agent's instruction queue
//!
//! The executor wires the first three together; runners sit on top of the
//! executor.

use async_trait::async_trait;

use strand_contracts::{
    agent::Params,
    error::{StrandError, StrandResult},
    options::RunOptions,
    schema::FieldSpec,
    telemetry::TelemetryEvent,
};

use crate::agent::Agent;
use crate::instruction::ActionOutput;
use crate::runner::RunResult;

/// A named, stateless unit of behavior.
///
/// Actions have no identity beyond their definition: they are invoked,
/// never constructed per call. `run` receives validated params and a
/// context map (the runners put the agent's current state under `"state"`)
/// and returns a state delta plus any directives it wants performed.
///
/// `run` must not touch agent state directly. Everything it wants to change
/// goes into the returned `ActionOutput`.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// Unique identifier. Must be non-empty and contain no whitespace.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Declared parameters. An empty schema accepts any params.
    fn schema(&self) -> Vec<FieldSpec> {
        Vec::new()
    }

    /// Execute the action.
    async fn run(&self, params: Params, context: Params) -> StrandResult<ActionOutput>;

    /// Whether this action provides a meaningful `compensate`.
    fn compensates(&self) -> bool {
        false
    }

    /// Undo or mitigate the effects of a failed run.
    ///
    /// Only called by the executor after the final failed attempt, and only
    /// when `compensates()` returns true and compensation is enabled in the
    /// execution options.
    async fn compensate(
        &self,
        _params: Params,
        error: StrandError,
        _context: Params,
    ) -> StrandResult<Params> {
        Err(StrandError::execution(
            self.name(),
            format!("no compensation defined (original error: {error})"),
        ))
    }
}

/// Validates and coerces params against a declared schema.
///
/// Implementations return the coerced params (defaults filled in) or a
/// `StrandError::Validation` listing every offending field.
pub trait ParamValidator: Send + Sync {
    fn validate(&self, schema: &[FieldSpec], params: Params) -> StrandResult<Params>;
}

/// Receives instrumentation events from the executor.
///
/// Implementations must be cheap and must not fail: telemetry is
/// observational only and cannot affect control flow.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: &TelemetryEvent);
}

/// A strategy for draining an agent's pending instruction queue.
///
/// A runner consumes the agent value and always hands back an agent,
/// successful or not, inside the `RunResult`.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, agent: Agent, opts: &RunOptions) -> RunResult;
}
