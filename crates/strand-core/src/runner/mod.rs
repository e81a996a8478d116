//! Runner protocols: strategies for draining an agent's instruction queue.
//!
//! - [`SimpleRunner`] executes exactly one instruction per call.
//! - [`ChainRunner`] drains the whole queue, threading each step's output
//!   into the next step's params.
//!
//! Both hand back an agent in every outcome; errors abort only the current
//! invocation.

mod chain;
mod simple;

pub use chain::ChainRunner;
pub use simple::SimpleRunner;

use serde_json::Value;

use strand_contracts::{
    agent::Params,
    error::{StrandError, StrandResult},
    options::RunOptions,
};

use crate::agent::Agent;
use crate::directive::Directive;
use crate::executor::Executor;
use crate::instruction::{ActionOutput, Instruction};

/// Context key under which runners expose the agent's current state.
pub const STATE_CONTEXT_KEY: &str = "state";
/// Context key under which runners expose the agent id.
pub const AGENT_ID_CONTEXT_KEY: &str = "agent_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    Error,
}

/// The outcome of one runner invocation.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub status: RunStatus,
    /// The agent after this invocation. On error it carries the state
    /// reached before the failing step.
    pub agent: Agent,
    /// Runtime directives for the caller to perform, in production order.
    pub directives: Vec<Directive>,
    /// Instructions executed successfully in this invocation, each with its
    /// `result` filled in.
    pub executed: Vec<Instruction>,
    pub error: Option<StrandError>,
}

impl RunResult {
    pub(crate) fn ok(agent: Agent, directives: Vec<Directive>, executed: Vec<Instruction>) -> Self {
        Self {
            status: RunStatus::Ok,
            agent,
            directives,
            executed,
            error: None,
        }
    }

    pub(crate) fn failed(
        agent: Agent,
        directives: Vec<Directive>,
        executed: Vec<Instruction>,
        error: StrandError,
    ) -> Self {
        Self {
            status: RunStatus::Error,
            agent,
            directives,
            executed,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == RunStatus::Ok
    }

    /// Collapse into `(agent, runtime_directives)`, dropping the agent on
    /// error.
    pub fn into_result(self) -> StrandResult<(Agent, Vec<Directive>)> {
        match self.error {
            Some(err) => Err(err),
            None => Ok((self.agent, self.directives)),
        }
    }
}

/// Run one instruction through the engine against `agent`'s current state.
///
/// The context handed to the action is the instruction's own context plus
/// the agent state and id. Per-instruction options win over `opts.exec`.
pub(crate) async fn execute_step(
    executor: &Executor,
    agent: &Agent,
    instruction: &Instruction,
    params: Params,
    opts: &RunOptions,
) -> StrandResult<ActionOutput> {
    let mut context = instruction.context.clone();
    context.insert(
        STATE_CONTEXT_KEY.to_string(),
        Value::Object(agent.state.clone()),
    );
    context.insert(
        AGENT_ID_CONTEXT_KEY.to_string(),
        Value::String(agent.id.to_string()),
    );

    let exec = instruction.opts.as_ref().unwrap_or(&opts.exec);
    executor
        .run(
            &instruction.action,
            Value::Object(params),
            Value::Object(context),
            exec,
        )
        .await
}

/// Record a successful step on the agent: merge the delta (unless disabled)
/// and remember it as the agent's latest result.
pub(crate) fn record_output(agent: &mut Agent, state: &Params, opts: &RunOptions) {
    if opts.merge_results {
        agent.merge_state(state);
    }
    agent.result = Some(Value::Object(state.clone()));
}
