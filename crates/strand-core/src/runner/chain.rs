use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use strand_contracts::{
    agent::{merge, Params},
    error::StrandError,
    options::RunOptions,
};

use crate::agent::Agent;
use crate::directive::{self, Directive};
use crate::executor::Executor;
use crate::instruction::Instruction;
use crate::traits::Runner;

use super::{execute_step, record_output, RunResult};

/// Drains the whole queue in one call, feeding each step's output into the
/// next step's params.
///
/// Explicit instruction params win over the piped output. Directives from
/// every step accumulate in production order; agent directives are applied
/// once the chain stops, runtime directives are returned.
///
/// With `continue_on_directive` off, the chain halts after the first step
/// that emitted any directive and leaves the rest of the queue in place.
pub struct ChainRunner {
    executor: Arc<Executor>,
}

impl ChainRunner {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Runner for ChainRunner {
    async fn run(&self, mut agent: Agent, opts: &RunOptions) -> RunResult {
        let mut piped = Params::new();
        let mut directives: Vec<Directive> = Vec::new();
        let mut executed = Vec::new();

        // ── Draining ─────────────────────────────────────────────────────────
        while let Some(mut instruction) = agent.dequeue() {
            let mut params = piped.clone();
            merge(&mut params, &instruction.params);

            debug!(
                agent_id = %agent.id,
                action = %instruction.action_name(),
                step = executed.len(),
                "chain runner: executing step"
            );

            let output = match execute_step(&self.executor, &agent, &instruction, params, opts).await {
                Ok(output) => output,
                Err(err) => {
                    warn!(
                        agent_id = %agent.id,
                        action = %instruction.action_name(),
                        completed_steps = executed.len(),
                        error = %err,
                        "chain runner: step failed, aborting chain"
                    );
                    return finish_failed(agent, directives, executed, err);
                }
            };

            record_output(&mut agent, &output.state, opts);
            piped = output.state.clone();
            instruction.result = Some(output.state);
            executed.push(instruction);

            let emitted = !output.directives.is_empty();
            directives.extend(output.directives);

            if emitted && !opts.continue_on_directive {
                info!(
                    agent_id = %agent.id,
                    remaining = agent.pending.len(),
                    "chain runner: halting on directive"
                );
                break;
            }
        }

        // ── Applying directives ──────────────────────────────────────────────
        let fallback = agent.clone();
        match directive::apply(agent, directives) {
            Ok((agent, runtime)) => RunResult::ok(agent, runtime, executed),
            Err(err) => {
                warn!(agent_id = %fallback.id, error = %err, "chain runner: directives rejected");
                RunResult::failed(fallback, Vec::new(), executed, err)
            }
        }
    }
}

/// A step failed: keep the state from earlier steps, apply what they asked
/// for, and report the step error.
fn finish_failed(
    agent: Agent,
    directives: Vec<Directive>,
    executed: Vec<Instruction>,
    err: StrandError,
) -> RunResult {
    let fallback = agent.clone();
    match directive::apply(agent, directives) {
        Ok((agent, runtime)) => RunResult::failed(agent, runtime, executed, err),
        Err(apply_err) => {
            warn!(agent_id = %fallback.id, error = %apply_err, "chain runner: directives of completed steps rejected");
            RunResult::failed(fallback, Vec::new(), executed, err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use strand_contracts::error::StrandError;
    use strand_contracts::options::RunOptions;

    use super::ChainRunner;
    use crate::directive::Directive;
    use crate::instruction::ActionRef;
    use crate::runner::test_support::{agent, executor, map, opts, Announce};
    use crate::runner::RunStatus;
    use crate::traits::Runner;

    /// Increment 7 then Multiply 3 on a zero counter gives 21.
    #[tokio::test]
    async fn output_pipes_into_next_step() {
        let runner = ChainRunner::new(executor());
        let mut agent = agent();
        agent.plan("add", map(json!({ "amount": 7 }))).unwrap();
        agent.plan("times", map(json!({ "factor": 3 }))).unwrap();

        let result = runner.run(agent, &opts()).await;

        assert!(result.is_ok());
        assert_eq!(result.agent.state, map(json!({ "counter": 21 })));
        assert!(result.agent.pending.is_empty());
        assert_eq!(result.executed.len(), 2);
    }

    #[tokio::test]
    async fn explicit_params_win_over_piped_output() {
        let runner = ChainRunner::new(executor());
        let mut agent = agent();
        agent.plan("add", map(json!({ "amount": 7 }))).unwrap();
        agent.plan("add", map(json!({ "counter": 100, "amount": 1 }))).unwrap();

        let result = runner.run(agent, &opts()).await;
        assert_eq!(result.agent.state["counter"], json!(101));
    }

    /// A failing step keeps the state of earlier steps and leaves later
    /// instructions queued.
    #[tokio::test]
    async fn failure_aborts_the_rest() {
        let runner = ChainRunner::new(executor());
        let mut agent = agent();
        agent.plan("add", map(json!({ "amount": 4 }))).unwrap();
        agent.plan("broken", map(json!({}))).unwrap();
        agent.plan("add", map(json!({ "amount": 100 }))).unwrap();

        let result = runner.run(agent, &opts()).await;

        assert_eq!(result.status, RunStatus::Error);
        assert!(matches!(result.error, Some(StrandError::Execution { .. })));
        assert_eq!(result.agent.state["counter"], json!(4));
        assert_eq!(result.agent.pending.len(), 1);
        assert_eq!(result.executed.len(), 1);
    }

    #[tokio::test]
    async fn directives_do_not_interrupt_by_default() {
        let runner = ChainRunner::new(executor());
        let runs = Arc::new(Mutex::new(0));
        let mut agent = agent();
        agent.register_action(ActionRef::new(Announce { runs: runs.clone() })).unwrap();
        agent.plan("announce", map(json!({}))).unwrap();
        agent.plan("add", map(json!({ "amount": 2 }))).unwrap();
        agent.plan("announce", map(json!({}))).unwrap();

        let (agent, directives) = runner.run(agent, &opts()).await.into_result().unwrap();

        assert_eq!(*runs.lock().unwrap(), 2);
        assert_eq!(directives.len(), 2);
        assert_eq!(agent.state["counter"], json!(2));
        assert!(agent.pending.is_empty());
    }

    #[tokio::test]
    async fn halts_on_directive_when_configured() {
        let runner = ChainRunner::new(executor());
        let runs = Arc::new(Mutex::new(0));
        let mut agent = agent();
        agent.register_action(ActionRef::new(Announce { runs: runs.clone() })).unwrap();
        agent.plan("announce", map(json!({}))).unwrap();
        agent.plan("add", map(json!({ "amount": 2 }))).unwrap();

        let opts = RunOptions { continue_on_directive: false, ..opts() };
        let (agent, directives) = runner.run(agent, &opts).await.into_result().unwrap();

        assert_eq!(*runs.lock().unwrap(), 1);
        assert_eq!(directives, vec![Directive::publish("events", json!({ "type": "announced" }))]);
        assert_eq!(agent.pending.len(), 1);
        assert_eq!(agent.state["counter"], json!(0));
    }

    /// Enqueue directives are applied after the drain, so the new
    /// instruction waits for the next call.
    #[tokio::test]
    async fn enqueued_instructions_wait_for_next_call() {
        let runner = ChainRunner::new(executor());
        let mut agent = agent();
        agent.plan("requeue", map(json!({}))).unwrap();

        let (agent, _) = runner.run(agent, &opts()).await.into_result().unwrap();
        assert_eq!(agent.pending.len(), 1);

        let (agent, _) = runner.run(agent, &opts()).await.into_result().unwrap();
        assert!(agent.pending.is_empty());
        assert_eq!(agent.state["counter"], json!(1));
    }
}
