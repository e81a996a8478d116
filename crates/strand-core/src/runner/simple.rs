use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use strand_contracts::options::RunOptions;

use crate::agent::Agent;
use crate::directive;
use crate::executor::Executor;
use crate::traits::Runner;

use super::{execute_step, record_output, RunResult};

/// Executes exactly one pending instruction per call.
///
/// The instruction is dequeued before it runs and is never re-enqueued, so
/// each instruction runs at most once per call even when it fails.
pub struct SimpleRunner {
    executor: Arc<Executor>,
}

impl SimpleRunner {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Runner for SimpleRunner {
    async fn run(&self, mut agent: Agent, opts: &RunOptions) -> RunResult {
        let Some(mut instruction) = agent.dequeue() else {
            debug!(agent_id = %agent.id, "simple runner: queue empty");
            return RunResult::ok(agent, Vec::new(), Vec::new());
        };

        debug!(
            agent_id = %agent.id,
            action = %instruction.action_name(),
            remaining = agent.pending.len(),
            "simple runner: executing instruction"
        );

        let params = instruction.params.clone();
        let output = match execute_step(&self.executor, &agent, &instruction, params, opts).await {
            Ok(output) => output,
            Err(err) => {
                warn!(agent_id = %agent.id, action = %instruction.action_name(), error = %err, "simple runner: step failed");
                return RunResult::failed(agent, Vec::new(), Vec::new(), err);
            }
        };

        record_output(&mut agent, &output.state, opts);
        instruction.result = Some(output.state);

        if output.directives.is_empty() {
            return RunResult::ok(agent, Vec::new(), vec![instruction]);
        }

        // Keep a copy so a rejected batch still returns the merged agent.
        let fallback = agent.clone();
        match directive::apply(agent, output.directives) {
            Ok((agent, runtime)) => RunResult::ok(agent, runtime, vec![instruction]),
            Err(err) => {
                warn!(agent_id = %fallback.id, error = %err, "simple runner: directives rejected");
                RunResult::failed(fallback, Vec::new(), vec![instruction], err)
            }
        }
    }
}
