//! Scenario 1: Counter Chain
//!
//! Part A runs the chain runner directly: `increment 7` then `multiply 3`
//! on a zero counter. The first step's output is piped into the second
//! step's params, so the chain ends at 21.
//!
//! Part B hands a `countdown 5` to a supervised agent server, restarted on
//! a crash under the configured `[supervisor]` policy. Every tick enqueues
//! the next one through a directive, the server keeps draining, and the
//! final tick marks the agent completed with 5 ticks as its result.
//!
//! Part C starts the same countdown from 10 on a server limited to three
//! runner invocations per drain. The drain stops with work still queued
//! and the agent stays idle instead of looping.

use std::time::Duration;

use serde_json::{json, Value};

use strand_contracts::{
    agent::AgentId,
    completion::{AgentStatus, Completion},
    error::StrandResult,
    options::ServerOptions,
    telemetry::EventKind,
};
use strand_core::{traits::Runner, ActionRef, Agent, ChainRunner};
use strand_runtime::Supervisor;

use crate::actions::{Countdown, Increment, Multiply};
use crate::setup::Runtime;
use crate::workers::{counter_state, params};

const AWAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// What the scenario observed.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterChainReport {
    pub chained_counter: Value,
    pub countdown: Completion,
    /// Instructions still queued after the guarded drain.
    pub guarded_pending: usize,
    pub guarded_status: AgentStatus,
    pub action_runs: usize,
}

/// Run Scenario 1: Counter Chain.
pub async fn run_scenario() -> StrandResult<CounterChainReport> {
    println!("=== Scenario 1: Counter Chain ===");
    println!();

    let runtime = Runtime::load()?;

    // ── Part A: chain runner ─────────────────────────────────────────────────

    let mut agent = Agent::new(AgentId::new("calculator"))
        .with_state(counter_state())
        .with_actions([ActionRef::new(Increment), ActionRef::new(Multiply)])?;
    agent.plan("increment", params(json!({ "amount": 7 })))?;
    agent.plan("multiply", params(json!({ "factor": 3 })))?;

    let runner = ChainRunner::new(runtime.executor.clone());
    let (agent, _) = runner.run(agent, &runtime.config.run_options()).await.into_result()?;
    let chained_counter = agent.state.get("counter").cloned().unwrap_or(Value::Null);

    println!("  Part A: increment 7 -> multiply 3 on counter 0");
    println!("    Final counter:        {}", chained_counter);
    println!();

    // ── Part B: self-enqueueing countdown on a server ────────────────────────

    let server = runtime.server();
    let coordinator = runtime.coordinator();

    let policy = runtime.config.restart_policy();
    let handle = Supervisor::start(&server, countdown_agent("countdown")?, policy);
    handle.plan("countdown", params(json!({ "remaining": 5 }))).await?;
    let countdown = coordinator.await_one(&handle, AWAIT_TIMEOUT).await?;

    println!(
        "  Part B: countdown from 5 on a supervised agent server ({} restarts / {}ms)",
        policy.max_restarts, policy.window_ms
    );
    println!("    Status:               {}", countdown.status.as_str());
    println!(
        "    Ticks:                {}",
        countdown.result.clone().unwrap_or(Value::Null)
    );
    println!();

    // ── Part C: the iteration guard ──────────────────────────────────────────

    let guarded = server.clone().with_options(ServerOptions {
        max_iterations: 3,
        ..runtime.config.server_options()
    });
    let handle = guarded.spawn(countdown_agent("guarded-countdown")?);
    handle.plan("countdown", params(json!({ "remaining": 10 }))).await?;
    let snapshot = handle.snapshot().await?;
    let guarded_status = handle.status().await?.status;
    handle.stop()?;

    println!("  Part C: countdown from 10 with max_iterations = 3");
    println!("    Ticks done:           {}", snapshot.state.get("ticks").cloned().unwrap_or(Value::Null));
    println!("    Still queued:         {}", snapshot.pending.len());
    println!("    Status:               {}", guarded_status.as_str());
    println!();

    let action_runs = runtime.telemetry.count(EventKind::Stop);
    println!("  Engine stop events:     {}", action_runs);
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(CounterChainReport {
        chained_counter,
        countdown,
        guarded_pending: snapshot.pending.len(),
        guarded_status,
        action_runs,
    })
}

fn countdown_agent(id: &str) -> StrandResult<Agent> {
    Agent::new(AgentId::new(id))
        .with_state(counter_state())
        .with_actions([ActionRef::new(Countdown)])
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use strand_contracts::completion::AgentStatus;

    use super::run_scenario;

    #[tokio::test]
    async fn test_counter_chain_scenario() {
        let report = run_scenario().await.unwrap();

        assert_eq!(report.chained_counter, json!(21));

        assert_eq!(report.countdown.status, AgentStatus::Completed);
        assert_eq!(report.countdown.result, Some(json!(5)));

        assert_eq!(report.guarded_pending, 1);
        assert_eq!(report.guarded_status, AgentStatus::Idle);

        // 2 chain steps, 6 countdown steps, 3 guarded steps.
        assert_eq!(report.action_runs, 11);
    }
}
