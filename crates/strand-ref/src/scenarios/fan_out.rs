//! Scenario 2: Fan-out
//!
//! A dispatcher agent spawns three counter workers through `SpawnAgent`,
//! each with a different amount and start delay. The coordinator then:
//!
//!   1. races all three workers (`await_any`); the shortest delay wins
//!   2. waits for one child by tag (`await_child`), looked up in the
//!      dispatcher's child registry
//!   3. waits on all three as a barrier (`await_all`) and sums the results
//!   4. shows a barrier failing fast: one of two agents is stopped while
//!      the other is still busy, and the barrier reports that agent as down
//!      long before its timeout

use std::time::Duration;

use serde_json::{json, Value};
use tracing::info;

use strand_contracts::{
    agent::AgentId,
    completion::Completion,
    error::{StrandError, StrandResult},
};
use strand_core::{ActionRef, Agent, Instruction};

use crate::actions::{Sleep, SpawnWorker};
use crate::setup::Runtime;
use crate::workers::{counter_state, params};

const AWAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// (tag, amount, delay_ms) for each worker.
const WORKERS: [(&str, i64, u64); 3] = [("w1", 1, 90), ("w2", 2, 30), ("w3", 3, 60)];

/// What the scenario observed.
#[derive(Debug, Clone, PartialEq)]
pub struct FanOutReport {
    pub first_child: Completion,
    pub race_winner: AgentId,
    pub barrier_total: i64,
    /// The agent a short-circuited barrier named, if it short-circuited.
    pub short_circuited: Option<String>,
}

/// Run Scenario 2: Fan-out.
pub async fn run_scenario() -> StrandResult<FanOutReport> {
    println!("=== Scenario 2: Fan-out ===");
    println!();

    let runtime = Runtime::load()?;
    let server = runtime.server();
    let coordinator = runtime.coordinator();

    // ── Spawn the workers ────────────────────────────────────────────────────

    let dispatcher = Agent::new(AgentId::new("dispatcher"))
        .with_actions([ActionRef::new(SpawnWorker)])?;
    let spawn = dispatcher
        .actions
        .get("spawn_worker")
        .cloned()
        .ok_or_else(|| StrandError::InvalidAction {
            reason: "dispatcher has no spawn_worker action".to_string(),
        })?;
    let dispatcher = server.spawn(dispatcher);

    let batch: Vec<Instruction> = WORKERS
        .iter()
        .map(|(tag, amount, delay_ms)| {
            Instruction::new(
                spawn.clone(),
                params(json!({ "tag": tag, "amount": amount, "delay_ms": delay_ms })),
            )
        })
        .collect();
    dispatcher.enqueue(batch).await?;
    // Answered once the drain is over, so every worker has been started.
    dispatcher.snapshot().await?;

    println!("  Dispatcher spawned workers:");
    for (tag, amount, delay_ms) in WORKERS {
        println!("    {tag}: amount {amount}, delay {delay_ms}ms");
    }
    println!();

    let worker_ids: Vec<AgentId> = WORKERS
        .iter()
        .map(|(tag, _, _)| AgentId::new(format!("{}/{tag}", dispatcher.id())))
        .collect();

    // ── 1. Race ──────────────────────────────────────────────────────────────

    let (race_winner, _) = coordinator.await_any(worker_ids.clone(), AWAIT_TIMEOUT).await?;
    println!("  await_any(workers):     {} finished first", race_winner);

    // ── 2. One child by tag ──────────────────────────────────────────────────

    let first_child = coordinator.await_child(&dispatcher, "w1", AWAIT_TIMEOUT).await?;
    println!(
        "  await_child(w1):        {} with result {}",
        first_child.status.as_str(),
        first_child.result.clone().unwrap_or(Value::Null)
    );

    // ── 3. Barrier ───────────────────────────────────────────────────────────

    let completions = coordinator.await_all(worker_ids, AWAIT_TIMEOUT).await?;
    let barrier_total: i64 = completions
        .values()
        .filter_map(|c| c.result.as_ref().and_then(Value::as_i64))
        .sum();
    println!(
        "  await_all(workers):     {} completed, results sum to {}",
        completions.len(),
        barrier_total
    );
    println!();

    // ── 4. Barrier short-circuit ─────────────────────────────────────────────

    let straggler = server.spawn(sleeper("straggler")?);
    straggler.plan("sleep", params(json!({ "ms": 1_000 }))).await?;
    let dropout = server.spawn(sleeper("dropout")?);

    let barrier = coordinator.await_all([&straggler, &dropout], AWAIT_TIMEOUT);
    let stop_dropout = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        info!(agent_id = %dropout.id(), "stopping agent under a barrier");
        dropout.stop()
    };
    let (outcome, stopped) = tokio::join!(barrier, stop_dropout);
    stopped?;

    let short_circuited = match outcome {
        Err(StrandError::ProcessDown { agent_id, reason }) => {
            println!("  Barrier short-circuit:  {agent_id} is down ({reason})");
            Some(agent_id)
        }
        Err(other) => return Err(other),
        Ok(_) => {
            println!("  Barrier short-circuit:  none (every agent completed)");
            None
        }
    };
    straggler.cancel();

    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok(FanOutReport {
        first_child,
        race_winner,
        barrier_total,
        short_circuited,
    })
}

fn sleeper(id: &str) -> StrandResult<Agent> {
    Agent::new(AgentId::new(id))
        .with_state(counter_state())
        .with_actions([ActionRef::new(Sleep)])
}
