//! Scenario 3: Compensation
//!
//! A treasury agent books two transfers in one batch:
//!
//!   - alice -> bob, 30: succeeds
//!   - alice -> carol, 40: carol's account is frozen, so the credit fails
//!     after alice was already debited
//!
//! The engine retries the second transfer once (the debit is keyed by
//! transfer id and not repeated), then runs the action's compensation,
//! which refunds alice. The chain aborts, the agent is marked failed with a
//! compensation error that still carries the original failure, and the
//! ledger total is unchanged.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::json;

use strand_contracts::{
    agent::AgentId,
    completion::Completion,
    error::StrandResult,
    telemetry::EventKind,
};
use strand_core::{ActionRef, Agent, Instruction};

use crate::actions::{Ledger, Transfer};
use crate::setup::Runtime;
use crate::workers::params;

const AWAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// What the scenario observed.
#[derive(Debug, Clone, PartialEq)]
pub struct CompensationReport {
    pub completion: Completion,
    pub balances: BTreeMap<String, i64>,
    pub total_before: i64,
    pub total_after: i64,
    pub compensations: usize,
}

/// Run Scenario 3: Compensation.
pub async fn run_scenario() -> StrandResult<CompensationReport> {
    println!("=== Scenario 3: Compensation ===");
    println!();

    let runtime = Runtime::load()?;
    let ledger = Ledger::new([("alice", 100), ("bob", 50), ("carol", 0)]);
    ledger.freeze("carol");
    let total_before = ledger.total();

    println!("  Opening balances:       {}", format_balances(&ledger.balances()));
    println!("  Frozen accounts:        carol");
    println!();

    let transfer = ActionRef::new(Transfer::new(ledger.clone()));
    let treasury = Agent::new(AgentId::new("treasury")).with_actions([transfer.clone()])?;
    let handle = runtime.server().spawn(treasury);

    handle
        .enqueue(vec![
            Instruction::new(
                transfer.clone(),
                params(json!({ "transfer_id": "tx-1", "from": "alice", "to": "bob", "amount": 30 })),
            ),
            Instruction::new(
                transfer,
                params(json!({ "transfer_id": "tx-2", "from": "alice", "to": "carol", "amount": 40 })),
            ),
        ])
        .await?;

    let completion = runtime.coordinator().await_one(&handle, AWAIT_TIMEOUT).await?;
    let balances = ledger.balances();
    let total_after = ledger.total();
    let compensations = runtime.telemetry.count(EventKind::Compensate);

    println!("  Treasury status:        {}", completion.status.as_str());
    if let Some(error) = &completion.error {
        println!("  Failure:                {}", error);
    }
    println!("  Compensations run:      {}", compensations);
    println!("  Closing balances:       {}", format_balances(&balances));
    println!(
        "  Ledger total:           {} -> {} ({})",
        total_before,
        total_after,
        if total_before == total_after { "CONSISTENT" } else { "INCONSISTENT" }
    );
    println!();
    println!("  Scenario 3 complete.");
    println!();

    Ok(CompensationReport {
        completion,
        balances,
        total_before,
        total_after,
        compensations,
    })
}

fn format_balances(balances: &BTreeMap<String, i64>) -> String {
    balances
        .iter()
        .map(|(account, balance)| format!("{account}={balance}"))
        .collect::<Vec<_>>()
        .join(", ")
}
