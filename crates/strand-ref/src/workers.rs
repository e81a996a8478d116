//! Child agents started through `SpawnAgent`.

use serde_json::{json, Value};
use tracing::debug;

use strand_contracts::{
    agent::{AgentId, Params},
    error::StrandResult,
};
use strand_core::{ActionRef, Agent};
use strand_runtime::AgentFactory;

use crate::actions::{Finish, Increment, Sleep};

/// Builds counter workers named `{parent}/{tag}`.
///
/// Options:
/// - `delay_ms`: sleep this long first
/// - `amount`: add it to the counter and finish with the counter as the
///   result; without it the worker starts idle and waits for work
#[derive(Debug, Default, Clone, Copy)]
pub struct CounterWorkerFactory;

impl AgentFactory for CounterWorkerFactory {
    fn build(&self, parent: &AgentId, tag: &str, opts: &Params) -> StrandResult<Agent> {
        let mut worker = Agent::new(AgentId::new(format!("{parent}/{tag}")))
            .with_state(counter_state())
            .with_actions([
                ActionRef::new(Increment),
                ActionRef::new(Finish),
                ActionRef::new(Sleep),
            ])?;

        if let Some(delay) = opts.get("delay_ms").filter(|d| !d.is_null()) {
            worker.plan("sleep", params(json!({ "ms": delay })))?;
        }
        if let Some(amount) = opts.get("amount").filter(|a| !a.is_null()) {
            worker.plan("increment", params(json!({ "amount": amount })))?;
            worker.plan("finish", Params::new())?;
        }
        debug!(worker = %worker.id, pending = worker.pending.len(), "worker built");
        Ok(worker)
    }
}

pub(crate) fn counter_state() -> Params {
    params(json!({ "counter": 0 }))
}

/// A JSON object literal as a param map; anything else is empty.
pub(crate) fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use strand_contracts::agent::{AgentId, Params};
    use strand_runtime::AgentFactory;

    use super::{params, CounterWorkerFactory};

    #[test]
    fn test_worker_with_amount_is_preloaded() {
        let worker = CounterWorkerFactory
            .build(&AgentId::new("boss"), "w1", &params(json!({ "amount": 2, "delay_ms": 5 })))
            .unwrap();

        assert_eq!(worker.id.as_str(), "boss/w1");
        let planned: Vec<&str> = worker.pending.iter().map(|i| i.action_name()).collect();
        assert_eq!(planned, vec!["sleep", "increment", "finish"]);
    }

    #[test]
    fn test_worker_without_amount_starts_idle() {
        let worker = CounterWorkerFactory
            .build(&AgentId::new("boss"), "w2", &Params::new())
            .unwrap();
        assert!(worker.pending.is_empty());
        assert_eq!(worker.state["counter"], json!(0));
    }
}
