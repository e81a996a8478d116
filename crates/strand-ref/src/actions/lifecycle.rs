//! Actions that move an agent through its lifecycle.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use strand_contracts::{
    agent::Params,
    error::{StrandError, StrandResult},
    schema::{FieldSpec, FieldType},
};
use strand_core::{traits::Action, ActionOutput, Directive};

use super::state_field;

/// Module name under which [`SpawnWorker`] asks for children.
pub const WORKER_MODULE: &str = "worker";

/// Marks the agent completed, publishing one of its state keys as the
/// result.
#[derive(Debug, Default, Clone, Copy)]
pub struct Finish;

#[async_trait]
impl Action for Finish {
    fn name(&self) -> &str {
        "finish"
    }

    fn description(&self) -> &str {
        "Mark the agent completed"
    }

    fn schema(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::new("result_key", FieldType::String)
            .with_default(json!("counter"))
            .with_doc("State key published as the agent's result")]
    }

    async fn run(&self, params: Params, context: Params) -> StrandResult<ActionOutput> {
        let key = params
            .get("result_key")
            .and_then(Value::as_str)
            .unwrap_or("counter");
        let result = state_field(&context, key).cloned().unwrap_or(Value::Null);
        Ok(ActionOutput::from_value(json!({
            "status": "completed",
            "result": result,
        })))
    }
}

/// Always fails with `reason`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fail;

#[async_trait]
impl Action for Fail {
    fn name(&self) -> &str {
        "fail"
    }

    fn schema(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::new("reason", FieldType::String).with_default(json!("requested failure"))]
    }

    async fn run(&self, params: Params, _context: Params) -> StrandResult<ActionOutput> {
        let reason = params
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("requested failure");
        Err(StrandError::execution("fail", reason))
    }
}

/// Waits `ms` milliseconds and changes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sleep;

#[async_trait]
impl Action for Sleep {
    fn name(&self) -> &str {
        "sleep"
    }

    fn schema(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::new("ms", FieldType::Integer)
            .with_default(json!(10))
            .with_constraints(json!({ "minimum": 0 }))]
    }

    async fn run(&self, params: Params, _context: Params) -> StrandResult<ActionOutput> {
        let ms = params.get("ms").and_then(Value::as_u64).unwrap_or(10);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(ActionOutput::default())
    }
}

/// Asks the runtime for a worker child recorded under `tag`.
///
/// `amount` and `delay_ms` are handed to the child as options; see
/// [`crate::workers::CounterWorkerFactory`] for what a worker does with them.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpawnWorker;

#[async_trait]
impl Action for SpawnWorker {
    fn name(&self) -> &str {
        "spawn_worker"
    }

    fn description(&self) -> &str {
        "Start a counter worker as a child agent"
    }

    fn schema(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::required("tag", FieldType::String),
            FieldSpec::new("amount", FieldType::Integer),
            FieldSpec::new("delay_ms", FieldType::Integer).with_constraints(json!({ "minimum": 0 })),
        ]
    }

    async fn run(&self, mut params: Params, _context: Params) -> StrandResult<ActionOutput> {
        let tag = match params.remove("tag") {
            Some(Value::String(tag)) => tag,
            _ => return Err(StrandError::validation("tag", "a worker needs a tag")),
        };
        Ok(ActionOutput::from_value(json!({ "spawned": tag })).with_directive(
            Directive::SpawnAgent {
                agent_module: WORKER_MODULE.to_string(),
                tag,
                opts: params,
            },
        ))
    }
}
