//! Counter arithmetic and a self-enqueueing countdown.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use strand_contracts::{
    agent::Params,
    error::{StrandError, StrandResult},
    schema::{FieldSpec, FieldType},
};
use strand_core::{traits::Action, ActionOutput, ActionRef, Directive};

use super::int_field;

/// Upper bound on a countdown's starting value.
///
/// A countdown from `n` takes `n + 1` runner invocations, so this keeps the
/// whole countdown inside one drain of the reference server
/// (`max_iterations = 50`). A server with a smaller limit stops the drain
/// part-way and leaves the agent idle with the next tick still queued.
pub const MAX_COUNTDOWN: i64 = 49;

/// `counter += amount`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Increment;

#[async_trait]
impl Action for Increment {
    fn name(&self) -> &str {
        "increment"
    }

    fn description(&self) -> &str {
        "Add `amount` to the counter"
    }

    fn schema(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::new("amount", FieldType::Integer)
            .with_default(json!(1))
            .with_doc("Value added to the counter")]
    }

    async fn run(&self, params: Params, context: Params) -> StrandResult<ActionOutput> {
        let counter = int_field(&params, &context, "counter").unwrap_or(0);
        let amount = params.get("amount").and_then(Value::as_i64).unwrap_or(1);
        let next = counter.checked_add(amount).ok_or_else(|| {
            StrandError::execution("increment", format!("{counter} + {amount} overflows"))
        })?;
        Ok(ActionOutput::from_value(json!({ "counter": next })))
    }
}

/// `counter *= factor`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Multiply;

#[async_trait]
impl Action for Multiply {
    fn name(&self) -> &str {
        "multiply"
    }

    fn description(&self) -> &str {
        "Multiply the counter by `factor`"
    }

    fn schema(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::required("factor", FieldType::Integer)]
    }

    async fn run(&self, params: Params, context: Params) -> StrandResult<ActionOutput> {
        let counter = int_field(&params, &context, "counter").unwrap_or(0);
        let factor = params.get("factor").and_then(Value::as_i64).unwrap_or(1);
        let next = counter.checked_mul(factor).ok_or_else(|| {
            StrandError::execution("multiply", format!("{counter} * {factor} overflows"))
        })?;
        Ok(ActionOutput::from_value(json!({ "counter": next })))
    }
}

/// Counts `remaining` down to zero, one tick per instruction.
///
/// Each run with `remaining > 0` enqueues the next tick through a directive,
/// so the recursion is explicit and every tick is a separate instruction
/// the agent server counts against its iteration limit. At zero the agent
/// is marked completed with the number of ticks as its result.
#[derive(Debug, Default, Clone, Copy)]
pub struct Countdown;

#[async_trait]
impl Action for Countdown {
    fn name(&self) -> &str {
        "countdown"
    }

    fn description(&self) -> &str {
        "Tick down to zero by re-enqueueing itself"
    }

    fn schema(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::required("remaining", FieldType::Integer)
            .with_constraints(json!({ "minimum": 0, "maximum": MAX_COUNTDOWN }))]
    }

    async fn run(&self, params: Params, context: Params) -> StrandResult<ActionOutput> {
        let remaining = params.get("remaining").and_then(Value::as_i64).unwrap_or(0);
        let ticks = int_field(&Params::new(), &context, "ticks").unwrap_or(0);

        if remaining <= 0 {
            debug!(ticks, "countdown finished");
            return Ok(ActionOutput::from_value(json!({
                "status": "completed",
                "result": ticks,
            })));
        }

        let mut next = Params::new();
        next.insert("remaining".to_string(), json!(remaining - 1));
        Ok(ActionOutput::from_value(json!({
            "ticks": ticks + 1,
            "remaining": remaining - 1,
        }))
        .with_directive(Directive::enqueue(ActionRef::new(Countdown), next)))
    }
}
