//! Reference actions.
//!
//! Every action reads the agent's state from the `state` entry of its
//! context and returns a state delta. None of them performs effects beyond
//! its own return value, except `Transfer`, which moves money in a shared
//! [`transfer::Ledger`] and knows how to undo a half-finished move.

pub mod counter;
pub mod lifecycle;
pub mod transfer;

pub use counter::{Countdown, Increment, Multiply};
pub use lifecycle::{Fail, Finish, Sleep, SpawnWorker, WORKER_MODULE};
pub use transfer::{Ledger, Transfer};

use serde_json::Value;

use strand_contracts::agent::Params;
use strand_core::runner::STATE_CONTEXT_KEY;

/// An integer field, taken from the params first (explicit values and
/// chain-piped output), then from the agent state.
pub(crate) fn int_field(params: &Params, context: &Params, key: &str) -> Option<i64> {
    params
        .get(key)
        .and_then(Value::as_i64)
        .or_else(|| state_field(context, key).and_then(Value::as_i64))
}

pub(crate) fn state_field<'a>(context: &'a Params, key: &str) -> Option<&'a Value> {
    context.get(STATE_CONTEXT_KEY).and_then(|state| state.get(key))
}
