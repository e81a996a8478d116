//! Agent identity and the map types that flow through the runtime.
//!
//! STRAND does not prescribe the shape of agent state. State, params and
//! context are all plain JSON maps; the runtime only merges and forwards
//! them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StrandError, StrandResult};

/// A canonical key-value map. Used for agent state, params and context.
pub type Params = Map<String, Value>;

/// Stable identifier for one agent instance.
///
/// Example: AgentId("order-agent-7")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Wrap any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique reference correlating an asynchronous execution with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub uuid::Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Coerce `value` into a canonical map.
///
/// Accepted shapes:
/// - a JSON object (returned as-is)
/// - `null` (an empty map)
/// - a list of `[key, value]` pairs with string keys
///
/// Anything else is a `Validation` error naming `what` ("params" or
/// "context").
pub fn normalize(what: &str, value: Value) -> StrandResult<Params> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Params::new()),
        Value::Array(items) => {
            let mut map = Params::new();
            for item in items {
                match item {
                    Value::Array(pair) if pair.len() == 2 => {
                        let mut pair = pair.into_iter();
                        let (key, val) = match (pair.next(), pair.next()) {
                            (Some(Value::String(k)), Some(v)) => (k, v),
                            _ => {
                                return Err(StrandError::validation(
                                    what,
                                    "pair keys must be strings",
                                ))
                            }
                        };
                        map.insert(key, val);
                    }
                    other => {
                        return Err(StrandError::validation(
                            what,
                            format!("expected a [key, value] pair, got {other}"),
                        ))
                    }
                }
            }
            Ok(map)
        }
        other => Err(StrandError::validation(
            what,
            format!("expected a map, got {}", type_name(&other)),
        )),
    }
}

/// Shallow, last-write-wins merge of `delta` into `state`.
///
/// Keys absent from `delta` are left untouched.
pub fn merge(state: &mut Params, delta: &Params) {
    for (key, value) in delta {
        state.insert(key.clone(), value.clone());
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
