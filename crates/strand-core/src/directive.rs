//! The directive model: pure descriptions of effects.
//!
//! An action never performs effects itself. It returns directives, and the
//! layer that receives them decides when and how to perform them. Building
//! a `Directive` has no observable effect.
//!
//! Directives split into two groups:
//!
//! - **agent directives** (`Enqueue`, `RegisterAction`, `DeregisterAction`)
//!   only touch the agent's own queue or action registry and are resolved
//!   by [`apply`];
//! - **runtime directives** (everything else) reach outside the agent and
//!   are returned unexecuted, in production order.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use strand_contracts::{
    agent::Params,
    error::{StrandError, StrandResult},
};

use crate::agent::Agent;
use crate::instruction::{ActionRef, Instruction};

/// A closed set of effect descriptors.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Append an instruction to the agent's own queue.
    Enqueue {
        action: ActionRef,
        params: Params,
        context: Params,
    },
    /// Add an action to the agent's registry of allowed actions.
    RegisterAction { action: ActionRef },
    /// Remove an action (by name) from the agent's registry.
    DeregisterAction { action: String },
    /// Start an arbitrary external process.
    SpawnProcess { module: String, args: Value },
    /// Stop a process previously started by the runtime.
    KillProcess { process: String },
    Publish { topic: String, message: Value },
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    /// Start a child agent and record it under `tag` in the parent.
    SpawnAgent {
        agent_module: String,
        tag: String,
        opts: Params,
    },
    /// Deliver a signal to another process.
    EmitToProcess { target: String, signal: Value },
    /// Deliver a signal back to this agent after a delay.
    ScheduleSignal { delay_ms: u64, signal: Value },
}

impl Directive {
    pub fn enqueue(action: ActionRef, params: Params) -> Self {
        Self::Enqueue {
            action,
            params,
            context: Params::new(),
        }
    }

    pub fn spawn_agent(agent_module: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::SpawnAgent {
            agent_module: agent_module.into(),
            tag: tag.into(),
            opts: Params::new(),
        }
    }

    pub fn publish(topic: impl Into<String>, message: Value) -> Self {
        Self::Publish {
            topic: topic.into(),
            message,
        }
    }

    pub fn emit_to(target: impl Into<String>, signal: Value) -> Self {
        Self::EmitToProcess {
            target: target.into(),
            signal,
        }
    }

    /// Short name of the variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Enqueue { .. } => "enqueue",
            Self::RegisterAction { .. } => "register_action",
            Self::DeregisterAction { .. } => "deregister_action",
            Self::SpawnProcess { .. } => "spawn_process",
            Self::KillProcess { .. } => "kill_process",
            Self::Publish { .. } => "publish",
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::SpawnAgent { .. } => "spawn_agent",
            Self::EmitToProcess { .. } => "emit_to_process",
            Self::ScheduleSignal { .. } => "schedule_signal",
        }
    }

    /// True for directives resolved against the agent's own memory.
    pub fn is_agent_directive(&self) -> bool {
        matches!(
            self,
            Self::Enqueue { .. } | Self::RegisterAction { .. } | Self::DeregisterAction { .. }
        )
    }

    /// Structural validation of a single directive.
    pub fn validate(&self) -> StrandResult<()> {
        match self {
            Self::Enqueue { action, .. } | Self::RegisterAction { action } => {
                action.validate().map_err(|e| invalid(format!("{}: {e}", self.kind())))
            }
            Self::DeregisterAction { action } => non_empty("deregister_action", "action", action),
            Self::SpawnProcess { module, .. } => non_empty("spawn_process", "module", module),
            Self::KillProcess { process } => non_empty("kill_process", "process", process),
            Self::Publish { topic, .. }
            | Self::Subscribe { topic }
            | Self::Unsubscribe { topic } => non_empty(self.kind(), "topic", topic),
            Self::SpawnAgent {
                agent_module, tag, ..
            } => {
                non_empty("spawn_agent", "agent_module", agent_module)?;
                non_empty("spawn_agent", "tag", tag)
            }
            Self::EmitToProcess { target, signal } => {
                non_empty("emit_to_process", "target", target)?;
                validate_signal("emit_to_process", signal)
            }
            Self::ScheduleSignal { signal, .. } => validate_signal("schedule_signal", signal),
        }
    }
}

/// Validate a batch of directives, stopping at the first invalid one.
pub fn validate_all(directives: &[Directive]) -> StrandResult<()> {
    for (idx, directive) in directives.iter().enumerate() {
        directive.validate().map_err(|e| match e {
            StrandError::InvalidDirective { reason } => invalid(format!("#{idx} {reason}")),
            other => other,
        })?;
    }
    Ok(())
}

/// Resolve agent directives against `agent` and return the runtime
/// directives untouched, in the order they were produced.
///
/// The whole batch is checked before anything is applied: either every
/// agent directive takes effect or none does. An `Enqueue` must target an
/// action that is registered on the agent, either already or by an
/// earlier `RegisterAction` in the same batch.
pub fn apply(mut agent: Agent, directives: Vec<Directive>) -> StrandResult<(Agent, Vec<Directive>)> {
    validate_all(&directives)?;

    let mut registered: BTreeSet<String> = agent.actions.keys().cloned().collect();
    for directive in &directives {
        match directive {
            Directive::RegisterAction { action } => {
                registered.insert(action.name().to_string());
            }
            Directive::DeregisterAction { action } => {
                registered.remove(action);
            }
            Directive::Enqueue { action, .. } if !registered.contains(action.name()) => {
                return Err(StrandError::InvalidAction {
                    reason: format!(
                        "cannot enqueue '{}': action is not registered on agent '{}'",
                        action.name(),
                        agent.id
                    ),
                });
            }
            _ => {}
        }
    }

    let mut runtime = Vec::new();
    for directive in directives {
        match directive {
            Directive::Enqueue {
                action,
                params,
                context,
            } => {
                debug!(agent_id = %agent.id, action = %action.name(), "directive enqueued instruction");
                agent
                    .pending
                    .push_back(Instruction::new(action, params).with_context(context));
            }
            Directive::RegisterAction { action } => {
                debug!(agent_id = %agent.id, action = %action.name(), "directive registered action");
                agent.actions.insert(action.name().to_string(), action);
            }
            Directive::DeregisterAction { action } => {
                if agent.actions.remove(&action).is_none() {
                    debug!(agent_id = %agent.id, action = %action, "deregister of unknown action ignored");
                }
            }
            other => runtime.push(other),
        }
    }

    Ok((agent, runtime))
}

fn invalid(reason: String) -> StrandError {
    StrandError::InvalidDirective { reason }
}

fn non_empty(kind: &str, field: &str, value: &str) -> StrandResult<()> {
    if value.trim().is_empty() {
        Err(invalid(format!("{kind}: '{field}' must not be empty")))
    } else {
        Ok(())
    }
}

/// Signals must be maps carrying a non-empty string `type`.
fn validate_signal(kind: &str, signal: &Value) -> StrandResult<()> {
    match signal.get("type").and_then(Value::as_str) {
        Some(t) if !t.trim().is_empty() => Ok(()),
        _ => Err(invalid(format!("{kind}: signal requires a non-empty 'type'"))),
    }
}
