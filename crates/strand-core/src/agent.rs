//! The agent value.
//!
//! An `Agent` is a plain, cloneable snapshot: id, state map, FIFO queue of
//! pending instructions, the registry of actions it may run, and the result
//! of its most recent step. Runners take it by value and hand back a new
//! one; nothing mutates an agent behind the caller's back.

use std::collections::{BTreeMap, VecDeque};

use serde_json::Value;

use strand_contracts::{
    agent::{merge, AgentId, Params},
    completion::AgentStatus,
    error::{StrandError, StrandResult},
};

use crate::instruction::{ActionRef, Instruction};

/// State key an agent uses to report its own lifecycle status.
pub const STATUS_KEY: &str = "status";
/// State key an agent uses to publish its final result.
pub const RESULT_KEY: &str = "result";

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    /// Opaque agent-owned state. Only runner-applied deltas change it.
    pub state: Params,
    pub pending: VecDeque<Instruction>,
    /// Actions this agent is allowed to run, keyed by name.
    pub actions: BTreeMap<String, ActionRef>,
    /// Output of the most recently executed step.
    pub result: Option<Value>,
}

impl Agent {
    pub fn new(id: AgentId) -> Self {
        Self {
            id,
            state: Params::new(),
            pending: VecDeque::new(),
            actions: BTreeMap::new(),
            result: None,
        }
    }

    pub fn with_state(mut self, state: Params) -> Self {
        self.state = state;
        self
    }

    /// Register every action in `actions`, failing on the first malformed one.
    pub fn with_actions(mut self, actions: impl IntoIterator<Item = ActionRef>) -> StrandResult<Self> {
        for action in actions {
            self.register_action(action)?;
        }
        Ok(self)
    }

    /// Add an action to the registry, replacing one with the same name.
    pub fn register_action(&mut self, action: ActionRef) -> StrandResult<()> {
        action.validate()?;
        self.actions.insert(action.name().to_string(), action);
        Ok(())
    }

    /// Returns false if no action with that name was registered.
    pub fn deregister_action(&mut self, name: &str) -> bool {
        self.actions.remove(name).is_some()
    }

    /// Append an instruction. Its action must be registered on this agent.
    pub fn enqueue(&mut self, instruction: Instruction) -> StrandResult<()> {
        let name = instruction.action_name();
        if !self.actions.contains_key(name) {
            return Err(StrandError::InvalidAction {
                reason: format!("action '{name}' is not registered on agent '{}'", self.id),
            });
        }
        self.pending.push_back(instruction);
        Ok(())
    }

    /// Look up a registered action by name and enqueue it with `params`.
    pub fn plan(&mut self, action: &str, params: Params) -> StrandResult<()> {
        let action_ref = self
            .actions
            .get(action)
            .cloned()
            .ok_or_else(|| StrandError::InvalidAction {
                reason: format!("action '{action}' is not registered on agent '{}'", self.id),
            })?;
        self.enqueue(Instruction::new(action_ref, params))
    }

    pub fn dequeue(&mut self) -> Option<Instruction> {
        self.pending.pop_front()
    }

    pub fn merge_state(&mut self, delta: &Params) {
        merge(&mut self.state, delta);
    }

    /// The status the agent reports about itself through its state, if any.
    pub fn reported_status(&self) -> Option<AgentStatus> {
        self.state.get(STATUS_KEY).and_then(AgentStatus::from_state_value)
    }

    /// The agent's published result: the `result` state key, falling back
    /// to the output of the last executed step.
    pub fn published_result(&self) -> Option<Value> {
        self.state
            .get(RESULT_KEY)
            .cloned()
            .or_else(|| self.result.clone())
    }
}
