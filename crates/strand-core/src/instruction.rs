//! Instructions, action references and action outputs.

use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde_json::Value;

use strand_contracts::{
    agent::Params,
    error::{StrandError, StrandResult},
    options::ExecOptions,
};

use crate::directive::Directive;
use crate::traits::Action;

/// A shared, cloneable reference to an action definition.
///
/// Two references are equal when they name the same action.
#[derive(Clone)]
pub struct ActionRef(Arc<dyn Action>);

impl ActionRef {
    pub fn new<A: Action>(action: A) -> Self {
        Self(Arc::new(action))
    }

    pub fn from_arc(action: Arc<dyn Action>) -> Self {
        Self(action)
    }

    /// Check that the action satisfies the action contract.
    ///
    /// - the name is non-empty and contains only ASCII alphanumerics and
    ///   `_ . : -`
    /// - schema field names are non-empty and unique
    /// - field constraints, when present, are JSON objects
    pub fn validate(&self) -> StrandResult<()> {
        let name = self.0.name();
        if name.is_empty() {
            return Err(StrandError::InvalidAction {
                reason: "action name must not be empty".to_string(),
            });
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
        {
            return Err(StrandError::InvalidAction {
                reason: format!("action name '{name}' contains invalid characters"),
            });
        }

        let mut seen = HashSet::new();
        for field in self.0.schema() {
            if field.name.trim().is_empty() {
                return Err(StrandError::InvalidAction {
                    reason: format!("action '{name}' declares a field with an empty name"),
                });
            }
            if !seen.insert(field.name.clone()) {
                return Err(StrandError::InvalidAction {
                    reason: format!("action '{name}' declares field '{}' twice", field.name),
                });
            }
            if let Some(constraints) = &field.constraints {
                if !constraints.is_object() {
                    return Err(StrandError::InvalidAction {
                        reason: format!(
                            "constraints for field '{}' of action '{name}' must be a map",
                            field.name
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Deref for ActionRef {
    type Target = dyn Action;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl fmt::Debug for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionRef").field(&self.0.name()).finish()
    }
}

impl PartialEq for ActionRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.name() == other.0.name()
    }
}

/// What an action returns on success: a state delta and zero or more
/// directives, in the order they should be applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutput {
    /// Merged shallowly into the caller's state. Never a full replacement.
    pub state: Params,
    pub directives: Vec<Directive>,
}

impl ActionOutput {
    pub fn new(state: Params) -> Self {
        Self {
            state,
            directives: Vec::new(),
        }
    }

    /// Build an output from a JSON object literal. Non-object values yield
    /// an empty delta.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map),
            _ => Self::default(),
        }
    }

    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn with_directives(mut self, directives: impl IntoIterator<Item = Directive>) -> Self {
        self.directives.extend(directives);
        self
    }
}

/// A queued invocation of an action with concrete params and context.
///
/// Immutable once queued. `result` is only filled in on the copy a runner
/// reports back after executing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub action: ActionRef,
    pub params: Params,
    pub context: Params,
    /// Overrides the runner's execution options for this instruction.
    pub opts: Option<ExecOptions>,
    pub result: Option<Params>,
}

impl Instruction {
    pub fn new(action: ActionRef, params: Params) -> Self {
        Self {
            action,
            params,
            context: Params::new(),
            opts: None,
            result: None,
        }
    }

    pub fn with_context(mut self, context: Params) -> Self {
        self.context = context;
        self
    }

    pub fn with_opts(mut self, opts: ExecOptions) -> Self {
        self.opts = Some(opts);
        self
    }

    pub fn action_name(&self) -> &str {
        self.action.name()
    }
}
