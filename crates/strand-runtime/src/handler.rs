//! Seams for performing runtime directives.
//!
//! Runners hand back the directives that reach outside the agent. The agent
//! server performs `SpawnAgent` itself when it has an [`AgentFactory`] for
//! the requested module; everything else goes to a [`DirectiveHandler`].

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::info;

use strand_contracts::{
    agent::{AgentId, Params},
    error::StrandResult,
};
use strand_core::{Agent, Directive};

/// Performs runtime directives on behalf of an agent.
///
/// Errors are reported by the server and never abort the agent.
#[async_trait]
pub trait DirectiveHandler: Send + Sync {
    async fn handle(&self, agent_id: &AgentId, directive: Directive) -> StrandResult<()>;
}

/// Builds the initial value of a child agent for `SpawnAgent`.
pub trait AgentFactory: Send + Sync {
    /// `parent` is the spawning agent, `tag` the name it will know the child
    /// by, `opts` the options carried by the directive.
    fn build(&self, parent: &AgentId, tag: &str, opts: &Params) -> StrandResult<Agent>;
}

/// Logs each directive and otherwise ignores it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl DirectiveHandler for LoggingHandler {
    async fn handle(&self, agent_id: &AgentId, directive: Directive) -> StrandResult<()> {
        info!(agent_id = %agent_id, directive = directive.kind(), "runtime directive");
        Ok(())
    }
}

/// Records every directive it receives, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct RecordingHandler {
    received: Arc<Mutex<Vec<(AgentId, Directive)>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<(AgentId, Directive)> {
        self.lock().clone()
    }

    /// Directive kinds received from `agent_id`.
    pub fn kinds_for(&self, agent_id: &AgentId) -> Vec<&'static str> {
        self.lock()
            .iter()
            .filter(|(id, _)| id == agent_id)
            .map(|(_, d)| d.kind())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(AgentId, Directive)>> {
        self.received.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DirectiveHandler for RecordingHandler {
    async fn handle(&self, agent_id: &AgentId, directive: Directive) -> StrandResult<()> {
        self.lock().push((agent_id.clone(), directive));
        Ok(())
    }
}
