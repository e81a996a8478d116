//! Process registry: agent ids to live handles.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use strand_contracts::{
    agent::AgentId,
    error::{StrandError, StrandResult},
};

use crate::handle::AgentHandle;

/// How coordination calls name their target: a handle, or an id to look up
/// in a registry.
#[derive(Debug, Clone)]
pub enum AgentRef {
    Handle(AgentHandle),
    Id(AgentId),
}

impl AgentRef {
    pub fn id(&self) -> &AgentId {
        match self {
            Self::Handle(handle) => handle.id(),
            Self::Id(id) => id,
        }
    }
}

impl From<AgentHandle> for AgentRef {
    fn from(handle: AgentHandle) -> Self {
        Self::Handle(handle)
    }
}

impl From<&AgentHandle> for AgentRef {
    fn from(handle: &AgentHandle) -> Self {
        Self::Handle(handle.clone())
    }
}

impl From<AgentId> for AgentRef {
    fn from(id: AgentId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for AgentRef {
    fn from(id: &str) -> Self {
        Self::Id(AgentId::new(id))
    }
}

/// A shared map of agent ids to handles. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    inner: Arc<RwLock<BTreeMap<AgentId, AgentHandle>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` under its id, replacing any previous entry.
    pub fn register(&self, handle: AgentHandle) {
        debug!(agent_id = %handle.id(), "agent registered");
        self.write().insert(handle.id().clone(), handle);
    }

    pub fn deregister(&self, id: &AgentId) -> Option<AgentHandle> {
        let removed = self.write().remove(id);
        if removed.is_some() {
            debug!(agent_id = %id, "agent deregistered");
        }
        removed
    }

    pub fn lookup(&self, id: &AgentId) -> Option<AgentHandle> {
        self.read().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Turn an `AgentRef` into a handle.
    ///
    /// # Errors
    ///
    /// - `InvalidAsyncHandle` for a blank id
    /// - `ProcessDown` for an id with no registered agent
    pub fn resolve(&self, target: &AgentRef) -> StrandResult<AgentHandle> {
        check_id(target.id())?;
        match target {
            AgentRef::Handle(handle) => Ok(handle.clone()),
            AgentRef::Id(id) => self.lookup(id).ok_or_else(|| StrandError::ProcessDown {
                agent_id: id.to_string(),
                reason: "no agent registered under this id".to_string(),
            }),
        }
    }

    // Entries are whole-value inserts and removes, so a poisoned map is
    // still consistent.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<AgentId, AgentHandle>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<AgentId, AgentHandle>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) fn check_id(id: &AgentId) -> StrandResult<()> {
    if id.is_blank() {
        return Err(StrandError::InvalidAsyncHandle {
            reason: "agent id must not be blank".to_string(),
        });
    }
    Ok(())
}
