//! Agent handles and the mailbox protocol.
//!
//! An `AgentHandle` is the only way to talk to a running agent server. It
//! is cheap to clone and carries nothing but the agent id, the mailbox
//! sender and the agent's cancellation token. Every request is a
//! [`Command`]; replies come back on a oneshot channel. A dropped reply
//! sender means the server went away before answering.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use strand_contracts::{
    agent::{AgentId, Params},
    completion::Completion,
    error::{StrandError, StrandResult},
};
use strand_core::{Agent, Instruction};

/// A request to an agent server.
#[derive(Debug)]
pub enum Command {
    /// Append instructions and drain. Either every instruction is accepted
    /// or none is.
    Enqueue {
        instructions: Vec<Instruction>,
        reply: oneshot::Sender<StrandResult<()>>,
    },
    /// Enqueue a registered action by name.
    Plan {
        action: String,
        params: Params,
        reply: oneshot::Sender<StrandResult<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<Agent>,
    },
    Status {
        reply: oneshot::Sender<Completion>,
    },
    /// Register a completion waiter. The sender is kept until the agent
    /// reaches a terminal status and is then used exactly once.
    Await {
        waiter: oneshot::Sender<Completion>,
    },
    RegisterChild {
        tag: String,
        child: AgentHandle,
    },
    GetChild {
        tag: String,
        reply: oneshot::Sender<Option<AgentHandle>>,
    },
    Stop,
}

/// A cloneable reference to a running agent server.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    id: AgentId,
    tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
}

impl AgentHandle {
    pub(crate) fn new(
        id: AgentId,
        tx: mpsc::UnboundedSender<Command>,
        cancel: CancellationToken,
    ) -> Self {
        Self { id, tx, cancel }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// True while the server (or its supervisor) still accepts commands.
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn enqueue(&self, instructions: Vec<Instruction>) -> StrandResult<()> {
        self.request(|reply| Command::Enqueue { instructions, reply })
            .await?
    }

    pub async fn plan(&self, action: impl Into<String>, params: Params) -> StrandResult<()> {
        let action = action.into();
        self.request(|reply| Command::Plan { action, params, reply })
            .await?
    }

    /// A copy of the agent value as the server currently holds it.
    pub async fn snapshot(&self) -> StrandResult<Agent> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn status(&self) -> StrandResult<Completion> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Register a completion waiter and return its receiving end.
    ///
    /// The receiver resolves once the agent is terminal (immediately if it
    /// already is). It errors if the server exits first.
    pub fn watch(&self) -> StrandResult<oneshot::Receiver<Completion>> {
        let (waiter, rx) = oneshot::channel();
        self.send(Command::Await { waiter })?;
        Ok(rx)
    }

    pub fn register_child(&self, tag: impl Into<String>, child: AgentHandle) -> StrandResult<()> {
        self.send(Command::RegisterChild {
            tag: tag.into(),
            child,
        })
    }

    pub async fn child(&self, tag: impl Into<String>) -> StrandResult<Option<AgentHandle>> {
        let tag = tag.into();
        self.request(|reply| Command::GetChild { tag, reply }).await
    }

    /// Request cooperative termination. Returns immediately; the server
    /// stops between runner invocations and marks the agent failed.
    pub fn cancel(&self) {
        debug!(agent_id = %self.id, "cancellation requested");
        self.cancel.cancel();
    }

    /// Ask the server to exit. Pending waiters observe `ProcessDown`.
    pub fn stop(&self) -> StrandResult<()> {
        self.send(Command::Stop)
    }

    pub(crate) fn down(&self, reason: &str) -> StrandError {
        StrandError::ProcessDown {
            agent_id: self.id.to_string(),
            reason: reason.to_string(),
        }
    }

    fn send(&self, command: Command) -> StrandResult<()> {
        self.tx
            .send(command)
            .map_err(|_| self.down("agent is not running"))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> StrandResult<T> {
        let (reply, rx) = oneshot::channel();
        self.send(build(reply))?;
        rx.await
            .map_err(|_| self.down("agent exited before replying"))
    }
}
