//! The agent server: one task per agent, owning its state.
//!
//! The server takes commands from its mailbox, drains the agent's queue
//! with the configured runner after every accepted enqueue, performs the
//! runtime directives the runner hands back, and notifies completion
//! waiters exactly once when the agent reaches a terminal status.
//!
//! While a runner invocation is in flight the mailbox keeps being served:
//! status queries report `running`, waiters are registered, new
//! instructions are buffered until the invocation returns, and snapshot
//! requests are answered once the drain is over. All waiter
//! registration and every status transition happen on the server task, so
//! a waiter can never miss the transition it waits for.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use strand_contracts::{
    agent::Params,
    completion::{AgentStatus, Completion},
    error::{StrandError, StrandResult},
    options::{RunnerKind, ServerOptions},
};
use strand_core::{
    traits::Runner, Agent, ChainRunner, Directive, Executor, Instruction, RunResult, SimpleRunner,
};

use crate::handle::{AgentHandle, Command};
use crate::handler::{AgentFactory, DirectiveHandler, LoggingHandler};
use crate::registry::AgentRegistry;

/// Failure recorded when an agent is cancelled.
pub const CANCELLED: &str = "cancelled";

/// Everything needed to start agent servers: the shared executor, server
/// options, the directive handler, child factories and an optional
/// registry. Cheap to clone; every server it starts (including children
/// spawned through `SpawnAgent`) shares the same configuration.
#[derive(Clone)]
pub struct AgentServer {
    executor: Arc<Executor>,
    options: ServerOptions,
    handler: Arc<dyn DirectiveHandler>,
    factories: BTreeMap<String, Arc<dyn AgentFactory>>,
    registry: Option<AgentRegistry>,
}

impl AgentServer {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self {
            executor,
            options: ServerOptions::default(),
            handler: Arc::new(LoggingHandler),
            factories: BTreeMap::new(),
            registry: None,
        }
    }

    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_handler(mut self, handler: impl DirectiveHandler + 'static) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    /// Handle `SpawnAgent { agent_module: module, .. }` with `factory`.
    pub fn with_factory(mut self, module: impl Into<String>, factory: impl AgentFactory + 'static) -> Self {
        self.factories.insert(module.into(), Arc::new(factory));
        self
    }

    /// Register every started agent (children included) in `registry`.
    pub fn with_registry(mut self, registry: AgentRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn registry(&self) -> Option<&AgentRegistry> {
        self.registry.as_ref()
    }

    /// Start an unsupervised server for `agent`. Pending instructions the
    /// agent already carries are drained right away.
    pub fn spawn(&self, agent: Agent) -> AgentHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = AgentHandle::new(agent.id.clone(), tx, CancellationToken::new());
        if let Some(registry) = &self.registry {
            registry.register(handle.clone());
        }
        self.serve(agent, rx, handle.cancel_token());
        handle
    }

    /// Run one server incarnation on `rx`.
    pub(crate) fn serve(
        &self,
        agent: Agent,
        rx: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let state = ServerState::new(self.clone(), agent, cancel);
        tokio::spawn(state.run(rx))
    }
}

struct ServerState {
    server: AgentServer,
    runner: Arc<dyn Runner>,
    agent: Agent,
    /// Instructions accepted while a runner invocation was in flight.
    incoming: Vec<Instruction>,
    children: BTreeMap<String, AgentHandle>,
    waiters: Vec<oneshot::Sender<Completion>>,
    snapshot_requests: Vec<oneshot::Sender<Agent>>,
    failure: Option<String>,
    cancel: CancellationToken,
    cancel_seen: bool,
    draining: bool,
    stopping: bool,
}

impl ServerState {
    fn new(server: AgentServer, agent: Agent, cancel: CancellationToken) -> Self {
        let runner: Arc<dyn Runner> = match server.options.runner {
            RunnerKind::Simple => Arc::new(SimpleRunner::new(Arc::clone(&server.executor))),
            RunnerKind::Chain => Arc::new(ChainRunner::new(Arc::clone(&server.executor))),
        };
        Self {
            server,
            runner,
            agent,
            incoming: Vec::new(),
            children: BTreeMap::new(),
            waiters: Vec::new(),
            snapshot_requests: Vec::new(),
            failure: None,
            cancel,
            cancel_seen: false,
            draining: false,
            stopping: false,
        }
    }

    // Boxed so that a server can start child servers of its own type.
    fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            info!(agent_id = %self.agent.id, pending = self.agent.pending.len(), "agent server started");

            if !self.agent.pending.is_empty() {
                self.drain(&mut rx).await;
            }

            let cancel = self.cancel.clone();
            while !self.stopping {
                tokio::select! {
                    _ = cancel.cancelled(), if !self.cancel_seen => self.on_cancel(),
                    command = rx.recv() => match command {
                        Some(command) => {
                            if self.apply(command) {
                                self.drain(&mut rx).await;
                            }
                        }
                        None => break,
                    },
                }
            }

            if let Some(registry) = &self.server.registry {
                registry.deregister(&self.agent.id);
            }
            info!(
                agent_id = %self.agent.id,
                status = self.status().as_str(),
                dropped_waiters = self.waiters.len(),
                "agent server stopped"
            );
        })
    }

    /// Apply one command. Returns true when new instructions were accepted
    /// and the queue should be drained.
    fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Enqueue { instructions, reply } => {
                let result = self.accept(instructions);
                let accepted = result.is_ok();
                let _ = reply.send(result);
                accepted
            }
            Command::Plan { action, params, reply } => {
                let result = self
                    .instruction_for(&action, params)
                    .and_then(|instruction| self.accept(vec![instruction]));
                let accepted = result.is_ok();
                let _ = reply.send(result);
                accepted
            }
            Command::Snapshot { reply } => {
                if self.draining {
                    self.snapshot_requests.push(reply);
                } else {
                    let _ = reply.send(self.agent.clone());
                }
                false
            }
            Command::Status { reply } => {
                let _ = reply.send(self.completion());
                false
            }
            Command::Await { waiter } => {
                self.register_waiter(waiter);
                false
            }
            Command::RegisterChild { tag, child } => {
                debug!(agent_id = %self.agent.id, tag = %tag, child = %child.id(), "child registered");
                self.children.insert(tag, child);
                false
            }
            Command::GetChild { tag, reply } => {
                let _ = reply.send(self.children.get(&tag).cloned());
                false
            }
            Command::Stop => {
                debug!(agent_id = %self.agent.id, "stop requested");
                self.stopping = true;
                false
            }
        }
    }

    /// Check a batch against the action registry and buffer it whole.
    fn accept(&mut self, instructions: Vec<Instruction>) -> StrandResult<()> {
        let status = self.status();
        if status.is_terminal() {
            return Err(StrandError::InvalidAction {
                reason: format!(
                    "agent '{}' is {} and accepts no further instructions",
                    self.agent.id,
                    status.as_str()
                ),
            });
        }
        if let Some(unknown) = instructions
            .iter()
            .find(|i| !self.agent.actions.contains_key(i.action_name()))
        {
            return Err(StrandError::InvalidAction {
                reason: format!(
                    "action '{}' is not registered on agent '{}'",
                    unknown.action_name(),
                    self.agent.id
                ),
            });
        }
        self.incoming.extend(instructions);
        Ok(())
    }

    fn instruction_for(&self, action: &str, params: Params) -> StrandResult<Instruction> {
        self.agent
            .actions
            .get(action)
            .cloned()
            .map(|action_ref| Instruction::new(action_ref, params))
            .ok_or_else(|| StrandError::InvalidAction {
                reason: format!("action '{action}' is not registered on agent '{}'", self.agent.id),
            })
    }

    // ── Draining ─────────────────────────────────────────────────────────────

    async fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<Command>) {
        self.absorb_incoming();
        self.draining = true;
        let max_iterations = self.server.options.max_iterations;
        let mut iterations: u32 = 0;

        while !self.agent.pending.is_empty() && !self.stopping {
            if self.cancel.is_cancelled() {
                self.on_cancel();
                break;
            }
            if iterations >= max_iterations {
                warn!(
                    agent_id = %self.agent.id,
                    max_iterations,
                    remaining = self.agent.pending.len(),
                    "drain stopped at iteration limit"
                );
                break;
            }
            iterations += 1;

            let result = self.step(rx).await;
            self.absorb(result).await;
            self.absorb_incoming();

            if self.failure.is_some() {
                break;
            }
        }

        self.draining = false;
        debug!(agent_id = %self.agent.id, iterations, status = self.status().as_str(), "drain finished");
        for reply in self.snapshot_requests.drain(..) {
            let _ = reply.send(self.agent.clone());
        }
        self.notify_if_terminal();
    }

    /// One runner invocation, serving the mailbox until it returns.
    async fn step(&mut self, rx: &mut mpsc::UnboundedReceiver<Command>) -> RunResult {
        let runner = Arc::clone(&self.runner);
        let opts = self.server.options.run.clone();
        let run = runner.run(self.agent.clone(), &opts);
        tokio::pin!(run);

        loop {
            tokio::select! {
                result = &mut run => break result,
                Some(command) = rx.recv() => {
                    // Accepted instructions stay buffered until the step ends.
                    self.apply(command);
                }
            }
        }
    }

    async fn absorb(&mut self, result: RunResult) {
        let RunResult {
            agent,
            directives,
            error,
            executed,
            ..
        } = result;
        self.agent = agent;
        debug!(
            agent_id = %self.agent.id,
            executed = executed.len(),
            directives = directives.len(),
            "runner invocation finished"
        );

        for directive in directives {
            self.perform(directive).await;
        }

        if let Some(err) = error {
            if self.server.options.fail_on_error {
                warn!(agent_id = %self.agent.id, error = %err, "runner failed, agent marked failed");
                self.failure = Some(err.to_string());
            } else {
                warn!(agent_id = %self.agent.id, error = %err, "runner failed, continuing");
            }
        }
    }

    fn absorb_incoming(&mut self) {
        for instruction in std::mem::take(&mut self.incoming) {
            if let Err(err) = self.agent.enqueue(instruction) {
                warn!(agent_id = %self.agent.id, error = %err, "buffered instruction dropped");
            }
        }
    }

    // ── Directives ───────────────────────────────────────────────────────────

    async fn perform(&mut self, directive: Directive) {
        match directive {
            Directive::SpawnAgent {
                agent_module,
                tag,
                opts,
            } if self.server.factories.contains_key(&agent_module) => {
                self.spawn_child(&agent_module, tag, &opts);
            }
            other => {
                let kind = other.kind();
                if let Err(err) = self.server.handler.handle(&self.agent.id, other).await {
                    warn!(agent_id = %self.agent.id, directive = kind, error = %err, "directive handler failed");
                }
            }
        }
    }

    fn spawn_child(&mut self, module: &str, tag: String, opts: &Params) {
        let Some(factory) = self.server.factories.get(module) else {
            return;
        };
        match factory.build(&self.agent.id, &tag, opts) {
            Ok(child) => {
                let handle = self.server.spawn(child);
                info!(agent_id = %self.agent.id, tag = %tag, child = %handle.id(), module, "child agent spawned");
                self.children.insert(tag, handle);
            }
            Err(err) => {
                warn!(agent_id = %self.agent.id, tag = %tag, module, error = %err, "child agent could not be built");
            }
        }
    }

    // ── Status and waiters ───────────────────────────────────────────────────

    fn on_cancel(&mut self) {
        self.cancel_seen = true;
        if self.status().is_terminal() {
            return;
        }
        info!(agent_id = %self.agent.id, pending = self.agent.pending.len(), "agent cancelled");
        self.failure = Some(CANCELLED.to_string());
        if !self.draining {
            self.notify_if_terminal();
        }
    }

    fn status(&self) -> AgentStatus {
        if self.failure.is_some() {
            AgentStatus::Failed
        } else if self.draining {
            AgentStatus::Running
        } else {
            self.agent.reported_status().unwrap_or_default()
        }
    }

    fn completion(&self) -> Completion {
        Completion {
            status: self.status(),
            result: self.agent.published_result(),
            error: self.failure.clone(),
        }
    }

    fn register_waiter(&mut self, waiter: oneshot::Sender<Completion>) {
        if self.status().is_terminal() {
            let _ = waiter.send(self.completion());
            return;
        }
        self.waiters.retain(|w| !w.is_closed());
        self.waiters.push(waiter);
    }

    fn notify_if_terminal(&mut self) {
        if !self.status().is_terminal() || self.waiters.is_empty() {
            return;
        }
        let completion = self.completion();
        debug!(agent_id = %self.agent.id, waiters = self.waiters.len(), status = completion.status.as_str(), "notifying waiters");
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(completion.clone());
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
