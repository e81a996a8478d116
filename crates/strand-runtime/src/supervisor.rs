//! Restart supervision for agent servers.
//!
//! A supervised agent keeps one stable mailbox for its whole life. The
//! supervisor task owns that mailbox and forwards every command to the
//! current server incarnation. When an incarnation panics, the supervisor
//! starts a fresh one from the initial agent value, provided fewer than
//! `max_restarts` restarts happened within the sliding window. Requests
//! and waiters already delivered to the crashed incarnation are dropped, so
//! their callers observe `ProcessDown`. Commands that arrive after the crash
//! are held and replayed to the next incarnation.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use strand_contracts::options::RestartPolicy;
use strand_core::Agent;

use crate::handle::{AgentHandle, Command};
use crate::server::AgentServer;

pub struct Supervisor;

impl Supervisor {
    /// Start `agent` under supervision and return its stable handle.
    pub fn start(server: &AgentServer, agent: Agent, policy: RestartPolicy) -> AgentHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = AgentHandle::new(agent.id.clone(), tx, cancel.clone());
        if let Some(registry) = server.registry() {
            registry.register(handle.clone());
        }
        info!(
            agent_id = %agent.id,
            max_restarts = policy.max_restarts,
            window_ms = policy.window_ms,
            "starting supervised agent"
        );
        tokio::spawn(supervise(server.clone(), agent, policy, rx, cancel));
        handle
    }
}

async fn supervise(
    server: AgentServer,
    initial: Agent,
    policy: RestartPolicy,
    mut mailbox: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) {
    let mut restarts: VecDeque<Instant> = VecDeque::new();
    let mut held: Vec<Command> = Vec::new();
    let mut incarnation: u32 = 0;

    loop {
        let (inner_tx, inner_rx) = mpsc::unbounded_channel();
        let mut task = server.serve(initial.clone(), inner_rx, cancel.clone());
        for command in held.drain(..) {
            let _ = inner_tx.send(command);
        }

        // ── Forwarding ───────────────────────────────────────────────────────
        let exit = loop {
            tokio::select! {
                biased;
                exit = &mut task => break Some(exit),
                command = mailbox.recv() => match command {
                    Some(command) => {
                        if let Err(mpsc::error::SendError(command)) = inner_tx.send(command) {
                            held.push(command);
                        }
                    }
                    None => break None,
                },
            }
        };

        // ── Exit handling ────────────────────────────────────────────────────
        match exit {
            None => {
                // Every handle is gone: let the incarnation wind down.
                drop(inner_tx);
                let _ = task.await;
                return;
            }
            Some(Ok(())) => {
                info!(agent_id = %initial.id, incarnation, "supervised agent exited normally");
                return;
            }
            Some(Err(join_err)) if join_err.is_panic() => {
                let now = Instant::now();
                while restarts
                    .front()
                    .is_some_and(|t| now.duration_since(*t) > policy.window())
                {
                    restarts.pop_front();
                }

                if (restarts.len() as u32) < policy.max_restarts {
                    restarts.push_back(now);
                    incarnation += 1;
                    warn!(
                        agent_id = %initial.id,
                        incarnation,
                        restarts_in_window = restarts.len(),
                        "agent server crashed, restarting"
                    );
                    continue;
                }

                error!(
                    agent_id = %initial.id,
                    max_restarts = policy.max_restarts,
                    window_ms = policy.window_ms,
                    dropped_commands = held.len(),
                    "restart budget exhausted, giving up"
                );
                if let Some(registry) = server.registry() {
                    registry.deregister(&initial.id);
                }
                return;
            }
            Some(Err(_)) => {
                warn!(agent_id = %initial.id, "agent server task was cancelled");
                return;
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
