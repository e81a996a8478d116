//! Completion coordination: waiting on running agents.
//!
//! Every call is bounded by a timeout and returns a `StrandResult`; none
//! of them panics or blocks anything but the caller. Waits are event
//! driven: each target keeps its own waiter list and answers exactly once
//! when it reaches a terminal status, so nothing here polls except
//! [`Coordinator::await_child`], which has to wait for the parent to record
//! the child before there is anything to wait on.

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::time::Instant;
use tracing::{debug, warn};

use strand_contracts::{
    agent::AgentId,
    completion::Completion,
    error::{StrandError, StrandResult},
    options::DEFAULT_CHILD_POLL_INTERVAL_MS,
};

use crate::handle::AgentHandle;
use crate::registry::{check_id, AgentRef, AgentRegistry};

/// Waits on agents named by handle or by registered id.
#[derive(Debug, Clone)]
pub struct Coordinator {
    registry: AgentRegistry,
    poll_interval: Duration,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(AgentRegistry::new())
    }
}

impl Coordinator {
    pub fn new(registry: AgentRegistry) -> Self {
        Self {
            registry,
            poll_interval: Duration::from_millis(DEFAULT_CHILD_POLL_INTERVAL_MS),
        }
    }

    /// How often `await_child` asks the parent for the child.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    // ── Single waits ─────────────────────────────────────────────────────────

    /// Wait until `target` is terminal. An agent that already is answers
    /// immediately, and asking again gives the same completion.
    ///
    /// # Errors
    ///
    /// - `AwaitTimeout` when the budget runs out first
    /// - `ProcessDown` when the agent exits or is unknown
    /// - `InvalidAsyncHandle` for a blank id
    pub async fn await_one(
        &self,
        target: impl Into<AgentRef>,
        timeout: Duration,
    ) -> StrandResult<Completion> {
        let handle = self.registry.resolve(&target.into())?;
        tokio::time::timeout(timeout, completion_of(&handle))
            .await
            .map_err(|_| await_timeout(timeout))?
    }

    /// Wait for the child the parent records under `tag`, then for its
    /// completion, all within one budget.
    pub async fn await_child(
        &self,
        parent: impl Into<AgentRef>,
        tag: &str,
        timeout: Duration,
    ) -> StrandResult<Completion> {
        let deadline = Instant::now() + timeout;
        let parent = self.registry.resolve(&parent.into())?;

        let child = tokio::time::timeout_at(deadline, self.find_child(&parent, tag))
            .await
            .map_err(|_| await_timeout(timeout))??;
        debug!(
            parent = %parent.id(),
            tag,
            child = %child.id(),
            remaining_ms = deadline.saturating_duration_since(Instant::now()).as_millis() as u64,
            "child found, awaiting completion"
        );

        tokio::time::timeout_at(deadline, completion_of(&child))
            .await
            .map_err(|_| await_timeout(timeout))?
    }

    async fn find_child(&self, parent: &AgentHandle, tag: &str) -> StrandResult<AgentHandle> {
        loop {
            if let Some(child) = parent.child(tag).await? {
                return Ok(child);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    // ── Group waits ──────────────────────────────────────────────────────────

    /// Barrier: wait until every target is terminal.
    ///
    /// The first infrastructure error (an agent that exits or cannot be
    /// resolved) fails the whole call right away, naming that agent, and
    /// the remaining waits are dropped. An empty set completes at once.
    pub async fn await_all<T>(
        &self,
        targets: impl IntoIterator<Item = T>,
        timeout: Duration,
    ) -> StrandResult<BTreeMap<AgentId, Completion>>
    where
        T: Into<AgentRef>,
    {
        let handles = self.resolve_all(targets)?;
        let mut waits: FuturesUnordered<_> = handles.iter().map(tagged_completion).collect();

        let barrier = async {
            let mut completions = BTreeMap::new();
            while let Some((id, outcome)) = waits.next().await {
                match outcome {
                    Ok(completion) => {
                        completions.insert(id, completion);
                    }
                    Err(err) => {
                        warn!(agent_id = %id, error = %err, "barrier short-circuited");
                        return Err(err);
                    }
                }
            }
            Ok(completions)
        };

        tokio::time::timeout(timeout, barrier)
            .await
            .map_err(|_| await_timeout(timeout))?
    }

    /// Race: return the first target to reach a terminal status, with its
    /// completion. Errors short-circuit exactly as in [`Self::await_all`].
    ///
    /// # Errors
    ///
    /// `InvalidAsyncHandle` for an empty set: a race without runners has
    /// no winner.
    pub async fn await_any<T>(
        &self,
        targets: impl IntoIterator<Item = T>,
        timeout: Duration,
    ) -> StrandResult<(AgentId, Completion)>
    where
        T: Into<AgentRef>,
    {
        let handles = self.resolve_all(targets)?;
        if handles.is_empty() {
            return Err(StrandError::InvalidAsyncHandle {
                reason: "await_any needs at least one agent".to_string(),
            });
        }
        let mut waits: FuturesUnordered<_> = handles.iter().map(tagged_completion).collect();

        let race = async {
            match waits.next().await {
                Some((id, outcome)) => outcome.map(|completion| (id, completion)),
                None => Err(StrandError::InvalidAsyncHandle {
                    reason: "await_any needs at least one agent".to_string(),
                }),
            }
        };

        tokio::time::timeout(timeout, race)
            .await
            .map_err(|_| await_timeout(timeout))?
    }

    // ── Control ──────────────────────────────────────────────────────────────

    /// Ask `target` to stop cooperatively. Returns without waiting; use
    /// [`Self::await_one`] to observe the resulting `failed` status.
    pub fn cancel(&self, target: impl Into<AgentRef>) -> StrandResult<()> {
        let handle = self.registry.resolve(&target.into())?;
        if !handle.is_alive() {
            return Err(handle.down("agent is not running"));
        }
        handle.cancel();
        Ok(())
    }

    /// Whether `target` is running. An id nobody registered is simply not
    /// alive; a blank id is an error.
    pub fn is_alive(&self, target: impl Into<AgentRef>) -> StrandResult<bool> {
        let target = target.into();
        check_id(target.id())?;
        Ok(match &target {
            AgentRef::Handle(handle) => handle.is_alive(),
            AgentRef::Id(id) => self
                .registry
                .lookup(id)
                .is_some_and(|handle| handle.is_alive()),
        })
    }

    fn resolve_all<T>(&self, targets: impl IntoIterator<Item = T>) -> StrandResult<Vec<AgentHandle>>
    where
        T: Into<AgentRef>,
    {
        targets
            .into_iter()
            .map(|target| self.registry.resolve(&target.into()))
            .collect()
    }
}

/// Register a waiter on `handle` and wait for its answer.
async fn completion_of(handle: &AgentHandle) -> StrandResult<Completion> {
    handle
        .watch()?
        .await
        .map_err(|_| handle.down("agent exited before completing"))
}

async fn tagged_completion(handle: &AgentHandle) -> (AgentId, StrandResult<Completion>) {
    (handle.id().clone(), completion_of(handle).await)
}

fn await_timeout(timeout: Duration) -> StrandError {
    StrandError::AwaitTimeout {
        timeout_ms: timeout.as_millis() as u64,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use strand_contracts::{
        agent::AgentId,
        completion::AgentStatus,
        error::StrandError,
    };

    use crate::registry::AgentRegistry;
    use crate::server::{AgentServer, CANCELLED};
    use crate::test_support::{counter_agent, executor, map, WorkerFactory};

    use super::Coordinator;

    const WAIT: Duration = Duration::from_secs(2);

    fn setup() -> (AgentServer, Coordinator) {
        let registry = AgentRegistry::new();
        let server = AgentServer::new(executor())
            .with_registry(registry.clone())
            .with_factory("worker", WorkerFactory);
        (server, Coordinator::new(registry).with_poll_interval(Duration::from_millis(10)))
    }

    #[tokio::test]
    async fn test_await_one_by_handle_and_by_id() {
        let (server, coordinator) = setup();
        let handle = server.spawn(counter_agent("co-1"));
        handle.plan("add", map(json!({ "amount": 4 }))).await.unwrap();
        handle.plan("finish", map(json!({}))).await.unwrap();

        let by_handle = coordinator.await_one(&handle, WAIT).await.unwrap();
        let by_id = coordinator.await_one("co-1", WAIT).await.unwrap();

        assert_eq!(by_handle.status, AgentStatus::Completed);
        assert_eq!(by_handle.result, Some(json!(4)));
        assert_eq!(by_handle, by_id);
    }

    #[tokio::test]
    async fn test_await_one_times_out() {
        let (server, coordinator) = setup();
        let handle = server.spawn(counter_agent("co-2"));

        let result = coordinator.await_one(&handle, Duration::from_millis(50)).await;
        assert_eq!(result, Err(StrandError::AwaitTimeout { timeout_ms: 50 }));
        // The agent itself is untouched by the caller giving up.
        assert!(handle.is_alive());
    }

    #[tokio::test]
    async fn test_await_one_on_unknown_and_blank_ids() {
        let coordinator = Coordinator::default();

        let unknown = coordinator.await_one("ghost", WAIT).await;
        assert!(matches!(unknown, Err(StrandError::ProcessDown { .. })));

        let blank = coordinator.await_one(AgentId::new(" "), WAIT).await;
        assert!(matches!(blank, Err(StrandError::InvalidAsyncHandle { .. })));
    }

    #[tokio::test]
    async fn test_await_all_collects_every_completion() {
        let (server, coordinator) = setup();
        let mut handles = Vec::new();
        for (id, amount) in [("co-a", 1), ("co-b", 2), ("co-c", 3)] {
            let handle = server.spawn(counter_agent(id));
            handle.plan("add", map(json!({ "amount": amount }))).await.unwrap();
            handle.plan("finish", map(json!({}))).await.unwrap();
            handles.push(handle);
        }

        let completions = coordinator.await_all(&handles, WAIT).await.unwrap();
        assert_eq!(completions.len(), 3);
        assert_eq!(completions[&AgentId::new("co-b")].result, Some(json!(2)));
        assert!(completions.values().all(|c| c.status == AgentStatus::Completed));
    }

    #[tokio::test]
    async fn test_await_all_of_nothing_is_empty() {
        let coordinator = Coordinator::default();
        let completions = coordinator
            .await_all(Vec::<AgentId>::new(), WAIT)
            .await
            .unwrap();
        assert!(completions.is_empty());
    }

    /// A stopped agent fails the barrier at once, named in the error,
    /// instead of the barrier running into its timeout.
    #[tokio::test]
    async fn test_await_all_short_circuits_on_process_down() {
        let (server, coordinator) = setup();
        let slow = server.spawn(counter_agent("co-slow"));
        slow.plan("sleep", map(json!({ "ms": 1_000 }))).await.unwrap();
        let doomed = server.spawn(counter_agent("co-doomed"));

        let barrier = coordinator.await_all([slow.clone(), doomed.clone()], Duration::from_secs(5));
        let stopper = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            doomed.stop().unwrap();
        };
        let started = tokio::time::Instant::now();
        let (result, ()) = tokio::join!(barrier, stopper);

        match result {
            Err(StrandError::ProcessDown { agent_id, .. }) => assert_eq!(agent_id, "co-doomed"),
            other => panic!("expected ProcessDown, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_await_any_returns_first_finisher() {
        let (server, coordinator) = setup();
        let slow = server.spawn(counter_agent("co-tortoise"));
        slow.plan("sleep", map(json!({ "ms": 500 }))).await.unwrap();
        let fast = server.spawn(counter_agent("co-hare"));
        fast.plan("finish", map(json!({}))).await.unwrap();

        let (winner, completion) = coordinator.await_any([&slow, &fast], WAIT).await.unwrap();
        assert_eq!(winner.as_str(), "co-hare");
        assert_eq!(completion.status, AgentStatus::Completed);
    }

    #[tokio::test]
    async fn test_await_any_of_nothing_is_invalid() {
        let coordinator = Coordinator::default();
        let result = coordinator.await_any(Vec::<AgentId>::new(), WAIT).await;
        assert!(matches!(result, Err(StrandError::InvalidAsyncHandle { .. })));
    }

    #[tokio::test]
    async fn test_await_child_waits_for_spawn_then_completion() {
        let (server, coordinator) = setup();
        let parent = server.spawn(counter_agent("co-parent"));
        parent
            .plan("spawn", map(json!({ "tag": "w1", "amount": 3 })))
            .await
            .unwrap();

        let completion = coordinator.await_child(&parent, "w1", WAIT).await.unwrap();
        assert_eq!(completion.status, AgentStatus::Completed);
        assert_eq!(completion.result, Some(json!(3)));
        assert!(coordinator.registry().lookup(&AgentId::new("co-parent/w1")).is_some());
    }

    #[tokio::test]
    async fn test_await_child_times_out_without_child() {
        let (server, coordinator) = setup();
        let parent = server.spawn(counter_agent("co-lonely"));

        let result = coordinator
            .await_child(&parent, "missing", Duration::from_millis(60))
            .await;
        assert_eq!(result, Err(StrandError::AwaitTimeout { timeout_ms: 60 }));
    }

    #[tokio::test]
    async fn test_cancel_then_await() {
        let (server, coordinator) = setup();
        let handle = server.spawn(counter_agent("co-cancel"));
        handle.plan("sleep", map(json!({ "ms": 100 }))).await.unwrap();

        coordinator.cancel("co-cancel").unwrap();
        let completion = coordinator.await_one(&handle, WAIT).await.unwrap();
        assert_eq!(completion.status, AgentStatus::Failed);
        assert_eq!(completion.error.as_deref(), Some(CANCELLED));
    }

    #[tokio::test]
    async fn test_cancel_of_dead_agent_is_process_down() {
        let (server, coordinator) = setup();
        let handle = server.spawn(counter_agent("co-dead"));
        handle.stop().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(matches!(coordinator.cancel(&handle), Err(StrandError::ProcessDown { .. })));
    }

    #[tokio::test]
    async fn test_is_alive() {
        let (server, coordinator) = setup();
        let handle = server.spawn(counter_agent("co-alive"));

        assert_eq!(coordinator.is_alive(&handle), Ok(true));
        assert_eq!(coordinator.is_alive("co-alive"), Ok(true));
        assert_eq!(coordinator.is_alive("nobody"), Ok(false));
        assert!(matches!(
            coordinator.is_alive(""),
            Err(StrandError::InvalidAsyncHandle { .. })
        ));

        handle.stop().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(coordinator.is_alive(&handle), Ok(false));
        assert_eq!(coordinator.is_alive("co-alive"), Ok(false));
    }
}
