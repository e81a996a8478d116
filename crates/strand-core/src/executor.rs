//! The STRAND executor: the bounded, retrying action engine.
//!
//! Every call to [`Executor::run`] follows the same pipeline:
//!
//!   Normalize → Check action → Validate params → [Attempt ⟲ Backoff] → Compensate
//!
//! Each attempt runs the action body as its own tokio task so a stuck
//! action cannot hold the caller past its bound: on timeout the task is
//! aborted. The task is also aborted when the caller itself goes away, so
//! cancelling a [`run_async`](Executor::run_async) execution stops the
//! action body too. Side effects the action already performed are not
//! rolled back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use strand_contracts::{
    agent::{normalize, CorrelationId, Params},
    error::{StrandError, StrandResult},
    options::{ExecOptions, TelemetryLevel},
    telemetry::{EventKind, TelemetryEvent},
};

use crate::instruction::{ActionOutput, ActionRef};
use crate::traits::{ParamValidator, TelemetrySink};

/// The action execution engine.
///
/// Owns the trusted collaborators (param validator and telemetry sink) and
/// applies the same pipeline to every action it runs. One executor is
/// typically shared (via `Arc`) by every runner in a process.
pub struct Executor {
    validator: Box<dyn ParamValidator>,
    telemetry: Box<dyn TelemetrySink>,
}

impl Executor {
    pub fn new(validator: Box<dyn ParamValidator>, telemetry: Box<dyn TelemetrySink>) -> Self {
        Self {
            validator,
            telemetry,
        }
    }

    /// Run `action` to completion under `opts`.
    ///
    /// # Pipeline
    ///
    /// 1. Normalize `params` and `context` to maps (`Validation` on failure)
    /// 2. Check the action contract (`InvalidAction` on failure)
    /// 3. Validate and coerce params against the action schema
    /// 4. Attempt the action under `opts.timeout_ms` (`Timeout` on expiry)
    /// 5. Retry retryable failures up to `opts.max_retries` times, sleeping
    ///    `backoff_ms * 2^attempt` (capped) between attempts
    /// 6. On final failure, compensate if both the action and `opts` allow
    ///    it, wrapping the outcome in `Compensation`
    ///
    /// # Errors
    ///
    /// Steps 1–3 fail fast and are never retried. Timeouts are never
    /// retried either.
    pub async fn run(
        &self,
        action: &ActionRef,
        params: Value,
        context: Value,
        opts: &ExecOptions,
    ) -> StrandResult<ActionOutput> {
        // ── Steps 1–3: shape checks, no retry ────────────────────────────────
        let params = normalize("params", params)?;
        let context = normalize("context", context)?;
        action.validate()?;
        let params = self.validator.validate(&action.schema(), params)?;

        // ── Steps 4–5: bounded attempts with backoff ─────────────────────────
        let mut attempt: u32 = 0;
        loop {
            self.emit(opts, EventKind::Start, action, attempt, None, None, Some(&params));
            let started = Instant::now();

            let result = self.attempt(action, &params, &context, opts).await;
            let elapsed = started.elapsed();

            match result {
                Ok(output) => {
                    self.emit(opts, EventKind::Stop, action, attempt, Some(elapsed), Some("ok"), Some(&params));
                    debug!(
                        action = %action.name(),
                        attempt,
                        duration_ms = elapsed.as_millis() as u64,
                        directives = output.directives.len(),
                        "action succeeded"
                    );
                    return Ok(output);
                }
                Err(err) => {
                    self.emit(
                        opts,
                        EventKind::Exception,
                        action,
                        attempt,
                        Some(elapsed),
                        Some(err.kind()),
                        Some(&params),
                    );

                    if err.is_retryable() && attempt < opts.max_retries {
                        let delay = opts.backoff_for(attempt);
                        warn!(
                            action = %action.name(),
                            attempt,
                            backoff_ms = delay.as_millis() as u64,
                            error = %err,
                            "action failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    warn!(action = %action.name(), attempt, error = %err, "action failed");
                    // ── Step 6: compensation ─────────────────────────────────
                    return Err(self.compensate(action, params, context, err, opts).await);
                }
            }
        }
    }

    /// Start `action` in the background and return immediately.
    pub fn run_async(
        self: &Arc<Self>,
        action: ActionRef,
        params: Value,
        context: Value,
        opts: ExecOptions,
    ) -> AsyncHandle {
        let correlation = CorrelationId::new();
        let executor = Arc::clone(self);
        let name = action.name().to_string();
        debug!(action = %name, correlation = %correlation, "starting async execution");

        let task = tokio::spawn(async move { executor.run(&action, params, context, &opts).await });

        AsyncHandle {
            correlation,
            action: name,
            task,
        }
    }

    /// One attempt: inline when unbounded, otherwise a monitored task.
    async fn attempt(
        &self,
        action: &ActionRef,
        params: &Params,
        context: &Params,
        opts: &ExecOptions,
    ) -> StrandResult<ActionOutput> {
        let Some(limit) = opts.timeout() else {
            return action.run(params.clone(), context.clone()).await;
        };

        let task_action = action.clone();
        let task_params = params.clone();
        let task_context = context.clone();
        let handle = tokio::spawn(async move { task_action.run(task_params, task_context).await });

        bounded(action.name(), handle, limit).await
    }

    /// Wrap `original` into a `Compensation` error when compensation applies;
    /// otherwise return it unchanged.
    async fn compensate(
        &self,
        action: &ActionRef,
        params: Params,
        context: Params,
        original: StrandError,
        opts: &ExecOptions,
    ) -> StrandError {
        if !(opts.compensation && action.compensates()) {
            return original;
        }

        let name = action.name().to_string();
        info!(action = %name, error = %original, "running compensation");
        self.emit(opts, EventKind::Compensate, action, 0, None, Some(original.kind()), None);

        let task_action = action.clone();
        let task_error = original.clone();
        let run = async move { task_action.compensate(params, task_error, context).await };

        let outcome = if opts.compensation_timeout_ms == 0 {
            run.await
        } else {
            bounded(
                &name,
                tokio::spawn(run),
                Duration::from_millis(opts.compensation_timeout_ms),
            )
            .await
        };

        match outcome {
            Ok(result) => StrandError::Compensation {
                action: name,
                compensated: true,
                result: Some(Value::Object(result)),
                compensation_error: None,
                original: Box::new(original),
            },
            Err(err) => {
                warn!(action = %name, error = %err, "compensation failed");
                StrandError::Compensation {
                    action: name,
                    compensated: false,
                    result: None,
                    compensation_error: Some(err.to_string()),
                    original: Box::new(original),
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        opts: &ExecOptions,
        kind: EventKind,
        action: &ActionRef,
        attempt: u32,
        duration: Option<Duration>,
        outcome: Option<&str>,
        params: Option<&Params>,
    ) {
        let include_params = match (opts.telemetry, kind) {
            (TelemetryLevel::Silent, _) => return,
            (TelemetryLevel::Minimal, EventKind::Start) => return,
            (TelemetryLevel::Minimal, _) => false,
            (TelemetryLevel::Full, _) => true,
        };

        self.telemetry.emit(&TelemetryEvent {
            kind,
            action: action.name().to_string(),
            attempt,
            duration_ms: duration.map(|d| d.as_millis() as u64),
            outcome: outcome.map(str::to_string),
            params: if include_params { params.cloned() } else { None },
            timestamp: Utc::now(),
        });
    }
}

/// Aborts the task it owns when dropped.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Await `handle` for at most `limit`, aborting the task on expiry or when
/// this future is dropped first.
async fn bounded<T>(
    action: &str,
    handle: JoinHandle<StrandResult<T>>,
    limit: Duration,
) -> StrandResult<T> {
    let mut guard = AbortOnDrop(handle);
    match tokio::time::timeout(limit, &mut guard.0).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) if join_err.is_panic() => {
            Err(StrandError::execution(action, "action panicked"))
        }
        Ok(Err(_)) => Err(StrandError::execution(action, "action task was cancelled")),
        Err(_) => {
            guard.0.abort();
            Err(StrandError::Timeout {
                action: action.to_string(),
                timeout_ms: limit.as_millis() as u64,
            })
        }
    }
}

/// A background execution started by [`Executor::run_async`].
///
/// Consumed by exactly one of [`AsyncHandle::wait`] or
/// [`AsyncHandle::cancel`].
#[derive(Debug)]
pub struct AsyncHandle {
    pub correlation: CorrelationId,
    pub action: String,
    task: JoinHandle<StrandResult<ActionOutput>>,
}

impl AsyncHandle {
    /// Block until the execution finishes or `timeout` elapses. On timeout
    /// the background task is aborted.
    pub async fn wait(mut self, timeout: Duration) -> StrandResult<ActionOutput> {
        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) if join_err.is_panic() => {
                Err(StrandError::execution(&self.action, "async execution panicked"))
            }
            Ok(Err(_)) => Err(StrandError::InvalidAsyncHandle {
                reason: format!("execution {} was cancelled", self.correlation),
            }),
            Err(_) => {
                self.task.abort();
                Err(StrandError::Timeout {
                    action: self.action.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Abort the background execution without waiting for it.
    pub fn cancel(self) {
        debug!(correlation = %self.correlation, action = %self.action, "cancelling async execution");
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use serde_json::json;

    use strand_contracts::{
        agent::Params,
        error::{StrandError, StrandResult},
        options::{ExecOptions, TelemetryLevel},
        schema::{FieldSpec, FieldType},
        telemetry::{EventKind, TelemetryEvent},
    };

    use crate::instruction::{ActionOutput, ActionRef};
    use crate::traits::{Action, ParamValidator, TelemetrySink};

    use super::Executor;

    // ── Mock helpers ─────────────────────────────────────────────────────────

    /// Accepts everything, but rejects params missing a required field so
    /// the executor's fail-fast path can be observed.
    struct MockValidator;

    impl ParamValidator for MockValidator {
        fn validate(&self, schema: &[FieldSpec], params: Params) -> StrandResult<Params> {
            let missing: Vec<String> = schema
                .iter()
                .filter(|f| f.required && !params.contains_key(&f.name))
                .map(|f| f.name.clone())
                .collect();
            if missing.is_empty() {
                Ok(params)
            } else {
                Err(StrandError::Validation { fields: missing, reason: "required".into() })
            }
        }
    }

    /// Records every event for later inspection.
    #[derive(Clone, Default)]
    struct MockTelemetry {
        events: Arc<Mutex<Vec<TelemetryEvent>>>,
    }

    impl TelemetrySink for MockTelemetry {
        fn emit(&self, event: &TelemetryEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn executor() -> (Arc<Executor>, MockTelemetry) {
        let telemetry = MockTelemetry::default();
        let executor = Executor::new(Box::new(MockValidator), Box::new(telemetry.clone()));
        (Arc::new(executor), telemetry)
    }

    fn fast(max_retries: u32) -> ExecOptions {
        ExecOptions { timeout_ms: 500, max_retries, backoff_ms: 10, ..Default::default() }
    }

    /// Adds `amount` to the `counter` found in the context state.
    struct Increment;

    #[async_trait]
    impl Action for Increment {
        fn name(&self) -> &str {
            "increment"
        }

        fn schema(&self) -> Vec<FieldSpec> {
            vec![FieldSpec::required("amount", FieldType::Integer)]
        }

        async fn run(&self, params: Params, context: Params) -> StrandResult<ActionOutput> {
            let current = context
                .get("state")
                .and_then(|s| s.get("counter"))
                .and_then(|c| c.as_i64())
                .unwrap_or(0);
            let amount = params["amount"].as_i64().unwrap_or(0);
            Ok(ActionOutput::from_value(json!({ "counter": current + amount })))
        }
    }

    /// Always fails and counts its attempts with timestamps.
    struct AlwaysFails {
        attempts: Arc<Mutex<Vec<Instant>>>,
        compensates: bool,
    }

    #[async_trait]
    impl Action for AlwaysFails {
        fn name(&self) -> &str {
            "always_fails"
        }

        async fn run(&self, _params: Params, _context: Params) -> StrandResult<ActionOutput> {
            self.attempts.lock().unwrap().push(Instant::now());
            Err(StrandError::execution("always_fails", "boom"))
        }

        fn compensates(&self) -> bool {
            self.compensates
        }

        async fn compensate(
            &self,
            _params: Params,
            _error: StrandError,
            _context: Params,
        ) -> StrandResult<Params> {
            Ok(json!({ "rolled_back": true }).as_object().cloned().unwrap())
        }
    }

    /// Sleeps `ms` before returning.
    struct Sleeper {
        ms: u64,
        runs: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Action for Sleeper {
        fn name(&self) -> &str {
            "sleeper"
        }

        async fn run(&self, _params: Params, _context: Params) -> StrandResult<ActionOutput> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.ms)).await;
            Ok(ActionOutput::from_value(json!({ "slept": self.ms })))
        }
    }

    /// Sleeps `ms`, then records that it finished.
    struct SideEffect {
        ms: u64,
        done: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Action for SideEffect {
        fn name(&self) -> &str {
            "side_effect"
        }

        async fn run(&self, _params: Params, _context: Params) -> StrandResult<ActionOutput> {
            tokio::time::sleep(Duration::from_millis(self.ms)).await;
            self.done.fetch_add(1, Ordering::SeqCst);
            Ok(ActionOutput::default())
        }
    }

    /// Fails, and its compensation hangs past any reasonable bound.
    struct HangingCompensation;

    #[async_trait]
    impl Action for HangingCompensation {
        fn name(&self) -> &str {
            "hanging_compensation"
        }

        async fn run(&self, _params: Params, _context: Params) -> StrandResult<ActionOutput> {
            Err(StrandError::execution("hanging_compensation", "original failure"))
        }

        fn compensates(&self) -> bool {
            true
        }

        async fn compensate(
            &self,
            _params: Params,
            _error: StrandError,
            _context: Params,
        ) -> StrandResult<Params> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Params::new())
        }
    }

    struct Panics;

    #[async_trait]
    impl Action for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        async fn run(&self, _params: Params, _context: Params) -> StrandResult<ActionOutput> {
            panic!("action body exploded");
        }
    }

    struct BadName;

    #[async_trait]
    impl Action for BadName {
        fn name(&self) -> &str {
            ""
        }

        async fn run(&self, _params: Params, _context: Params) -> StrandResult<ActionOutput> {
            unreachable!("must never run")
        }
    }

    // ── Test cases ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_increment_produces_delta() {
        let (executor, _) = executor();
        let output = executor
            .run(
                &ActionRef::new(Increment),
                json!({ "amount": 5 }),
                json!({ "state": { "counter": 0 } }),
                &fast(0),
            )
            .await
            .unwrap();

        assert_eq!(output.state, json!({ "counter": 5 }).as_object().cloned().unwrap());
        assert!(output.directives.is_empty());
    }

    /// Params given as [key, value] pairs are normalized before validation.
    #[tokio::test]
    async fn test_pair_list_params_are_normalized() {
        let (executor, _) = executor();
        let output = executor
            .run(&ActionRef::new(Increment), json!([["amount", 2]]), json!(null), &fast(0))
            .await
            .unwrap();
        assert_eq!(output.state["counter"], json!(2));
    }

    #[tokio::test]
    async fn test_non_map_params_fail_validation() {
        let (executor, _) = executor();
        let result = executor
            .run(&ActionRef::new(Increment), json!("amount=5"), json!(null), &fast(0))
            .await;
        assert!(matches!(result, Err(StrandError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_schema_violation_lists_fields() {
        let (executor, telemetry) = executor();
        let result = executor
            .run(&ActionRef::new(Increment), json!({}), json!(null), &fast(3))
            .await;

        match result {
            Err(StrandError::Validation { fields, .. }) => assert_eq!(fields, vec!["amount"]),
            other => panic!("expected Validation, got {:?}", other),
        }
        // Validation happens before any attempt.
        assert!(telemetry.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_action_is_invalid() {
        let (executor, _) = executor();
        let result = executor.run(&ActionRef::new(BadName), json!({}), json!(null), &fast(0)).await;
        assert!(matches!(result, Err(StrandError::InvalidAction { .. })));
    }

    /// max_retries = n gives exactly n + 1 attempts with growing gaps.
    #[tokio::test]
    async fn test_retry_budget_and_backoff() {
        let (executor, _) = executor();
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let action = ActionRef::new(AlwaysFails { attempts: attempts.clone(), compensates: false });

        let result = executor.run(&action, json!({}), json!(null), &fast(2)).await;
        assert!(matches!(result, Err(StrandError::Execution { .. })));

        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), 3);
        assert!(attempts[1] - attempts[0] >= Duration::from_millis(10));
        assert!(attempts[2] - attempts[1] >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        let (executor, _) = executor();
        let runs = Arc::new(AtomicU32::new(0));
        let action = ActionRef::new(Sleeper { ms: 300, runs: runs.clone() });
        let opts = ExecOptions { timeout_ms: 30, max_retries: 3, backoff_ms: 1, ..Default::default() };

        match executor.run(&action, json!({}), json!(null), &opts).await {
            Err(StrandError::Timeout { action, timeout_ms }) => {
                assert_eq!(action, "sleeper");
                assert_eq!(timeout_ms, 30);
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    /// A zero timeout runs inline with no bound.
    #[tokio::test]
    async fn test_zero_timeout_runs_inline() {
        let (executor, _) = executor();
        let action = ActionRef::new(Sleeper { ms: 20, runs: Arc::new(AtomicU32::new(0)) });
        let opts = ExecOptions { timeout_ms: 0, ..fast(0) };
        let output = executor.run(&action, json!({}), json!(null), &opts).await.unwrap();
        assert_eq!(output.state["slept"], json!(20));
    }

    #[tokio::test]
    async fn test_panic_becomes_execution_error() {
        let (executor, _) = executor();
        let result = executor.run(&ActionRef::new(Panics), json!({}), json!(null), &fast(0)).await;
        match result {
            Err(StrandError::Execution { reason, .. }) => assert!(reason.contains("panicked")),
            other => panic!("expected Execution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_compensation_success_keeps_original() {
        let (executor, _) = executor();
        let action = ActionRef::new(AlwaysFails { attempts: Arc::default(), compensates: true });

        match executor.run(&action, json!({}), json!(null), &fast(0)).await {
            Err(StrandError::Compensation { compensated, result, original, .. }) => {
                assert!(compensated);
                assert_eq!(result, Some(json!({ "rolled_back": true })));
                assert!(matches!(*original, StrandError::Execution { .. }));
            }
            other => panic!("expected Compensation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_compensation_disabled_by_options() {
        let (executor, _) = executor();
        let action = ActionRef::new(AlwaysFails { attempts: Arc::default(), compensates: true });
        let opts = ExecOptions { compensation: false, ..fast(0) };
        let result = executor.run(&action, json!({}), json!(null), &opts).await;
        assert!(matches!(result, Err(StrandError::Execution { .. })));
    }

    #[tokio::test]
    async fn test_compensation_timeout_reports_not_compensated() {
        let (executor, _) = executor();
        let opts = ExecOptions { compensation_timeout_ms: 30, ..fast(0) };

        match executor.run(&ActionRef::new(HangingCompensation), json!({}), json!(null), &opts).await {
            Err(StrandError::Compensation { compensated, compensation_error, original, .. }) => {
                assert!(!compensated);
                assert!(compensation_error.unwrap().contains("timed out"));
                assert_eq!(*original, StrandError::execution("hanging_compensation", "original failure"));
            }
            other => panic!("expected Compensation, got {:?}", other),
        }
    }

    // ── Telemetry ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_full_telemetry_brackets_each_attempt() {
        let (executor, telemetry) = executor();
        let action = ActionRef::new(AlwaysFails { attempts: Arc::default(), compensates: false });
        let _ = executor.run(&action, json!({ "x": 1 }), json!(null), &fast(1)).await;

        let events = telemetry.events.lock().unwrap();
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Start, EventKind::Exception, EventKind::Start, EventKind::Exception]
        );
        assert_eq!(events[3].attempt, 1);
        assert_eq!(events[1].outcome.as_deref(), Some("execution_error"));
        assert!(events[0].params.is_some());
    }

    #[tokio::test]
    async fn test_minimal_and_silent_telemetry() {
        let (executor, telemetry) = executor();
        let action = ActionRef::new(Increment);

        let minimal = ExecOptions { telemetry: TelemetryLevel::Minimal, ..fast(0) };
        executor.run(&action, json!({ "amount": 1 }), json!(null), &minimal).await.unwrap();
        {
            let events = telemetry.events.lock().unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].kind, EventKind::Stop);
            assert!(events[0].params.is_none());
        }

        let silent = ExecOptions { telemetry: TelemetryLevel::Silent, ..fast(0) };
        executor.run(&action, json!({ "amount": 1 }), json!(null), &silent).await.unwrap();
        assert_eq!(telemetry.events.lock().unwrap().len(), 1);
    }

    // ── Async variant ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_run_async_then_wait() {
        let (executor, _) = executor();
        let handle = executor.run_async(
            ActionRef::new(Increment),
            json!({ "amount": 3 }),
            json!(null),
            fast(0),
        );
        let output = handle.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(output.state["counter"], json!(3));
    }

    #[tokio::test]
    async fn test_async_wait_timeout_aborts_task() {
        let (executor, _) = executor();
        let runs = Arc::new(AtomicU32::new(0));
        let opts = ExecOptions { timeout_ms: 0, ..fast(0) };
        let handle = executor.run_async(
            ActionRef::new(Sleeper { ms: 5_000, runs: runs.clone() }),
            json!({}),
            json!(null),
            opts,
        );

        let started = Instant::now();
        let result = handle.wait(Duration::from_millis(30)).await;
        assert!(matches!(result, Err(StrandError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_async_cancel_does_not_block() {
        let (executor, _) = executor();
        let opts = ExecOptions { timeout_ms: 0, ..fast(0) };
        let handle = executor.run_async(
            ActionRef::new(Sleeper { ms: 5_000, runs: Arc::default() }),
            json!({}),
            json!(null),
            opts,
        );
        let started = Instant::now();
        handle.cancel();
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_async_cancel_stops_bounded_action() {
        let (executor, _) = executor();
        let done = Arc::new(AtomicU32::new(0));
        let handle = executor.run_async(
            ActionRef::new(SideEffect { ms: 100, done: done.clone() }),
            json!({}),
            json!(null),
            ExecOptions::default(),
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_async_wait_timeout_stops_bounded_action() {
        let (executor, _) = executor();
        let done = Arc::new(AtomicU32::new(0));
        let handle = executor.run_async(
            ActionRef::new(SideEffect { ms: 100, done: done.clone() }),
            json!({}),
            json!(null),
            ExecOptions::default(),
        );

        let result = handle.wait(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(StrandError::Timeout { .. })));
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(done.load(Ordering::SeqCst), 0);
    }
}
