//! # strand-contracts
//!
//! Shared types, options, and contracts for the STRAND agent runtime.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: it holds data definitions, small helpers over them and the
//! error type.

pub mod agent;
pub mod completion;
pub mod error;
pub mod options;
pub mod schema;
pub mod telemetry;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use agent::{merge, normalize, AgentId, Params};
    use completion::{AgentStatus, Completion};
    use error::StrandError;
    use options::{
        ExecOptions, RestartPolicy, RunOptions, RunnerKind, ServerOptions, TelemetryLevel,
        MAX_BACKOFF_MS,
    };

    fn map(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    // ── normalize ────────────────────────────────────────────────────────────

    #[test]
    fn normalize_accepts_object_null_and_pairs() {
        assert_eq!(normalize("params", json!({"a": 1})).unwrap(), map(json!({"a": 1})));
        assert!(normalize("params", json!(null)).unwrap().is_empty());

        let pairs = normalize("params", json!([["a", 1], ["b", "x"]])).unwrap();
        assert_eq!(pairs, map(json!({"a": 1, "b": "x"})));
    }

    #[test]
    fn normalize_rejects_scalars_with_validation_error() {
        match normalize("context", json!(42)) {
            Err(StrandError::Validation { fields, reason }) => {
                assert_eq!(fields, vec!["context".to_string()]);
                assert!(reason.contains("number"), "unexpected reason: {reason}");
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn normalize_rejects_malformed_pairs() {
        assert!(normalize("params", json!([["a", 1, 2]])).is_err());
        assert!(normalize("params", json!([[1, 2]])).is_err());
    }

    // ── merge ────────────────────────────────────────────────────────────────

    /// Keys in the delta overwrite; keys absent from the delta survive.
    #[test]
    fn merge_is_shallow_last_write_wins() {
        let mut state = map(json!({"counter": 0, "name": "a", "nested": {"x": 1}}));
        merge(&mut state, &map(json!({"counter": 5, "nested": {"y": 2}})));

        assert_eq!(state["counter"], json!(5));
        assert_eq!(state["name"], json!("a"));
        // Shallow: the nested map is replaced, not merged.
        assert_eq!(state["nested"], json!({"y": 2}));
    }

    // ── options ──────────────────────────────────────────────────────────────

    #[test]
    fn exec_options_defaults() {
        let opts = ExecOptions::default();
        assert_eq!(opts.timeout_ms, 5_000);
        assert_eq!(opts.max_retries, 1);
        assert_eq!(opts.telemetry, TelemetryLevel::Full);
        assert_eq!(opts.timeout(), Some(Duration::from_millis(5_000)));
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let opts = ExecOptions { timeout_ms: 0, ..Default::default() };
        assert_eq!(opts.timeout(), None);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let opts = ExecOptions { backoff_ms: 100, ..Default::default() };
        assert_eq!(opts.backoff_for(0), Duration::from_millis(100));
        assert_eq!(opts.backoff_for(1), Duration::from_millis(200));
        assert_eq!(opts.backoff_for(3), Duration::from_millis(800));
        assert_eq!(opts.backoff_for(20), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(opts.backoff_for(200), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[test]
    fn run_options_continue_on_directive_by_default() {
        let opts = RunOptions::default();
        assert!(opts.continue_on_directive);
        assert!(opts.merge_results);
    }

    #[test]
    fn server_and_restart_defaults() {
        let server = ServerOptions::default();
        assert_eq!(server.runner, RunnerKind::Chain);
        assert_eq!(server.max_iterations, 100);
        assert!(server.fail_on_error);

        let policy = RestartPolicy::default();
        assert_eq!(policy.max_restarts, 3);
        assert_eq!(policy.window(), Duration::from_millis(5_000));
        assert_eq!(RestartPolicy::never().max_restarts, 0);
    }

    #[test]
    fn telemetry_level_deserializes_lowercase() {
        let level: TelemetryLevel = serde_json::from_str("\"minimal\"").unwrap();
        assert_eq!(level, TelemetryLevel::Minimal);
    }

    // ── completion ───────────────────────────────────────────────────────────

    #[test]
    fn terminal_statuses() {
        assert!(AgentStatus::Completed.is_terminal());
        assert!(AgentStatus::Failed.is_terminal());
        assert!(!AgentStatus::Idle.is_terminal());
        assert!(!AgentStatus::Running.is_terminal());
        assert!(!AgentStatus::Waiting.is_terminal());
    }

    #[test]
    fn status_parses_from_state_value() {
        assert_eq!(AgentStatus::from_state_value(&json!("waiting")), Some(AgentStatus::Waiting));
        assert_eq!(AgentStatus::from_state_value(&json!("done")), None);
        assert_eq!(AgentStatus::from_state_value(&json!(3)), None);
    }

    #[test]
    fn completion_constructors() {
        let done = Completion::completed(Some(json!(21)));
        assert!(done.is_terminal());
        assert_eq!(done.error, None);

        let failed = Completion::failed("boom", None);
        assert_eq!(failed.status, AgentStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    // ── AgentId ──────────────────────────────────────────────────────────────

    #[test]
    fn agent_id_generate_is_unique() {
        let ids: std::collections::HashSet<AgentId> = (0..100).map(|_| AgentId::generate()).collect();
        assert_eq!(ids.len(), 100);
        assert!(AgentId::new("  ").is_blank());
    }

    // ── StrandError display messages ─────────────────────────────────────────

    #[test]
    fn error_validation_display_lists_fields() {
        let err = StrandError::Validation {
            fields: vec!["amount".to_string(), "factor".to_string()],
            reason: "wrong type".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("amount, factor"));
        assert!(msg.contains("wrong type"));
    }

    #[test]
    fn error_compensation_display_keeps_original() {
        let err = StrandError::Compensation {
            action: "transfer".to_string(),
            compensated: false,
            result: None,
            compensation_error: Some("refund timed out".to_string()),
            original: Box::new(StrandError::execution("transfer", "insufficient funds")),
        };
        let msg = err.to_string();
        assert!(msg.contains("compensation failed"));
        assert!(msg.contains("insufficient funds"));
    }

    #[test]
    fn only_execution_errors_are_retryable() {
        assert!(StrandError::execution("a", "b").is_retryable());
        assert!(!StrandError::Timeout { action: "a".into(), timeout_ms: 1 }.is_retryable());
        assert!(!StrandError::validation("x", "bad").is_retryable());
        assert!(!StrandError::InvalidAction { reason: "r".into() }.is_retryable());
    }

    #[test]
    fn error_kind_discriminants() {
        assert_eq!(StrandError::AwaitTimeout { timeout_ms: 5 }.kind(), "await_timeout");
        assert_eq!(
            StrandError::ProcessDown { agent_id: "a".into(), reason: "noproc".into() }.kind(),
            "process_down"
        );
    }
}
