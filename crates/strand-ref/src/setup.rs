//! Wiring shared by the scenarios: configuration, executor, telemetry and
//! the agent server built from them.

use std::sync::Arc;

use strand_config::RuntimeConfig;
use strand_contracts::error::StrandResult;
use strand_core::Executor;
use strand_runtime::{AgentRegistry, AgentServer, Coordinator, LoggingHandler};
use strand_schema::SchemaValidator;
use strand_telemetry::{FanoutTelemetry, InMemoryTelemetry, TracingTelemetry};

use crate::actions::WORKER_MODULE;
use crate::workers::CounterWorkerFactory;

/// Embedded runtime configuration for the reference scenarios.
pub const RUNTIME_CONFIG: &str = include_str!("../config/runtime.toml");

pub fn runtime_config() -> StrandResult<RuntimeConfig> {
    RuntimeConfig::from_toml_str(RUNTIME_CONFIG)
}

/// One configured runtime: every scenario builds its own.
pub struct Runtime {
    pub config: RuntimeConfig,
    pub executor: Arc<Executor>,
    /// Every engine event, also forwarded to `tracing`.
    pub telemetry: InMemoryTelemetry,
    pub registry: AgentRegistry,
}

impl Runtime {
    pub fn load() -> StrandResult<Self> {
        Ok(Self::with_config(runtime_config()?))
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let telemetry = InMemoryTelemetry::new();
        let sink = FanoutTelemetry::new()
            .with(telemetry.clone())
            .with(TracingTelemetry);
        let executor = Arc::new(Executor::new(Box::new(SchemaValidator::new()), Box::new(sink)));
        Self {
            config,
            executor,
            telemetry,
            registry: AgentRegistry::new(),
        }
    }

    /// An agent server with the configured options, the shared registry and
    /// the counter worker factory.
    pub fn server(&self) -> AgentServer {
        AgentServer::new(Arc::clone(&self.executor))
            .with_options(self.config.server_options())
            .with_handler(LoggingHandler)
            .with_factory(WORKER_MODULE, CounterWorkerFactory)
            .with_registry(self.registry.clone())
    }

    pub fn coordinator(&self) -> Coordinator {
        Coordinator::new(self.registry.clone()).with_poll_interval(self.config.child_poll_interval())
    }
}
