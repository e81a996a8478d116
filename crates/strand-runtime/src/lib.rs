//! # strand-runtime
//!
//! Running agents as long-lived processes.
//!
//! This crate provides:
//! - `AgentServer`: one tokio task per agent, owning its state and draining
//!   its queue with a runner after every accepted enqueue
//! - `AgentHandle`: the cloneable mailbox reference every caller talks to
//! - `Supervisor`: restarts a crashed server within a sliding-window budget
//! - `AgentRegistry`: ids to handles, so callers can name agents by id
//! - `Coordinator`: bounded waits on one, all or any agents, and on
//!   children recorded by a parent
//! - The `DirectiveHandler` and `AgentFactory` seams for runtime directives
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strand_runtime::{AgentServer, Coordinator, AgentRegistry};
//!
//! let registry = AgentRegistry::new();
//! let server = AgentServer::new(executor).with_registry(registry.clone());
//! let handle = server.spawn(agent);
//! handle.plan("increment", params).await?;
//! let completion = Coordinator::new(registry).await_one(&handle, timeout).await?;
//! ```

pub mod coordination;
pub mod handle;
pub mod handler;
pub mod registry;
pub mod server;
pub mod supervisor;

pub use coordination::Coordinator;
pub use handle::{AgentHandle, Command};
pub use handler::{AgentFactory, DirectiveHandler, LoggingHandler, RecordingHandler};
pub use registry::{AgentRef, AgentRegistry};
pub use server::{AgentServer, CANCELLED};
pub use supervisor::Supervisor;
