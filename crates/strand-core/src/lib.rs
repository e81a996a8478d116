//! # strand-core
//!
//! The bounded action engine and runner protocols for STRAND agents.
//!
//! This crate provides:
//! - The four core traits (`Action`, `ParamValidator`, `TelemetrySink`, `Runner`)
//! - The `Executor`, which runs actions with validation, timeouts, retries
//!   and compensation
//! - The directive model and the `Agent` value it acts on
//! - `SimpleRunner` and `ChainRunner`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strand_core::{Executor, ChainRunner, traits::{Action, Runner}};
//! ```

pub mod agent;
pub mod directive;
pub mod executor;
pub mod instruction;
pub mod runner;
pub mod traits;

pub use agent::Agent;
pub use directive::Directive;
pub use executor::{AsyncHandle, Executor};
pub use instruction::{ActionOutput, ActionRef, Instruction};
pub use runner::{ChainRunner, RunResult, RunStatus, SimpleRunner};
