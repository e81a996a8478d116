//! Runnable reference scenarios.
//!
//! Each scenario builds its own runtime from the embedded configuration,
//! prints what it does, and returns a report of what it observed.

pub mod compensation;
pub mod counter_chain;
pub mod fan_out;
