//! # strand-ref
//!
//! Reference actions and runnable scenarios for the STRAND agent runtime.
//!
//! Three scenarios exercise the whole stack with the real engine, runners,
//! agent servers and coordination:
//!
//! 1. **Counter chain**: chained arithmetic piped step to step, and a
//!    self-enqueueing countdown bounded by the server's iteration limit.
//! 2. **Fan-out**: a dispatcher spawns workers, then waits on them as a
//!    race and as a barrier, and a barrier short-circuits on a vanished
//!    agent.
//! 3. **Compensation**: a ledger transfer that fails half-way is rolled
//!    back and the agent ends up failed with the compensation recorded.
//!
//! No external systems are contacted.

pub mod actions;
pub mod scenarios;
pub mod setup;
pub mod workers;
