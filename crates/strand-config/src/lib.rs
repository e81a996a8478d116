//! # strand-config
//!
//! TOML-driven runtime configuration for STRAND.
//!
//! ## Overview
//!
//! This crate provides [`RuntimeConfig`], deserialized from a TOML document
//! with six optional sections: `[execution]`, `[compensation]`, `[runner]`,
//! `[server]`, `[supervisor]` and `[coordination]`. Omitted keys take
//! their documented defaults, so an empty document is a valid config.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use strand_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_file(Path::new("config/runtime.toml"))?;
//! let opts = config.run_options();
//! ```

pub mod runtime;
pub mod section;

pub use runtime::RuntimeConfig;

// ── Tests ─────────────────────────────────────────────────────────────────────
