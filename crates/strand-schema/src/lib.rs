//! # strand-schema
//!
//! Parameter validation for the STRAND runtime.
//!
//! This crate provides [`engine::SchemaValidator`], which implements the
//! [`strand_core::traits::ParamValidator`] trait. It fills declared
//! defaults, applies lossless coercions, and validates the result against a
//! JSON Schema generated from the action's `FieldSpec`s.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use strand_schema::SchemaValidator;
//! use strand_core::Executor;
//!
//! let executor = Executor::new(Box::new(SchemaValidator::new()), Box::new(sink));
//! ```

pub mod engine;

pub use engine::SchemaValidator;
