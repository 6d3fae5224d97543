//! Shared data model and error taxonomy for the hookwarden engine.
//!
//! Nothing in this crate performs I/O. The hook, audit and attestation
//! crates all speak in terms of these types.

pub mod error;
pub mod types;

pub use error::{ConfigError, ExecutionFailure, SecurityError, ValidationReport};
pub use types::{DEFAULT_TIMEOUT_SECS, Event, ExecutionResult, FailMode, HookOutcome};
