//! Event-triggered hook execution.
//!
//! A caller emits an [`Event`](hkw_core::Event); the engine selects the
//! enabled hooks whose patterns match its type, runs them one at a time in
//! definition order, and hands each result to the audit trail before the
//! next hook starts.
//!
//! ## Event patterns
//!
//! - `task.created` matches only `task.created`
//! - `task.*` matches `task.created` and `task.completed`, but not `task`
//!   and not `task.sub.created`
//!
//! ## Fail modes
//!
//! - `continue` (default): record the failure and run the next hook
//! - `stop`: record the failure; the remaining hooks for this event are
//!   neither run nor recorded
//!
//! A timeout counts as a failure. The process group of a timed-out hook is
//! killed.
//!
//! ## Template variables
//!
//! Inline commands support `{variable}` placeholders, replaced with
//! single-quoted values. Every placeholder has an `HKW_*` environment
//! counterpart that scripts and commands both receive (see [`env`]).

pub mod config;
pub mod definition;
pub mod engine;
pub mod env;
pub mod error;
pub mod executor;
pub mod path_guard;
pub mod pattern;
pub mod process;
pub mod queue;
pub mod summary;

pub use config::{DocumentFormat, EventEntry, HookEntry, HookSet, HooksDocument, SUPPORTED_VERSION};
pub use definition::{HookAction, HookDefinition};
pub use engine::{AuditSink, HookEngine, validate_config};
pub use error::EngineError;
pub use executor::{HookExecutor, ResultSink};
pub use path_guard::PathValidator;
pub use pattern::{EventPattern, match_hooks};
pub use process::terminate_process_tree;
pub use queue::{EmissionQueue, PendingEmission};
pub use summary::ExecutionSummary;
