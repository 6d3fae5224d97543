//! Durable audit trail for hook executions.
//!
//! Every attempted hook produces one [`AuditRecord`], appended to two files
//! in the log directory under a single lock:
//! - `hooks.jsonl`: one JSON object per line, the queryable record
//! - `hooks.log`: a human-readable narrative of the same records
//!
//! When `hooks.jsonl` grows past the configured size it is renamed to
//! `hooks.jsonl.1` (shifting older backups up) together with its narrative
//! twin, and backups beyond the retention count are deleted.
//!
//! Queries stream the backups oldest-first and then the primary file, one
//! line at a time, so filtering never loads a whole log into memory.

pub mod error;
pub mod logger;
pub mod query;
pub mod record;
pub mod report;
pub mod stats;

pub use error::{LoggerError, LoggerResult};
pub use logger::{AuditLogger, REPORT_FILE, RECORDS_FILE, RotationPolicy};
pub use query::{AuditQuery, AuditRecords};
pub use record::{AuditRecord, RecordCategory, Severity};
pub use stats::{AuditStats, HookTally};
