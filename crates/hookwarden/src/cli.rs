use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use hkw_audit::Severity;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hkw")]
#[command(about = "Hookwarden: event-triggered hooks with an audit trail")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root (defaults to CWD)
    #[arg(long, global = true)]
    pub project_root: Option<PathBuf>,

    /// Settings file used instead of .hookwarden/config.toml
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Also write engine diagnostics to {log_dir}/engine-<timestamp>.log
    #[arg(long, global = true)]
    pub trace_log: bool,
}

/// Output format for CLI responses
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Emit an event and run every matching hook
    Emit {
        /// Event type, e.g. task.created
        event_type: String,

        /// Correlate the event with a task
        #[arg(long)]
        task_id: Option<String>,

        /// Correlate the event with a spec
        #[arg(long)]
        spec_id: Option<String>,

        /// Context entry passed to hooks (repeatable)
        #[arg(long = "ctx", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        context: Vec<(String, String)>,

        /// Show what would run without running or recording anything
        #[arg(long)]
        dry_run: bool,

        /// Process the event on the background emission worker
        #[arg(long)]
        background: bool,
    },

    /// Validate the hooks configuration without running anything
    Validate,

    /// Inspect or reset the audit trail
    Audit {
        #[command(subcommand)]
        cmd: AuditCommands,
    },

    /// Export a provenance attestation for a completed operation
    Attest {
        /// Operation name, e.g. "implement task-42"
        operation: String,

        /// Subject with a precomputed sha256 digest (repeatable)
        #[arg(long = "subject", value_name = "NAME=DIGEST", value_parser = parse_key_val)]
        subjects: Vec<(String, String)>,

        /// Subject hashed from a file, relative to the project root (repeatable)
        #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_key_val)]
        files: Vec<(String, String)>,
    },
}

#[derive(Subcommand)]
pub enum AuditCommands {
    /// List recorded hook executions, oldest first
    Query {
        /// Only these event types (repeatable)
        #[arg(long = "event-type")]
        event_types: Vec<String>,

        #[arg(long)]
        hook: Option<String>,

        #[arg(long)]
        severity: Option<Severity>,

        #[arg(long)]
        provider: Option<String>,

        /// Event id, task id or spec id
        #[arg(long)]
        correlation_id: Option<String>,

        /// Only successful executions
        #[arg(long, conflicts_with = "failed")]
        succeeded: bool,

        /// Only failed executions (timeouts included)
        #[arg(long)]
        failed: bool,

        /// RFC 3339 lower bound, inclusive
        #[arg(long)]
        since: Option<DateTime<Utc>>,

        /// RFC 3339 upper bound, inclusive
        #[arg(long)]
        until: Option<DateTime<Utc>>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Aggregate counts over the whole trail
    Stats,

    /// Markdown summary of the trail
    Report,

    /// Delete the audit trail and its backups
    Clear,
}

pub(crate) fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
