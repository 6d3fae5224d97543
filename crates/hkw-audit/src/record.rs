use chrono::{DateTime, Utc};
use hkw_core::{Event, ExecutionResult, FailMode, HookOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

const TRUNCATION_MARKER: &str = "…[truncated]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "Invalid severity '{other}'. Valid values: info, warning, error"
            )),
        }
    }
}

/// Bucket used by [`crate::AuditStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    Success,
    Failure,
    Timeout,
}

impl RecordCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of `hooks.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub event_id: Ulid,
    pub event_type: String,
    pub hook_name: String,
    pub success: bool,
    #[serde(default)]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub status: HookOutcome,
    pub severity: Severity,
    pub category: RecordCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_excerpt: Option<String>,
}

impl AuditRecord {
    /// Build the record for one attempted hook.
    ///
    /// Failures of `stop` hooks are errors; failures of `continue` hooks are
    /// warnings because the sequence carried on.
    pub fn from_result(
        result: &ExecutionResult,
        event: &Event,
        fail_mode: FailMode,
        excerpt_bytes: usize,
    ) -> Self {
        let category = match result.outcome {
            HookOutcome::Succeeded | HookOutcome::Skipped => RecordCategory::Success,
            HookOutcome::Failed => RecordCategory::Failure,
            HookOutcome::TimedOut => RecordCategory::Timeout,
        };
        let severity = match (result.outcome.is_failure(), fail_mode) {
            (false, _) => Severity::Info,
            (true, FailMode::Continue) => Severity::Warning,
            (true, FailMode::Stop) => Severity::Error,
        };

        Self {
            timestamp: result.timestamp,
            event_id: result.event_id,
            event_type: result.event_type.clone(),
            hook_name: result.hook_name.clone(),
            success: result.success,
            exit_code: result.exit_code,
            duration_ms: result.duration_ms,
            status: result.outcome,
            severity,
            category,
            provider: None,
            task_id: event.task_id.clone(),
            spec_id: event.spec_id.clone(),
            error: result.error.clone(),
            stdout_excerpt: excerpt(&result.stdout, excerpt_bytes),
            stderr_excerpt: excerpt(&result.stderr, excerpt_bytes),
        }
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Whether `id` names this record's event, task or spec.
    pub fn correlates_with(&self, id: &str) -> bool {
        self.task_id.as_deref() == Some(id)
            || self.spec_id.as_deref() == Some(id)
            || self.event_id.to_string() == id
    }
}

/// Trim captured output to `max_bytes` on a char boundary.
///
/// Returns `None` for empty (or whitespace-only) output so it is omitted
/// from the line record.
pub fn excerpt(text: &str, max_bytes: usize) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    if text.len() <= max_bytes {
        return Some(text.to_string());
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    Some(format!("{}{TRUNCATION_MARKER}", &text[..end]))
}
