use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use ulid::Ulid;

/// Default per-hook timeout when the configuration omits one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Hook failure handling strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    /// A failure aborts every remaining hook for the same event.
    Stop,
    /// Log the failure and move on to the next hook.
    #[default]
    Continue,
}

impl FailMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Continue => "continue",
        }
    }
}

impl fmt::Display for FailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single emission of a lifecycle event.
///
/// Events are built fresh by the caller for every emission and are never
/// persisted directly; only the audit records they produce are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Ulid,
    /// `<namespace>.<action>`, e.g. `task.created`.
    pub event_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: Ulid::new(),
            event_type: event_type.into(),
            context: BTreeMap::new(),
            task_id: None,
            spec_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_spec_id(mut self, spec_id: impl Into<String>) -> Self {
        self.spec_id = Some(spec_id.into());
        self
    }

    /// The part of the event type before the first dot.
    pub fn namespace(&self) -> Option<&str> {
        self.event_type
            .split_once('.')
            .map(|(namespace, _)| namespace)
    }
}

/// Terminal state of one hook attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookOutcome {
    Succeeded,
    Failed,
    TimedOut,
    /// Dry run: the hook would have executed, nothing was spawned.
    Skipped,
}

impl HookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Skipped => "skipped",
        }
    }

    /// Whether a `stop`-mode hook ending in this state aborts the sequence.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for HookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one attempted hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub hook_name: String,
    pub event_type: String,
    pub event_id: Ulid,
    pub outcome: HookOutcome,
    pub success: bool,
    /// `None` when the process never produced an exit status (spawn
    /// failure, rejection, kill on timeout, dry run).
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    /// Synthesized result for a dry run.
    pub fn would_execute(hook_name: &str, event: &Event, action: &str) -> Self {
        Self {
            hook_name: hook_name.to_string(),
            event_type: event.event_type.clone(),
            event_id: event.id,
            outcome: HookOutcome::Skipped,
            success: true,
            exit_code: None,
            duration_ms: 0,
            stdout: format!("[dry-run] would execute {action}"),
            stderr: String::new(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn is_timeout(&self) -> bool {
        self.outcome == HookOutcome::TimedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_mode_default_is_continue() {
        assert_eq!(FailMode::default(), FailMode::Continue);
    }

    #[test]
    fn test_fail_mode_serde_roundtrip() {
        #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
        struct Wrapper {
            fail_mode: FailMode,
        }

        let encoded = toml::to_string(&Wrapper {
            fail_mode: FailMode::Stop,
        })
        .unwrap();
        assert!(encoded.contains("fail_mode = \"stop\""));
        let decoded: Wrapper = toml::from_str(&encoded).unwrap();
        assert_eq!(decoded.fail_mode, FailMode::Stop);
    }

    #[test]
    fn test_fail_mode_rejects_unknown_value() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Wrapper {
            fail_mode: FailMode,
        }

        let result: Result<Wrapper, _> = toml::from_str("fail_mode = \"retry\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_event_builder() {
        let event = Event::new("task.created")
            .with_task_id("task-42")
            .with_spec_id("spec-7")
            .with_context("branch", "main");

        assert_eq!(event.event_type, "task.created");
        assert_eq!(event.task_id.as_deref(), Some("task-42"));
        assert_eq!(event.spec_id.as_deref(), Some("spec-7"));
        assert_eq!(event.context.get("branch").map(String::as_str), Some("main"));
        assert_eq!(event.namespace(), Some("task"));
    }

    #[test]
    fn test_event_namespace_without_dot() {
        assert_eq!(Event::new("task").namespace(), None);
    }

    #[test]
    fn test_event_ids_are_unique() {
        assert_ne!(Event::new("a.b").id, Event::new("a.b").id);
    }

    #[test]
    fn test_outcome_failure_classification() {
        assert!(HookOutcome::Failed.is_failure());
        assert!(HookOutcome::TimedOut.is_failure());
        assert!(!HookOutcome::Succeeded.is_failure());
        assert!(!HookOutcome::Skipped.is_failure());
    }

    #[test]
    fn test_would_execute_result() {
        let event = Event::new("spec.created");
        let result = ExecutionResult::would_execute("notify", &event, "command `echo hi`");
        assert_eq!(result.outcome, HookOutcome::Skipped);
        assert!(result.success);
        assert_eq!(result.exit_code, None);
        assert_eq!(result.event_id, event.id);
        assert!(result.stdout.contains("would execute"));
    }

    #[test]
    fn test_execution_result_json_field_names() {
        let event = Event::new("task.completed");
        let result = ExecutionResult::would_execute("lint", &event, "script `lint.sh`");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["hook_name"], "lint");
        assert_eq!(json["event_type"], "task.completed");
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["duration_ms"], 0);
        assert!(json.get("error").is_none());
    }
}
