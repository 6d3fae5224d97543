use hkw_core::{Event, ExecutionResult, HookOutcome};
use serde::Serialize;

/// What happened for one emitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub event: Event,
    pub dry_run: bool,
    /// Names of every matched hook, in execution order.
    pub matched: Vec<String>,
    /// One entry per attempted hook.
    pub results: Vec<ExecutionResult>,
    /// The `stop`-mode hook whose failure ended the sequence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted_by: Option<String>,
    /// Matched hooks never attempted because of the abort.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl ExecutionSummary {
    pub fn new(event: Event, matched: Vec<String>, dry_run: bool) -> Self {
        Self {
            event,
            dry_run,
            matched,
            results: Vec::new(),
            aborted_by: None,
            skipped: Vec::new(),
        }
    }

    fn count(&self, outcome: HookOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(HookOutcome::Succeeded)
    }

    /// Failed for any reason, timeouts included.
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_failure()).count()
    }

    pub fn timed_out(&self) -> usize {
        self.count(HookOutcome::TimedOut)
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted_by.is_some()
    }

    pub fn result_for(&self, hook_name: &str) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| r.hook_name == hook_name)
    }

    /// `1` when a `stop` hook aborted the sequence, `0` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.was_aborted() { 1 } else { 0 }
    }
}
