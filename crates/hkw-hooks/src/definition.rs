use crate::pattern::EventPattern;
use hkw_core::{DEFAULT_TIMEOUT_SECS, FailMode};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// What a hook runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    /// Script path relative to the hooks root, checked by
    /// [`crate::PathValidator`] at load time and again before every run.
    Script(PathBuf),
    /// Inline command run through `sh -c` after `{variable}` substitution.
    Command(String),
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script(path) => write!(f, "script {}", path.display()),
            Self::Command(command) => write!(f, "command `{command}`"),
        }
    }
}

/// A validated hook. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDefinition {
    pub name: String,
    pub events: Vec<EventPattern>,
    pub action: HookAction,
    pub timeout: Duration,
    pub fail_mode: FailMode,
    pub env: BTreeMap<String, String>,
    pub enabled: bool,
}

impl HookDefinition {
    pub fn new(name: impl Into<String>, action: HookAction) -> Self {
        Self {
            name: name.into(),
            events: Vec::new(),
            action,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fail_mode: FailMode::default(),
            env: BTreeMap::new(),
            enabled: true,
        }
    }

    pub fn with_event(mut self, pattern: EventPattern) -> Self {
        self.events.push(pattern);
        self
    }

    pub fn with_events(mut self, patterns: impl IntoIterator<Item = EventPattern>) -> Self {
        self.events.extend(patterns);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fail_mode(mut self, fail_mode: FailMode) -> Self {
        self.fail_mode = fail_mode;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Pattern check only; `enabled` is the matcher's concern.
    pub fn matches(&self, event_type: &str) -> bool {
        self.events.iter().any(|pattern| pattern.matches(event_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let hook = HookDefinition::new("lint", HookAction::Command("make lint".to_string()));
        assert_eq!(hook.timeout, Duration::from_secs(30));
        assert_eq!(hook.fail_mode, FailMode::Continue);
        assert!(hook.enabled);
        assert!(hook.env.is_empty());
        assert!(!hook.matches("task.created"));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(
            HookAction::Script(PathBuf::from("checks/lint.sh")).to_string(),
            "script checks/lint.sh"
        );
        assert_eq!(
            HookAction::Command("echo hi".to_string()).to_string(),
            "command `echo hi`"
        );
    }
}
