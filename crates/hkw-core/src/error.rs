use crate::types::HookOutcome;
use std::time::Duration;

/// A script reference that would execute something outside the trusted root.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Absolute script path '{0}' is not allowed; use a path relative to the hooks root")]
    AbsolutePath(String),

    #[error("Script path '{candidate}' resolves outside hooks root '{root}'")]
    OutsideRoot { candidate: String, root: String },

    #[error("Hooks root '{root}' is unavailable: {reason}")]
    RootUnavailable { root: String, reason: String },
}

/// A problem in the hook configuration, found by the validate pass.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse hooks document {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unsupported hooks document version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Hook #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("Duplicate hook name '{0}'")]
    DuplicateName(String),

    #[error("Hook '{hook}' declares no events")]
    NoEvents { hook: String },

    #[error("Hook '{hook}' has invalid event pattern '{pattern}': {reason}")]
    InvalidPattern {
        hook: String,
        pattern: String,
        reason: String,
    },

    #[error("Hook '{hook}' must declare exactly one of `script` or `command`")]
    AmbiguousAction { hook: String },

    #[error("Hook '{hook}' has an empty command")]
    EmptyCommand { hook: String },

    #[error("Hook '{hook}' references missing script '{path}'")]
    ScriptNotFound { hook: String, path: String },

    #[error("Hook '{hook}' has a zero timeout")]
    ZeroTimeout { hook: String },

    #[error("Hook '{hook}': {source}")]
    Security {
        hook: String,
        #[source]
        source: SecurityError,
    },
}

impl ConfigError {
    /// Name of the offending hook, when the problem is tied to one.
    pub fn hook_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateName(hook)
            | Self::NoEvents { hook }
            | Self::InvalidPattern { hook, .. }
            | Self::AmbiguousAction { hook }
            | Self::EmptyCommand { hook }
            | Self::ScriptNotFound { hook, .. }
            | Self::ZeroTimeout { hook }
            | Self::Security { hook, .. } => Some(hook),
            Self::Parse { .. } | Self::UnsupportedVersion { .. } | Self::EmptyName { .. } => None,
        }
    }
}

/// Every configuration problem found in one validate pass.
#[derive(thiserror::Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", render_problems(.errors))]
pub struct ValidationReport {
    pub errors: Vec<ConfigError>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn push(&mut self, error: ConfigError) {
        self.errors.push(error);
    }
}

fn render_problems(errors: &[ConfigError]) -> String {
    let mut out = format!("{} configuration problem(s)", errors.len());
    for error in errors {
        out.push_str("\n  - ");
        out.push_str(&error.to_string());
    }
    out
}

impl From<ConfigError> for ValidationReport {
    fn from(error: ConfigError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// Why an attempted hook did not succeed.
///
/// These never escape the executor as `Err`; they are rendered into
/// `ExecutionResult::error`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionFailure {
    #[error("Hook '{hook}' exited with code {code}")]
    NonZeroExit { hook: String, code: i32 },

    #[error("Hook '{hook}' was terminated by a signal")]
    Signaled { hook: String },

    #[error("Hook '{hook}' timed out after {}s", .timeout.as_secs_f64())]
    TimedOut { hook: String, timeout: Duration },

    #[error("Failed to spawn hook '{hook}': {message}")]
    Spawn { hook: String, message: String },

    #[error("Hook '{hook}' rejected: {source}")]
    Rejected {
        hook: String,
        #[source]
        source: SecurityError,
    },
}

impl ExecutionFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    pub fn outcome(&self) -> HookOutcome {
        if self.is_timeout() {
            HookOutcome::TimedOut
        } else {
            HookOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_absolute_path() {
        let err = SecurityError::AbsolutePath("/etc/passwd".into());
        assert_eq!(
            err.to_string(),
            "Absolute script path '/etc/passwd' is not allowed; use a path relative to the hooks root"
        );
    }

    #[test]
    fn test_display_outside_root() {
        let err = SecurityError::OutsideRoot {
            candidate: "subdir/../../etc".into(),
            root: "/srv/hooks".into(),
        };
        assert_eq!(
            err.to_string(),
            "Script path 'subdir/../../etc' resolves outside hooks root '/srv/hooks'"
        );
    }

    #[test]
    fn test_display_timeout_mentions_timed_out() {
        let err = ExecutionFailure::TimedOut {
            hook: "slow".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(err.to_string(), "Hook 'slow' timed out after 1s");
        assert!(err.is_timeout());
        assert_eq!(err.outcome(), HookOutcome::TimedOut);
    }

    #[test]
    fn test_display_subsecond_timeout() {
        let err = ExecutionFailure::TimedOut {
            hook: "fast".into(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Hook 'fast' timed out after 0.25s");
    }

    #[test]
    fn test_non_timeout_failures_map_to_failed() {
        let err = ExecutionFailure::NonZeroExit {
            hook: "lint".into(),
            code: 2,
        };
        assert_eq!(err.to_string(), "Hook 'lint' exited with code 2");
        assert!(!err.is_timeout());
        assert_eq!(err.outcome(), HookOutcome::Failed);
    }

    #[test]
    fn test_config_error_hook_name() {
        let err = ConfigError::ScriptNotFound {
            hook: "lint".into(),
            path: "lint.sh".into(),
        };
        assert_eq!(err.hook_name(), Some("lint"));
        assert_eq!(
            ConfigError::UnsupportedVersion {
                found: 9,
                supported: 1
            }
            .hook_name(),
            None
        );
    }

    #[test]
    fn test_config_error_wraps_security_source() {
        use std::error::Error;

        let err = ConfigError::Security {
            hook: "evil".into(),
            source: SecurityError::AbsolutePath("/bin/sh".into()),
        };
        assert!(err.to_string().starts_with("Hook 'evil': Absolute script path"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_validation_report_lists_every_error() {
        let mut report = ValidationReport::default();
        assert!(report.is_empty());
        report.push(ConfigError::DuplicateName("a".into()));
        report.push(ConfigError::NoEvents { hook: "b".into() });

        assert_eq!(report.len(), 2);
        let rendered = report.to_string();
        assert!(rendered.starts_with("2 configuration problem(s)"));
        assert!(rendered.contains("Duplicate hook name 'a'"));
        assert!(rendered.contains("Hook 'b' declares no events"));
    }

    #[test]
    fn test_validation_report_is_a_std_error() {
        use std::error::Error;

        let report = ValidationReport::from(ConfigError::DuplicateName("a".into()));
        let boxed: Box<dyn Error + Send + Sync> = Box::new(report.clone());

        assert!(boxed.source().is_none());
        assert_eq!(
            boxed.to_string(),
            format!("1 configuration problem(s)\n  - {}", report.errors[0])
        );
    }

    #[test]
    fn test_errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SecurityError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<ExecutionFailure>();
        assert_send_sync::<ValidationReport>();
    }
}
