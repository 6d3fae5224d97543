//! Event pattern parsing and matching.

use crate::definition::HookDefinition;
use std::fmt;

/// A parsed `events[].type` entry.
///
/// Either an exact event type or a single-level namespace wildcard
/// `"<namespace>.*"`. The wildcard matches exactly one further segment:
/// `task.*` matches `task.created` but neither `task` nor
/// `task.sub.created`. Middle or repeated wildcards are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventPattern {
    Exact(String),
    Namespace(String),
}

impl EventPattern {
    /// Parse a pattern, returning a human-readable reason on rejection.
    pub fn parse(pattern: &str) -> Result<Self, String> {
        if pattern.is_empty() {
            return Err("pattern is empty".to_string());
        }
        if pattern.chars().any(char::is_whitespace) {
            return Err("pattern contains whitespace".to_string());
        }
        if pattern == "*" {
            return Err("a bare `*` is not supported; use `<namespace>.*`".to_string());
        }

        let (body, wildcard) = match pattern.strip_suffix(".*") {
            Some(namespace) => (namespace, true),
            None => (pattern, false),
        };
        if body.contains('*') {
            return Err("only a single trailing `.*` wildcard is supported".to_string());
        }
        if body.split('.').any(str::is_empty) {
            return Err("pattern has an empty segment".to_string());
        }

        Ok(if wildcard {
            Self::Namespace(body.to_string())
        } else {
            Self::Exact(body.to_string())
        })
    }

    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == event_type,
            Self::Namespace(namespace) => event_type
                .strip_prefix(namespace.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|action| !action.is_empty() && !action.contains('.')),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Namespace(_))
    }
}

impl fmt::Display for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(event_type) => f.write_str(event_type),
            Self::Namespace(namespace) => write!(f, "{namespace}.*"),
        }
    }
}

impl std::str::FromStr for EventPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Enabled hooks with at least one pattern matching `event_type`, in
/// definition order.
pub fn match_hooks<'a>(event_type: &str, hooks: &'a [HookDefinition]) -> Vec<&'a HookDefinition> {
    hooks
        .iter()
        .filter(|hook| hook.enabled && hook.matches(event_type))
        .collect()
}
