//! Hook configuration documents: parsing, the validate pass and layering.
//!
//! ```toml
//! version = 1
//!
//! [[hooks]]
//! name = "quality-check-strict"
//! events = [{ type = "implement.completed" }]
//! script = "checks/quality.sh"
//! timeout = 120
//! fail_mode = "stop"
//!
//! [[hooks]]
//! name = "catch-all-tasks"
//! events = [{ type = "task.*" }]
//! command = "echo {event_type} >> .hookwarden/seen.txt"
//! env = { LEVEL = "debug" }
//! ```
//!
//! JSON (`.json`) and YAML (`.yaml`/`.yml`) documents use the same shape.

use crate::definition::{HookAction, HookDefinition};
use crate::path_guard::PathValidator;
use crate::pattern::{EventPattern, match_hooks};
use hkw_core::{ConfigError, DEFAULT_TIMEOUT_SECS, FailMode, ValidationReport};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Document schema version understood by this engine.
pub const SUPPORTED_VERSION: u32 = 1;

fn default_version() -> u32 {
    SUPPORTED_VERSION
}
fn default_true() -> bool {
    true
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Raw hooks document as written on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HooksDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub hooks: Vec<HookEntry>,
}

impl Default for HooksDocument {
    fn default() -> Self {
        Self {
            version: SUPPORTED_VERSION,
            hooks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookEntry {
    pub name: String,
    #[serde(default)]
    pub events: Vec<EventEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub fail_mode: FailMode,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventEntry {
    #[serde(rename = "type")]
    pub event_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
    Yaml,
}

impl DocumentFormat {
    /// By extension; anything unrecognized is read as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Toml,
        }
    }
}

impl HooksDocument {
    pub fn parse(content: &str, format: DocumentFormat, origin: &str) -> Result<Self, ConfigError> {
        let parsed = match format {
            DocumentFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            DocumentFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            // An empty YAML file is a null document, not an error.
            DocumentFormat::Yaml if content.trim().is_empty() => Ok(Self::default()),
            DocumentFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: origin.to_string(),
            message,
        })
    }

    /// `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ConfigError::Parse {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };
        Self::parse(
            &content,
            DocumentFormat::from_path(path),
            &path.display().to_string(),
        )
        .map(Some)
    }

    /// The validate pass: every problem in the document, or the definitions.
    ///
    /// Touches the filesystem only to resolve script paths.
    pub fn validate(&self, validator: &PathValidator) -> Result<Vec<HookDefinition>, ValidationReport> {
        let mut report = ValidationReport::default();
        if self.version != SUPPORTED_VERSION {
            report.push(ConfigError::UnsupportedVersion {
                found: self.version,
                supported: SUPPORTED_VERSION,
            });
        }

        let mut seen = HashSet::new();
        let mut reported_duplicates = HashSet::new();
        let mut definitions = Vec::with_capacity(self.hooks.len());
        for (index, entry) in self.hooks.iter().enumerate() {
            let name = entry.name.trim();
            if name.is_empty() {
                report.push(ConfigError::EmptyName { index });
            } else if !seen.insert(name) && reported_duplicates.insert(name) {
                report.push(ConfigError::DuplicateName(name.to_string()));
            }
            let label = if name.is_empty() {
                format!("#{index}")
            } else {
                name.to_string()
            };
            if let Some(definition) = entry.to_definition(&label, validator, &mut report) {
                definitions.push(definition);
            }
        }

        if report.is_empty() {
            Ok(definitions)
        } else {
            Err(report)
        }
    }
}

impl HookEntry {
    fn to_definition(
        &self,
        label: &str,
        validator: &PathValidator,
        report: &mut ValidationReport,
    ) -> Option<HookDefinition> {
        let before = report.len();

        if self.events.is_empty() {
            report.push(ConfigError::NoEvents {
                hook: label.to_string(),
            });
        }
        let mut patterns = Vec::with_capacity(self.events.len());
        for event in &self.events {
            match EventPattern::parse(&event.event_type) {
                Ok(pattern) => patterns.push(pattern),
                Err(reason) => report.push(ConfigError::InvalidPattern {
                    hook: label.to_string(),
                    pattern: event.event_type.clone(),
                    reason,
                }),
            }
        }

        let action = match (&self.script, &self.command) {
            (Some(script), None) => match validator.validate(script) {
                Ok(resolved) if resolved.is_file() => Some(HookAction::Script(PathBuf::from(script))),
                Ok(_) => {
                    report.push(ConfigError::ScriptNotFound {
                        hook: label.to_string(),
                        path: script.clone(),
                    });
                    None
                }
                Err(source) => {
                    report.push(ConfigError::Security {
                        hook: label.to_string(),
                        source,
                    });
                    None
                }
            },
            (None, Some(command)) if command.trim().is_empty() => {
                report.push(ConfigError::EmptyCommand {
                    hook: label.to_string(),
                });
                None
            }
            (None, Some(command)) => Some(HookAction::Command(command.clone())),
            _ => {
                report.push(ConfigError::AmbiguousAction {
                    hook: label.to_string(),
                });
                None
            }
        };

        if self.timeout == 0 {
            report.push(ConfigError::ZeroTimeout {
                hook: label.to_string(),
            });
        }

        if report.len() != before {
            return None;
        }
        Some(HookDefinition {
            name: label.to_string(),
            events: patterns,
            action: action?,
            timeout: Duration::from_secs(self.timeout),
            fail_mode: self.fail_mode,
            env: self.env.clone(),
            enabled: self.enabled,
        })
    }
}

/// The loaded, validated hooks, in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookSet {
    hooks: Vec<HookDefinition>,
}

impl HookSet {
    /// Build from definitions constructed in code.
    ///
    /// Patterns and actions are already typed; names, events and timeouts
    /// are still checked.
    pub fn new(hooks: Vec<HookDefinition>) -> Result<Self, ValidationReport> {
        let mut report = ValidationReport::default();
        let mut seen = HashSet::new();
        for (index, hook) in hooks.iter().enumerate() {
            if hook.name.trim().is_empty() {
                report.push(ConfigError::EmptyName { index });
                continue;
            }
            if !seen.insert(hook.name.as_str()) {
                report.push(ConfigError::DuplicateName(hook.name.clone()));
            }
            if hook.events.is_empty() {
                report.push(ConfigError::NoEvents {
                    hook: hook.name.clone(),
                });
            }
            if hook.timeout.is_zero() {
                report.push(ConfigError::ZeroTimeout {
                    hook: hook.name.clone(),
                });
            }
            if let HookAction::Command(command) = &hook.action {
                if command.trim().is_empty() {
                    report.push(ConfigError::EmptyCommand {
                        hook: hook.name.clone(),
                    });
                }
            }
        }
        if report.is_empty() {
            Ok(Self { hooks })
        } else {
            Err(report)
        }
    }

    /// Load and validate one document. A missing file yields an empty set.
    pub fn load(path: &Path, validator: &PathValidator) -> Result<Self, ValidationReport> {
        match HooksDocument::load(path)? {
            Some(document) => Ok(Self {
                hooks: document.validate(validator)?,
            }),
            None => {
                tracing::debug!(path = %path.display(), "No hooks document, no hooks loaded");
                Ok(Self::default())
            }
        }
    }

    /// Global document underneath the project one.
    ///
    /// Both documents are validated independently and their problems
    /// reported together. A project hook replaces the global hook of the same
    /// name in place; new project hooks follow the global ones.
    pub fn load_layered(
        global: Option<&Path>,
        project: &Path,
        validator: &PathValidator,
    ) -> Result<Self, ValidationReport> {
        let mut report = ValidationReport::default();
        let mut set = Self::default();

        if let Some(path) = global {
            match Self::load(path, validator) {
                Ok(global_set) => set.merge_with(global_set),
                Err(errors) => report.errors.extend(errors.errors),
            }
        }
        match Self::load(project, validator) {
            Ok(project_set) => set.merge_with(project_set),
            Err(errors) => report.errors.extend(errors.errors),
        }

        if report.is_empty() { Ok(set) } else { Err(report) }
    }

    /// Merge another set into self, with `other` taking priority by name.
    pub fn merge_with(&mut self, other: Self) {
        for hook in other.hooks {
            match self.hooks.iter_mut().find(|h| h.name == hook.name) {
                Some(existing) => *existing = hook,
                None => self.hooks.push(hook),
            }
        }
    }

    pub fn hooks(&self) -> &[HookDefinition] {
        &self.hooks
    }

    pub fn get(&self, name: &str) -> Option<&HookDefinition> {
        self.hooks.iter().find(|h| h.name == name)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn matching(&self, event_type: &str) -> Vec<&HookDefinition> {
        match_hooks(event_type, &self.hooks)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
