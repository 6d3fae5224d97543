//! Layered engine settings.
//!
//! Resolution order (later wins, field by field):
//! 1. Built-in defaults
//! 2. Global settings (`~/.config/hookwarden/config.toml`)
//! 3. Project settings (`{project_root}/.hookwarden/config.toml`), or an
//!    explicit `--settings` file in its place
//! 4. Environment overrides (`HKW_LOG_DIR`, `HKW_HOOKS_ROOT`, `HKW_HOOKS_FILE`)
//!
//! ```toml
//! hooks_file = ".hookwarden/hooks.toml"
//! hooks_root = ".hookwarden/hooks"
//! log_dir = ".hookwarden/logs"
//! provider = "ci"
//!
//! [audit]
//! max_bytes = 10485760
//! max_backups = 5
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROJECT_SETTINGS_PATH: &str = ".hookwarden/config.toml";

const ENV_LOG_DIR: &str = "HKW_LOG_DIR";
const ENV_HOOKS_ROOT: &str = "HKW_HOOKS_ROOT";
const ENV_HOOKS_FILE: &str = "HKW_HOOKS_FILE";

/// Audit log rotation and capture limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Rotate the primary line-record file once it grows past this size.
    pub max_bytes: u64,
    /// Numbered backups kept after rotation; older ones are deleted.
    pub max_backups: usize,
    /// Bytes of stdout/stderr kept per audit record.
    pub output_excerpt_bytes: usize,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            max_backups: 5,
            output_excerpt_bytes: 4096,
        }
    }
}

/// Identity stamped into every attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationSettings {
    pub builder_id: String,
    pub build_type: String,
}

impl Default for AttestationSettings {
    fn default() -> Self {
        Self {
            builder_id: "https://hookwarden.dev/builder/v1".to_string(),
            build_type: "https://hookwarden.dev/hook-run/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Project hooks document.
    pub hooks_file: PathBuf,
    /// Trusted root every `script` reference must resolve under.
    pub hooks_root: PathBuf,
    pub log_dir: PathBuf,
    pub attestation_dir: PathBuf,
    /// Source tag stamped on audit records written by this process.
    pub provider: Option<String>,
    pub audit: AuditSettings,
    pub attestation: AttestationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hooks_file: PathBuf::from(".hookwarden/hooks.toml"),
            hooks_root: PathBuf::from(".hookwarden/hooks"),
            log_dir: PathBuf::from(".hookwarden/logs"),
            attestation_dir: PathBuf::from(".hookwarden/attestations"),
            provider: None,
            audit: AuditSettings::default(),
            attestation: AttestationSettings::default(),
        }
    }
}

/// One settings file; absent fields leave the lower layer untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsLayer {
    hooks_file: Option<PathBuf>,
    hooks_root: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    attestation_dir: Option<PathBuf>,
    provider: Option<String>,
    audit: Option<AuditLayer>,
    attestation: Option<AttestationLayer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuditLayer {
    max_bytes: Option<u64>,
    max_backups: Option<usize>,
    output_excerpt_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttestationLayer {
    builder_id: Option<String>,
    build_type: Option<String>,
}

impl SettingsLayer {
    fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }
}

/// Settings with every path made absolute against the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub hooks_file: PathBuf,
    pub hooks_root: PathBuf,
    pub log_dir: PathBuf,
    pub attestation_dir: PathBuf,
}

impl Settings {
    /// Load settings for `project_root` using the global settings file.
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let global = crate::paths::global_settings_path();
        let mut settings = Self::load_layered(project_root, explicit, global.as_deref())?;
        settings.apply_env_overrides_with(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Load defaults, then the global layer, then the project (or explicit) layer.
    ///
    /// Missing global/project files are skipped. A missing explicit file, or
    /// any file that fails to parse, is an error.
    pub fn load_layered(
        project_root: &Path,
        explicit: Option<&Path>,
        global: Option<&Path>,
    ) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(path) = global.filter(|p| p.exists()) {
            tracing::debug!(path = %path.display(), "Loading global settings");
            settings.merge_layer(SettingsLayer::load(path)?);
        }

        match explicit {
            Some(path) => {
                settings.merge_layer(SettingsLayer::load(path)?);
            }
            None => {
                let project = project_root.join(PROJECT_SETTINGS_PATH);
                if project.exists() {
                    tracing::debug!(path = %project.display(), "Loading project settings");
                    settings.merge_layer(SettingsLayer::load(&project)?);
                }
            }
        }

        Ok(settings)
    }

    fn merge_layer(&mut self, layer: SettingsLayer) {
        if let Some(v) = layer.hooks_file {
            self.hooks_file = v;
        }
        if let Some(v) = layer.hooks_root {
            self.hooks_root = v;
        }
        if let Some(v) = layer.log_dir {
            self.log_dir = v;
        }
        if let Some(v) = layer.attestation_dir {
            self.attestation_dir = v;
        }
        if layer.provider.is_some() {
            self.provider = layer.provider;
        }
        if let Some(audit) = layer.audit {
            if let Some(v) = audit.max_bytes {
                self.audit.max_bytes = v;
            }
            if let Some(v) = audit.max_backups {
                self.audit.max_backups = v;
            }
            if let Some(v) = audit.output_excerpt_bytes {
                self.audit.output_excerpt_bytes = v;
            }
        }
        if let Some(attestation) = layer.attestation {
            if let Some(v) = attestation.builder_id {
                self.attestation.builder_id = v;
            }
            if let Some(v) = attestation.build_type {
                self.attestation.build_type = v;
            }
        }
    }

    /// Apply `HKW_*` overrides using `lookup` as the environment.
    pub fn apply_env_overrides_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = non_empty(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty(ENV_HOOKS_ROOT) {
            self.hooks_root = PathBuf::from(v);
        }
        if let Some(v) = non_empty(ENV_HOOKS_FILE) {
            self.hooks_file = PathBuf::from(v);
        }
    }

    pub fn resolve(&self, project_root: &Path) -> ResolvedPaths {
        let absolute = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                project_root.join(p)
            }
        };
        ResolvedPaths {
            project_root: project_root.to_path_buf(),
            hooks_file: absolute(&self.hooks_file),
            hooks_root: absolute(&self.hooks_root),
            log_dir: absolute(&self.log_dir),
            attestation_dir: absolute(&self.attestation_dir),
        }
    }
}
