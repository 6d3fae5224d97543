//! Engine settings: where hooks, scripts, logs and attestations live, and
//! the audit rotation limits.

pub mod paths;
pub mod settings;

pub use paths::{APP_NAME, global_hooks_path, global_settings_path};
pub use settings::{
    AttestationSettings, AuditSettings, PROJECT_SETTINGS_PATH, ResolvedPaths, Settings,
};
