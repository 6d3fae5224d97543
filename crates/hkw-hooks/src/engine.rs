//! The engine façade: match, execute, record.

use crate::config::HookSet;
use crate::definition::HookDefinition;
use crate::error::EngineError;
use crate::executor::{HookExecutor, ResultSink};
use crate::path_guard::PathValidator;
use crate::summary::ExecutionSummary;
use hkw_audit::{AuditLogger, AuditRecord, LoggerError, RotationPolicy};
use hkw_config::{ResolvedPaths, Settings, global_hooks_path};
use hkw_core::{Event, ExecutionResult, ValidationReport};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_EXCERPT_BYTES: usize = 4096;

/// Writes each result to the audit trail as it arrives.
pub struct AuditSink<'a> {
    logger: &'a AuditLogger,
    provider: Option<&'a str>,
    excerpt_bytes: usize,
}

impl<'a> AuditSink<'a> {
    pub fn new(logger: &'a AuditLogger, provider: Option<&'a str>, excerpt_bytes: usize) -> Self {
        Self {
            logger,
            provider,
            excerpt_bytes,
        }
    }
}

impl ResultSink for AuditSink<'_> {
    fn record(
        &self,
        hook: &HookDefinition,
        event: &Event,
        result: &ExecutionResult,
    ) -> Result<(), LoggerError> {
        let record = AuditRecord::from_result(result, event, hook.fail_mode, self.excerpt_bytes)
            .with_provider(self.provider.map(str::to_string));
        self.logger.log(&record)
    }
}

/// One configured engine instance.
///
/// Construct once and share (`Arc<HookEngine>`); there is no global
/// instance. Tests build their own against a temporary directory and reset
/// the trail with [`HookEngine::logger`]`.clear()`.
pub struct HookEngine {
    hooks: HookSet,
    executor: HookExecutor,
    logger: Arc<AuditLogger>,
    provider: Option<String>,
    excerpt_bytes: usize,
}

impl HookEngine {
    pub fn new(hooks: HookSet, executor: HookExecutor, logger: Arc<AuditLogger>) -> Self {
        Self {
            hooks,
            executor,
            logger,
            provider: None,
            excerpt_bytes: DEFAULT_EXCERPT_BYTES,
        }
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_excerpt_bytes(mut self, excerpt_bytes: usize) -> Self {
        self.excerpt_bytes = excerpt_bytes;
        self
    }

    /// Load the global and project hooks documents and wire everything
    /// from `settings`.
    pub fn from_settings(project_root: &Path, settings: &Settings) -> Result<Self, EngineError> {
        let global = global_hooks_path();
        Self::from_settings_with(project_root, settings, global.as_deref())
    }

    /// Like [`Self::from_settings`] with an explicit global hooks document
    /// (`None` to ignore it).
    pub fn from_settings_with(
        project_root: &Path,
        settings: &Settings,
        global_hooks: Option<&Path>,
    ) -> Result<Self, EngineError> {
        let paths = settings.resolve(project_root);
        let hooks = validate_config(&paths, global_hooks)?;
        let logger = AuditLogger::new(
            &paths.log_dir,
            RotationPolicy {
                max_bytes: settings.audit.max_bytes,
                max_backups: settings.audit.max_backups,
            },
        );
        let executor = HookExecutor::new(&paths.project_root, PathValidator::new(&paths.hooks_root));
        debug!(hooks = hooks.len(), log_dir = %paths.log_dir.display(), "Hook engine ready");

        Ok(Self::new(hooks, executor, Arc::new(logger))
            .with_provider(settings.provider.clone())
            .with_excerpt_bytes(settings.audit.output_excerpt_bytes))
    }

    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    pub fn executor(&self) -> &HookExecutor {
        &self.executor
    }

    pub fn logger(&self) -> &Arc<AuditLogger> {
        &self.logger
    }

    pub fn matching(&self, event_type: &str) -> Vec<&HookDefinition> {
        self.hooks.matching(event_type)
    }

    /// Run every matching hook for `event` and record each attempt.
    ///
    /// No match is not an error: the summary is simply empty. Hook failures
    /// are in the summary; `Err` means the audit trail could not be written.
    pub fn emit(&self, event: &Event) -> Result<ExecutionSummary, EngineError> {
        self.emit_with(event, false)
    }

    /// Report what [`Self::emit`] would run without spawning or recording
    /// anything.
    pub fn dry_run(&self, event: &Event) -> Result<ExecutionSummary, EngineError> {
        self.emit_with(event, true)
    }

    pub fn emit_with(&self, event: &Event, dry_run: bool) -> Result<ExecutionSummary, EngineError> {
        let matched = self.matching(&event.event_type);
        if matched.is_empty() {
            debug!(event_type = %event.event_type, "No hooks match event");
        }
        let sink = AuditSink::new(&self.logger, self.provider.as_deref(), self.excerpt_bytes);
        let summary = self.executor.execute(event, &matched, dry_run, &sink)?;
        info!(
            event_type = %event.event_type,
            event_id = %event.id,
            matched = summary.matched.len(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            aborted = summary.was_aborted(),
            dry_run,
            "Event processed"
        );
        Ok(summary)
    }
}

/// The side-effect-free validate pass over the layered hooks documents.
pub fn validate_config(
    paths: &ResolvedPaths,
    global_hooks: Option<&Path>,
) -> Result<HookSet, ValidationReport> {
    let validator = PathValidator::new(&paths.hooks_root);
    HookSet::load_layered(global_hooks, &paths.hooks_file, &validator)
}
