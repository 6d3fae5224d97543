use hkw_audit::LoggerError;
use hkw_core::ValidationReport;

/// Failures that stop the engine from processing an event at all.
///
/// Per-hook problems are not here; they end up in the hook's
/// [`hkw_core::ExecutionResult`].
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Invalid hook configuration: {0}")]
    Config(#[from] ValidationReport),

    #[error(transparent)]
    Logger(#[from] LoggerError),

    #[error("Emission worker stopped before finishing event '{event_type}'")]
    WorkerGone { event_type: String },
}

impl EngineError {
    /// Process exit code for the CLI: `1` for configuration problems,
    /// `2` for audit or worker failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,
            Self::Logger(_) | Self::WorkerGone { .. } => 2,
        }
    }
}
