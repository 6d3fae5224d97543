use std::path::PathBuf;

/// Failure to persist or read the audit trail.
///
/// The audit trail is not best-effort: callers surface these instead of
/// reporting an execution as recorded.
#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("Audit log I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize audit record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to acquire audit log lock: {0}")]
    Lock(String),
}

impl LoggerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type LoggerResult<T> = Result<T, LoggerError>;
