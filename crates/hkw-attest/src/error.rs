use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum AttestError {
    #[error("Attestation operation name must not be empty")]
    EmptyOperation,

    #[error("Attestation for '{0}' has no subjects")]
    NoSubjects(String),

    #[error("Attestation subject #{0} has an empty name or a malformed digest")]
    InvalidSubject(usize),

    #[error("Not a hookwarden attestation {}: {reason}", .path.display())]
    UnsupportedStatement { path: PathBuf, reason: String },

    #[error("Attestation I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed attestation {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AttestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type AttestResult<T> = Result<T, AttestError>;
