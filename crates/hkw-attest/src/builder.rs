use crate::error::{AttestError, AttestResult};
use crate::statement::{
    Attestation, BuildDefinition, BuildMetadata, Builder, ExternalParameters, Provenance,
    RunDetails,
};
use crate::subject::Subject;
use chrono::Utc;
use hkw_config::AttestationSettings;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use ulid::Ulid;

pub const FILE_SUFFIX: &str = ".intoto.json";

/// Stamps a fixed builder identity onto statements and writes them to one
/// attestations directory.
#[derive(Debug, Clone)]
pub struct AttestationBuilder {
    builder_id: String,
    build_type: String,
    output_dir: PathBuf,
}

impl AttestationBuilder {
    pub fn new(
        builder_id: impl Into<String>,
        build_type: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            builder_id: builder_id.into(),
            build_type: build_type.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_settings(settings: &AttestationSettings, output_dir: impl Into<PathBuf>) -> Self {
        Self::new(&settings.builder_id, &settings.build_type, output_dir)
    }

    pub fn builder_id(&self) -> &str {
        &self.builder_id
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn build(&self, operation: &str, subjects: Vec<Subject>) -> AttestResult<Attestation> {
        let operation = operation.trim();
        if operation.is_empty() {
            return Err(AttestError::EmptyOperation);
        }
        if subjects.is_empty() {
            return Err(AttestError::NoSubjects(operation.to_string()));
        }
        if let Some(index) = subjects.iter().position(|s| !s.is_valid()) {
            return Err(AttestError::InvalidSubject(index));
        }

        let predicate = Provenance {
            build_definition: BuildDefinition {
                build_type: self.build_type.clone(),
                external_parameters: ExternalParameters {
                    operation: operation.to_string(),
                },
            },
            run_details: RunDetails {
                builder: Builder {
                    id: self.builder_id.clone(),
                },
                metadata: BuildMetadata {
                    invocation_id: Ulid::new().to_string(),
                    started_on: Utc::now(),
                },
            },
        };
        debug!(operation, subjects = subjects.len(), "Attestation built");
        Ok(Attestation::new(subjects, predicate))
    }

    /// Where [`Self::export`] puts the statement for `operation`.
    pub fn path_for(&self, operation: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}{FILE_SUFFIX}", operation_slug(operation)))
    }

    /// Write `attestation` as pretty JSON, replacing any earlier export for
    /// the same operation.
    pub fn export(&self, attestation: &Attestation) -> AttestResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| AttestError::io(&self.output_dir, e))?;
        let target = self.path_for(attestation.operation());
        let json = attestation
            .to_json_pretty()
            .map_err(|source| AttestError::Json {
                path: target.clone(),
                source,
            })?;
        atomic_write(&target, json.as_bytes())?;
        info!(
            operation = attestation.operation(),
            path = %target.display(),
            "Attestation exported"
        );
        Ok(target)
    }
}

/// Parse an exported statement.
///
/// Well-formed JSON is still rejected unless it is an in-toto Statement v1
/// with a SLSA provenance v1 predicate and at least one valid subject.
pub fn load(path: &Path) -> AttestResult<Attestation> {
    let content = std::fs::read_to_string(path).map_err(|e| AttestError::io(path, e))?;
    let attestation: Attestation =
        serde_json::from_str(&content).map_err(|source| AttestError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    if let Some(reason) = attestation.shape_problem() {
        return Err(AttestError::UnsupportedStatement {
            path: path.to_path_buf(),
            reason,
        });
    }
    Ok(attestation)
}

/// Lowercase ASCII alphanumerics; every other run of characters becomes one
/// `-`.
pub fn operation_slug(operation: &str) -> String {
    let mut slug = String::with_capacity(operation.len());
    for ch in operation.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("operation");
    }
    slug
}

fn atomic_write(target: &Path, data: &[u8]) -> AttestResult<()> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| AttestError::io(parent, e))?;
    tmp.write_all(data).map_err(|e| AttestError::io(tmp.path(), e))?;
    tmp.persist(target)
        .map_err(|e| AttestError::io(target, e.error))?;
    Ok(())
}
