//! The serialized statement: an in-toto Statement v1 carrying a SLSA
//! provenance v1 predicate.

use crate::subject::Subject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATEMENT_TYPE: &str = "https://in-toto.io/Statement/v1";
pub const PREDICATE_TYPE: &str = "https://slsa.dev/provenance/v1";

/// An immutable provenance statement about one completed operation.
///
/// Fields are private; build one with
/// [`AttestationBuilder`](crate::AttestationBuilder) or parse one with
/// [`load`](crate::load).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    #[serde(rename = "_type")]
    statement_type: String,
    subject: Vec<Subject>,
    #[serde(rename = "predicateType")]
    predicate_type: String,
    predicate: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub build_definition: BuildDefinition,
    pub run_details: RunDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDefinition {
    pub build_type: String,
    pub external_parameters: ExternalParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalParameters {
    pub operation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDetails {
    pub builder: Builder,
    pub metadata: BuildMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Builder {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMetadata {
    pub invocation_id: String,
    pub started_on: DateTime<Utc>,
}

impl Attestation {
    pub(crate) fn new(subjects: Vec<Subject>, predicate: Provenance) -> Self {
        Self {
            statement_type: STATEMENT_TYPE.to_string(),
            subject: subjects,
            predicate_type: PREDICATE_TYPE.to_string(),
            predicate,
        }
    }

    pub fn statement_type(&self) -> &str {
        &self.statement_type
    }

    pub fn predicate_type(&self) -> &str {
        &self.predicate_type
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subject
    }

    pub fn predicate(&self) -> &Provenance {
        &self.predicate
    }

    pub fn operation(&self) -> &str {
        &self.predicate.build_definition.external_parameters.operation
    }

    pub fn build_type(&self) -> &str {
        &self.predicate.build_definition.build_type
    }

    pub fn builder_id(&self) -> &str {
        &self.predicate.run_details.builder.id
    }

    pub fn invocation_id(&self) -> &str {
        &self.predicate.run_details.metadata.invocation_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.predicate.run_details.metadata.started_on
    }

    /// Why a parsed document is not a statement this crate would have
    /// produced, if it is not.
    pub(crate) fn shape_problem(&self) -> Option<String> {
        if self.statement_type != STATEMENT_TYPE {
            return Some(format!("_type is '{}', expected '{STATEMENT_TYPE}'", self.statement_type));
        }
        if self.predicate_type != PREDICATE_TYPE {
            return Some(format!(
                "predicateType is '{}', expected '{PREDICATE_TYPE}'",
                self.predicate_type
            ));
        }
        if self.subject.is_empty() {
            return Some("subject list is empty".to_string());
        }
        if let Some(index) = self.subject.iter().position(|s| !s.is_valid()) {
            return Some(format!("subject #{index} has an empty name or a malformed digest"));
        }
        None
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
