//! Provenance attestations for completed operations.
//!
//! A statement lists the subjects an operation produced (name plus content
//! digest) and records who built it and when. Exported statements are plain
//! JSON files that [`load`] reads back unchanged.

pub mod builder;
pub mod error;
pub mod statement;
pub mod subject;

pub use builder::{AttestationBuilder, FILE_SUFFIX, load, operation_slug};
pub use error::{AttestError, AttestResult};
pub use statement::{Attestation, PREDICATE_TYPE, Provenance, STATEMENT_TYPE};
pub use subject::{SHA256, Subject, sha256_file};
