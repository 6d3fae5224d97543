use crate::error::{AttestError, AttestResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUFFER_SIZE: usize = 8 * 1024;

pub const SHA256: &str = "sha256";

/// A named artifact and its content digests, keyed by algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub digest: BTreeMap<String, String>,
}

impl Subject {
    /// A subject with a single SHA-256 digest supplied by the caller.
    pub fn new(name: impl Into<String>, sha256_hex: impl Into<String>) -> Self {
        Self::with_digest(name, SHA256, sha256_hex)
    }

    pub fn with_digest(
        name: impl Into<String>,
        algorithm: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut digest = BTreeMap::new();
        digest.insert(algorithm.into(), value.into());
        Self {
            name: name.into(),
            digest,
        }
    }

    /// Hash `path` with SHA-256 and name the result `name`.
    pub fn from_file(name: impl Into<String>, path: &Path) -> AttestResult<Self> {
        Ok(Self::new(name, sha256_file(path)?))
    }

    pub fn sha256(&self) -> Option<&str> {
        self.digest.get(SHA256).map(String::as_str)
    }

    /// A non-blank name and at least one digest. A `sha256` value must be
    /// lowercase hex.
    pub(crate) fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.digest.is_empty()
            && self.digest.iter().all(|(alg, value)| {
                !alg.is_empty() && !value.is_empty() && (alg != SHA256 || is_lower_hex(value))
            })
    }
}

fn is_lower_hex(value: &str) -> bool {
    value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Lowercase hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> AttestResult<String> {
    let mut file = File::open(path).map_err(|e| AttestError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| AttestError::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_from_file_hashes_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("artifact.txt");
        std::fs::write(&path, b"abc").unwrap();

        let subject = Subject::from_file("artifact", &path).unwrap();
        assert_eq!(
            subject.sha256(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_from_file_spans_multiple_buffers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.bin");
        std::fs::write(&path, vec![0_u8; BUFFER_SIZE * 3 + 17]).unwrap();

        let streamed = sha256_file(&path).unwrap();
        let whole = format!("{:x}", Sha256::digest(vec![0_u8; BUFFER_SIZE * 3 + 17]));
        assert_eq!(streamed, whole);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = Subject::from_file("x", &dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, AttestError::Io { .. }));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(Subject::new("task-42", "abc")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "task-42", "digest": {"sha256": "abc"}})
        );
    }

    #[test]
    fn test_validity() {
        assert!(Subject::new("task-42", "abc").is_valid());
        assert!(!Subject::new(" ", "abc").is_valid());
        assert!(!Subject::new("task-42", "").is_valid());
        assert!(!Subject::new("task-42", "not-hex").is_valid());
        assert!(!Subject::new("task-42", "ABC").is_valid());
        assert!(Subject::with_digest("task-42", "gitCommit", "Not-Hex").is_valid());
    }
}
