//! Confinement of hook script references to the trusted hooks root.

use hkw_core::SecurityError;
use std::path::{Component, Path, PathBuf};

/// Resolves script references against a trusted root and rejects anything
/// that is absolute or lands outside it.
///
/// Resolution is lexical first (so `subdir/../../etc` is caught even when
/// nothing exists on disk) and then, for existing paths, canonical (so a
/// symlink pointing out of the root is caught too).
#[derive(Debug, Clone)]
pub struct PathValidator {
    root: PathBuf,
}

impl PathValidator {
    /// The root is not touched until the first validation, so a project
    /// with only inline commands needs no hooks directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `candidate` under the root.
    pub fn validate(&self, candidate: impl AsRef<Path>) -> Result<PathBuf, SecurityError> {
        let candidate = candidate.as_ref();
        let display = candidate.display().to_string();
        if candidate.is_absolute() || candidate.has_root() {
            return Err(SecurityError::AbsolutePath(display));
        }

        let root = self.canonical_root()?;
        let outside = || SecurityError::OutsideRoot {
            candidate: display.clone(),
            root: root.display().to_string(),
        };

        let mut resolved = root.clone();
        let mut depth = 0usize;
        for component in candidate.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(outside());
                    }
                    resolved.pop();
                    depth -= 1;
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(SecurityError::AbsolutePath(display.clone()));
                }
            }
        }
        // The root itself is not a script.
        if depth == 0 {
            return Err(outside());
        }

        if resolved.exists() {
            let canonical = resolved.canonicalize().map_err(|_| outside())?;
            if canonical == root || !canonical.starts_with(&root) {
                return Err(outside());
            }
            return Ok(canonical);
        }
        Ok(resolved)
    }

    fn canonical_root(&self) -> Result<PathBuf, SecurityError> {
        self.root
            .canonicalize()
            .map_err(|e| SecurityError::RootUnavailable {
                root: self.root.display().to_string(),
                reason: e.to_string(),
            })
    }
}
