//! Locating the project and loading its settings.

use anyhow::{Context, Result};
use hkw_config::{ResolvedPaths, Settings};
use std::path::{Path, PathBuf};

pub(crate) struct Project {
    pub settings: Settings,
    pub paths: ResolvedPaths,
}

impl Project {
    pub fn load(project_root: Option<&Path>, settings_file: Option<&Path>) -> Result<Self> {
        let root = resolve_root(project_root)?;
        let settings = Settings::load(&root, settings_file)?;
        let paths = settings.resolve(&root);
        tracing::debug!(
            project_root = %paths.project_root.display(),
            hooks_file = %paths.hooks_file.display(),
            "Project loaded"
        );
        Ok(Self { settings, paths })
    }

    pub fn root(&self) -> &Path {
        &self.paths.project_root
    }
}

fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    root.canonicalize()
        .with_context(|| format!("Project root not found: {}", root.display()))
}
