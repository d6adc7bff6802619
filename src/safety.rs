//! Containment of patch targets.
//!
//! Request paths come from an editing agent and are resolved against a
//! workspace root. A target must be a regular file, must stay under the root
//! once symlinks are resolved, and must not live in version-control metadata.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Version-control metadata directories never patched, relative to the root.
const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Keeps patch targets inside a workspace root.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical workspace root
    root: PathBuf,
    /// Canonical VCS directories present under the root
    forbidden: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("{path} resolves outside the workspace {root}")]
    OutsideWorkspace { path: PathBuf, root: PathBuf },

    #[error("{path} is inside {forbidden}, which is never patched")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("{path} is not a regular file")]
    NotAFile { path: PathBuf },

    #[error("cannot resolve {path}: {source}")]
    Unresolvable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WorkspaceGuard {
    /// Create a guard rooted at `root`.
    ///
    /// The root is canonicalized so symlinked roots compare correctly. Any of
    /// `.git`, `.hg` or `.svn` present under it are forbidden.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = resolve(root.as_ref())?;
        let forbidden = VCS_DIRS
            .iter()
            .filter_map(|dir| root.join(dir).canonicalize().ok())
            .collect();

        Ok(Self { root, forbidden })
    }

    /// Resolve a request path against the root and check it.
    ///
    /// Returns the canonical absolute path of an existing regular file.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        self.check(&joined)
    }

    /// Re-check a previously validated path right before writing to it.
    pub fn revalidate(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        self.check(path)
    }

    fn check(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        let canonical = resolve(path)?;

        if !canonical.starts_with(&self.root) {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical,
                root: self.root.clone(),
            });
        }

        if let Some(forbidden) = self.forbidden.iter().find(|dir| canonical.starts_with(dir)) {
            return Err(SafetyError::ForbiddenPath {
                path: canonical,
                forbidden: forbidden.clone(),
            });
        }

        if !canonical.is_file() {
            return Err(SafetyError::NotAFile { path: canonical });
        }

        Ok(canonical)
    }
}

fn resolve(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Unresolvable {
        path: path.to_path_buf(),
        source,
    })
}
