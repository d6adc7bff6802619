//! Reading patch targets from disk and writing results back.
//!
//! The engine itself never touches the filesystem. This layer reads the target,
//! fingerprints it, runs the engine, and writes the result back only when the
//! request succeeded, changed something, and the file still holds what was read.

use crate::config::EngineConfig;
use crate::engine::{Engine, ProcessResult};
use crate::request::PatchRequest;
use crate::safety::{SafetyError, WorkspaceGuard};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

/// Content larger than this is fingerprinted by hash instead of kept verbatim.
const EXACT_MATCH_LIMIT: usize = 1024;

/// Fingerprint of file content taken when it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of the expected text
    Hash(u64),
}

impl ContentVerification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            ContentVerification::ExactMatch(expected) => text == expected,
            ContentVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Keep small text verbatim, hash anything over 1 KiB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > EXACT_MATCH_LIMIT {
            ContentVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            ContentVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Write,
    /// Run the engine but never touch the file.
    DryRun,
}

/// Result of patching one file.
#[derive(Debug, Clone)]
#[must_use = "FilePatch should be checked for success"]
pub struct FilePatch {
    pub path: PathBuf,
    pub result: ProcessResult,
    /// Whether new content was persisted.
    pub written: bool,
}

impl FilePatch {
    pub fn success(&self) -> bool {
        self.result.success
    }
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    Utf8 { path: PathBuf },

    #[error("{path} changed on disk while it was being patched")]
    ConcurrentModification { path: PathBuf },

    #[error(transparent)]
    Safety(#[from] SafetyError),
}

/// Applies requests to files, optionally confined to a workspace.
#[derive(Debug, Clone, Default)]
pub struct FilePatcher {
    engine: Engine,
    guard: Option<WorkspaceGuard>,
}

impl FilePatcher {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            guard: None,
        }
    }

    /// Resolve targets against the guard's root and refuse anything outside it.
    pub fn with_guard(mut self, guard: WorkspaceGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Path a request's `target_id` refers to.
    pub fn resolve(&self, request: &PatchRequest) -> Result<PathBuf, WriteError> {
        match &self.guard {
            Some(guard) => Ok(guard.validate_path(&request.target_id)?),
            None => Ok(PathBuf::from(&request.target_id)),
        }
    }

    pub fn patch(&self, request: &PatchRequest, mode: WriteMode) -> Result<FilePatch, WriteError> {
        let path = self.resolve(request)?;
        self.patch_path(&path, request, mode)
    }

    /// Apply `request` to the file at `path`, ignoring `target_id`.
    pub fn patch_path(
        &self,
        path: &Path,
        request: &PatchRequest,
        mode: WriteMode,
    ) -> Result<FilePatch, WriteError> {
        let content = read_text(path)?;
        let fingerprint = ContentVerification::from_text(&content);
        let result = self.engine.process(request, &content);

        if !result.is_changed() || mode == WriteMode::DryRun {
            debug!(
                path = %path.display(),
                success = result.success,
                changed = result.is_changed(),
                dry_run = mode == WriteMode::DryRun,
                "not writing"
            );
            return Ok(FilePatch {
                path: path.to_path_buf(),
                result,
                written: false,
            });
        }

        self.commit(path, &fingerprint, &result)?;

        Ok(FilePatch {
            path: path.to_path_buf(),
            result,
            written: true,
        })
    }

    /// Write `result` back if the file still matches `fingerprint`.
    fn commit(
        &self,
        path: &Path,
        fingerprint: &ContentVerification,
        result: &ProcessResult,
    ) -> Result<(), WriteError> {
        if let Some(guard) = &self.guard {
            guard.revalidate(path)?;
        }

        let current = read_text(path)?;
        if !fingerprint.matches(&current) {
            return Err(WriteError::ConcurrentModification {
                path: path.to_path_buf(),
            });
        }

        atomic_write(path, result.modified_content.as_bytes()).map_err(|source| {
            WriteError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;

        // Update mtime so file watchers and build tools notice the change
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(path, now).map_err(|source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            path = %path.display(),
            chunks = result.applied_changes.len(),
            delta = result.total_delta(),
            "patched file"
        );
        Ok(())
    }
}

/// Apply `request` to the file at `path` under `config`, with no workspace guard.
pub fn patch_file(
    path: impl AsRef<Path>,
    request: &PatchRequest,
    config: &EngineConfig,
    mode: WriteMode,
) -> Result<FilePatch, WriteError> {
    FilePatcher::new(Engine::new(config.clone())).patch_path(path.as_ref(), request, mode)
}

fn read_text(path: &Path) -> Result<String, WriteError> {
    let bytes = fs::read(path).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| WriteError::Utf8 {
        path: path.to_path_buf(),
    })
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the file is left as it was.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            ))
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
