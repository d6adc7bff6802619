//! Patch orchestration.
//!
//! Chunks are applied one at a time, in submission order, against a working
//! line buffer that accumulates the earlier chunks' edits. A request either
//! applies completely or leaves the content untouched: the first chunk that
//! cannot be located or matched stops processing and discards the buffer.

use crate::anchor::AnchorLocator;
use crate::config::EngineConfig;
use crate::lines;
use crate::matcher::{build_edit, Edit, MatchError};
use crate::request::{Chunk, PatchRequest};
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, warn};

/// A chunk that was located and spliced into the working buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedChange {
    pub anchor: String,
    /// First replaced line, in the buffer as it was when the chunk applied.
    pub start: usize,
    /// One past the last replaced line.
    pub end: usize,
    pub delta: isize,
}

/// Outcome of one request.
///
/// On failure `modified_content` equals `original_content` and
/// `applied_changes` is empty, since nothing of the working buffer survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use = "ProcessResult should be checked for success"]
pub struct ProcessResult {
    pub original_content: String,
    pub modified_content: String,
    pub success: bool,
    pub applied_changes: Vec<AppliedChange>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ProcessResult {
    /// True when the request succeeded and produced different content.
    pub fn is_changed(&self) -> bool {
        self.success && self.modified_content != self.original_content
    }

    /// Sum of all applied deltas.
    pub fn total_delta(&self) -> isize {
        self.applied_changes.iter().map(|change| change.delta).sum()
    }
}

/// Closest existing line offered when an anchor is not found.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub line: usize,
    pub text: String,
    pub similarity: f64,
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "closest line {}: {:?} ({:.0}% similar)",
            self.line + 1,
            self.text,
            self.similarity * 100.0
        )
    }
}

fn suggestion_suffix(suggestion: &Option<Suggestion>) -> String {
    match suggestion {
        Some(s) => format!(" ({s})"),
        None => String::new(),
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChunkError {
    #[error("context not found: {anchor}{}", suggestion_suffix(.suggestion))]
    ContextNotFound {
        anchor: String,
        suggestion: Option<Suggestion>,
    },

    #[error("context not found: {anchor}: {source}")]
    WindowMismatch {
        anchor: String,
        #[source]
        source: MatchError,
    },

    #[error(
        "ambiguous insertion for {anchor}: line {} falls inside lines written by an earlier chunk",
        .line + 1
    )]
    AmbiguousEmptyMatch { anchor: String, line: usize },
}

/// Working state threaded through the chunks of one request.
#[derive(Debug, Clone, Default)]
struct Buffer {
    lines: Vec<String>,
    /// Line ranges produced by earlier chunks, in current coordinates.
    written: Vec<Range<usize>>,
}

impl Buffer {
    fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            written: Vec::new(),
        }
    }

    fn inside_written(&self, line: usize) -> bool {
        self.written
            .iter()
            .any(|range| range.start < line && line < range.end)
    }

    /// Splice `edit` in and keep the written ranges aligned with the new lines.
    fn apply(mut self, edit: Edit) -> Self {
        let (start, end, delta) = (edit.start, edit.end, edit.delta());
        let mut merged = start..start + edit.replacement.len();
        let mut written = Vec::with_capacity(self.written.len() + 1);

        for range in self.written.drain(..) {
            if range.end <= start {
                written.push(range);
            } else if range.start >= end {
                written.push(shift(range.start, delta)..shift(range.end, delta));
            } else {
                merged.start = merged.start.min(range.start);
                if range.end > end {
                    merged.end = merged.end.max(shift(range.end, delta));
                }
            }
        }
        if !merged.is_empty() {
            written.push(merged);
        }
        written.sort_by_key(|range| range.start);

        edit.apply(&mut self.lines);
        self.written = written;
        self
    }
}

fn shift(index: usize, delta: isize) -> usize {
    index.saturating_add_signed(delta)
}

/// Applies patch requests with a fixed configuration.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    locator: AnchorLocator,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let locator = AnchorLocator::new(config.decorator.clone());
        Self { config, locator }
    }

    /// Apply every chunk of `request` to `content`.
    pub fn process(&self, request: &PatchRequest, content: &str) -> ProcessResult {
        let mut buffer = Buffer::new(lines::split(content));
        let mut applied_changes = Vec::with_capacity(request.chunks.len());
        let mut warnings = Vec::new();

        for (index, chunk) in request.chunks.iter().enumerate() {
            match self.apply_chunk(index, chunk, buffer, &mut warnings) {
                Ok((next, change)) => {
                    debug!(
                        target_id = %request.target_id,
                        chunk = index,
                        start = change.start,
                        end = change.end,
                        delta = change.delta,
                        "applied chunk"
                    );
                    buffer = next;
                    applied_changes.push(change);
                }
                Err(error) => {
                    warn!(
                        target_id = %request.target_id,
                        chunk = index,
                        %error,
                        "patch request rejected"
                    );
                    return ProcessResult {
                        original_content: content.to_string(),
                        modified_content: content.to_string(),
                        success: false,
                        applied_changes: Vec::new(),
                        errors: vec![error.to_string()],
                        warnings,
                    };
                }
            }
        }

        let modified_content = if request.chunks.is_empty() {
            content.to_string()
        } else {
            let mut joined = lines::join(&buffer.lines);
            if self.config.preserve_trailing_newline
                && !buffer.lines.is_empty()
                && lines::ends_with_terminator(content)
            {
                joined.push('\n');
            }
            joined
        };

        ProcessResult {
            original_content: content.to_string(),
            modified_content,
            success: true,
            applied_changes,
            errors: Vec::new(),
            warnings,
        }
    }

    /// Locate, match and splice one chunk.
    fn apply_chunk(
        &self,
        index: usize,
        chunk: &Chunk,
        buffer: Buffer,
        warnings: &mut Vec<String>,
    ) -> Result<(Buffer, AppliedChange), ChunkError> {
        let anchor = chunk.anchor.as_str();
        let lines = &buffer.lines;

        let anchor_idx = self
            .locator
            .locate(anchor, lines, 0)
            .ok_or_else(|| ChunkError::ContextNotFound {
                anchor: anchor.to_string(),
                suggestion: self.suggest(anchor, lines),
            })?;

        if self.locator.needle(anchor).is_empty() {
            warnings.push(format!(
                "chunk {}: anchor {:?} is empty; searching from line {}",
                index + 1,
                anchor,
                anchor_idx + 1
            ));
        } else if self.config.warn_ambiguous_anchor {
            let count = self.locator.count_matches(anchor, lines, 0);
            if count > 1 {
                warnings.push(format!(
                    "chunk {}: anchor {:?} matches {} lines; using the first at line {}",
                    index + 1,
                    anchor,
                    count,
                    anchor_idx + 1
                ));
            }
        }

        let edit = build_edit(chunk, lines, anchor_idx).map_err(|source| {
            ChunkError::WindowMismatch {
                anchor: anchor.to_string(),
                source,
            }
        })?;

        if edit.is_insertion() {
            if buffer.inside_written(edit.start) {
                return Err(ChunkError::AmbiguousEmptyMatch {
                    anchor: anchor.to_string(),
                    line: edit.start,
                });
            }
            if chunk.change_lines.is_empty() {
                warnings.push(format!("chunk {}: no change lines", index + 1));
            } else {
                warnings.push(format!(
                    "chunk {}: no context or removed lines; inserting before line {}",
                    index + 1,
                    edit.start + 1
                ));
            }
        }

        let change = AppliedChange {
            anchor: anchor.to_string(),
            start: edit.start,
            end: edit.end,
            delta: edit.delta(),
        };
        Ok((buffer.apply(edit), change))
    }

    fn suggest(&self, anchor: &str, lines: &[String]) -> Option<Suggestion> {
        if !self.config.suggest_closest_line {
            return None;
        }
        self.locator
            .closest_line(anchor, lines, self.config.suggestion_threshold)
            .map(|(line, similarity)| Suggestion {
                line,
                text: lines[line].trim().to_string(),
                similarity,
            })
    }
}

/// Apply `request` to `content` under `config`.
pub fn process(request: &PatchRequest, config: &EngineConfig, content: &str) -> ProcessResult {
    Engine::new(config.clone()).process(request, content)
}
