//! Window matching and edit construction.
//!
//! A chunk's change lines are projected twice. The comparison projection
//! (Context and Remove lines, trimmed) is aligned against the buffer to find the
//! window. The emission projection walks the same change lines to build the
//! replacement, taking Context lines from the buffer and Add lines from the chunk.

use crate::request::{ChangeLine, Chunk, Operation};
use thiserror::Error;

/// Replacement of lines `[start, end)` with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: Vec<String>,
}

impl Edit {
    /// Signed change in line count once applied.
    pub fn delta(&self) -> isize {
        self.replacement.len() as isize - (self.end - self.start) as isize
    }

    /// A zero-width edit that only inserts lines.
    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }

    /// Splice the replacement into `lines`.
    pub fn apply(self, lines: &mut Vec<String>) {
        lines.splice(self.start..self.end, self.replacement);
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("no lines matching {needle:?} at or after line {}", .search_from + 1)]
    ContextNotFound { needle: String, search_from: usize },
}

/// Find the first window at or after `search_from` matching the chunk's
/// before-lines and build the edit replacing it.
///
/// Lines compare equal when they are equal after trimming leading and trailing
/// whitespace; internal whitespace must match exactly. When several windows
/// match, the lowest index wins.
pub fn build_edit(
    chunk: &Chunk,
    lines: &[String],
    search_from: usize,
) -> Result<Edit, MatchError> {
    let expected_before: Vec<&str> = chunk
        .expected_before()
        .into_iter()
        .map(str::trim)
        .collect();

    let start = if expected_before.is_empty() {
        search_from.min(lines.len())
    } else {
        find_window(&expected_before, lines, search_from).ok_or_else(|| {
            MatchError::ContextNotFound {
                needle: expected_before[0].to_string(),
                search_from,
            }
        })?
    };
    let end = start + expected_before.len();

    Ok(Edit {
        start,
        end,
        replacement: emit_replacement(&chunk.change_lines, &lines[start..end]),
    })
}

/// First index `i >= search_from` where `lines[i..i + expected.len()]` matches
/// `expected` under trimmed comparison. `expected` must already be trimmed.
fn find_window(expected: &[&str], lines: &[String], search_from: usize) -> Option<usize> {
    if expected.len() > lines.len() {
        return None;
    }
    let last_start = lines.len() - expected.len();
    (search_from..=last_start).find(|&i| {
        lines[i..i + expected.len()]
            .iter()
            .zip(expected)
            .all(|(line, want)| line.trim() == *want)
    })
}

/// Build the replacement for a matched window.
///
/// `window` holds the buffer lines aligned with the chunk's Context and Remove
/// lines, in order.
fn emit_replacement(change_lines: &[ChangeLine], window: &[String]) -> Vec<String> {
    let mut original = window.iter();
    let mut replacement = Vec::with_capacity(change_lines.len());

    for change in change_lines {
        match change.operation {
            Operation::Context => {
                if let Some(line) = original.next() {
                    replacement.push(line.clone());
                }
            }
            Operation::Remove => {
                original.next();
            }
            Operation::Add => replacement.push(change.text.clone()),
        }
    }

    replacement
}
