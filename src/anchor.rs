//! Anchor location.
//!
//! An anchor is a short, human-chosen snippet (a class or method name, usually
//! written as `@@ snippet`) that picks which region of the file a chunk targets.
//! The located line is only a lower bound for the window search; the change
//! lines themselves decide the exact edit boundary.

use strsim::normalized_levenshtein;

/// Decorator conventionally prepended to anchors.
pub const DEFAULT_DECORATOR: &str = "@@ ";

/// Finds anchor lines in a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorLocator {
    decorator: String,
}

impl Default for AnchorLocator {
    fn default() -> Self {
        Self::new(DEFAULT_DECORATOR)
    }
}

impl AnchorLocator {
    /// Create a locator stripping `decorator` from anchors. An empty decorator
    /// disables stripping.
    pub fn new(decorator: impl Into<String>) -> Self {
        Self {
            decorator: decorator.into(),
        }
    }

    /// The text searched for: the anchor without its decorator, trimmed.
    pub fn needle<'a>(&self, anchor: &'a str) -> &'a str {
        let stripped = if self.decorator.is_empty() {
            anchor
        } else {
            anchor.strip_prefix(self.decorator.as_str()).unwrap_or(anchor)
        };
        stripped.trim()
    }

    /// Index of the first line at or after `search_from` whose trimmed text
    /// contains the needle.
    ///
    /// An empty needle carries no location information and resolves to
    /// `search_from` itself, as long as that position is inside the buffer or
    /// at its end.
    pub fn locate(&self, anchor: &str, lines: &[String], search_from: usize) -> Option<usize> {
        let needle = self.needle(anchor);
        if needle.is_empty() {
            return (search_from <= lines.len()).then_some(search_from);
        }
        lines
            .iter()
            .enumerate()
            .skip(search_from)
            .find(|(_, line)| line.trim().contains(needle))
            .map(|(idx, _)| idx)
    }

    /// Number of lines at or after `search_from` containing the needle.
    pub fn count_matches(&self, anchor: &str, lines: &[String], search_from: usize) -> usize {
        let needle = self.needle(anchor);
        if needle.is_empty() {
            return 0;
        }
        lines
            .iter()
            .skip(search_from)
            .filter(|line| line.trim().contains(needle))
            .count()
    }

    /// The line most similar to the needle, with its similarity in `[0, 1]`.
    ///
    /// Only lines scoring at least `threshold` are considered. Ties go to the
    /// earliest line.
    pub fn closest_line(
        &self,
        anchor: &str,
        lines: &[String],
        threshold: f64,
    ) -> Option<(usize, f64)> {
        let needle = self.needle(anchor);
        if needle.is_empty() {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for (idx, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let score = normalized_levenshtein(needle, trimmed);
            if score < threshold {
                continue;
            }
            match best {
                Some((_, best_score)) if best_score >= score => {}
                _ => best = Some((idx, score)),
            }
        }
        best
    }
}

/// Locate `anchor` using the default `@@ ` decorator.
pub fn locate(anchor: &str, lines: &[String], search_from: usize) -> Option<usize> {
    AnchorLocator::default().locate(anchor, lines, search_from)
}
