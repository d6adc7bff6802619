//! Line normalization.
//!
//! Content is handled as a sequence of logical lines with terminators removed.
//! `\r\n`, `\n` and a lone `\r` are all accepted as terminators, in any mix.
//! Output is always reassembled with `\n`.

/// Split `text` into logical lines.
///
/// - `\r\n` is a single terminator, never two.
/// - A trailing terminator does not produce a trailing empty line.
/// - Interior empty lines are preserved.
/// - Empty input yields an empty list.
pub fn split(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            '\n' => lines.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Join lines with `\n`.
pub fn join(lines: &[String]) -> String {
    lines.join("\n")
}

/// True if `text` ends with any recognised line terminator.
pub fn ends_with_terminator(text: &str) -> bool {
    text.ends_with('\n') || text.ends_with('\r')
}
