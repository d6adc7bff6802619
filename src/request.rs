//! Patch requests: the in-memory model and the raw wire shape it is built from.
//!
//! A raw request carries each change as a string whose first character is the
//! operation prefix (`' '`, `'-'` or `'+'`). Conversion into a [`PatchRequest`]
//! validates every prefix up front so the engine never has to guess.

use crate::lines;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// What a change line does to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Present unchanged before and after the edit.
    Context,
    /// Present only before the edit.
    Remove,
    /// Present only after the edit.
    Add,
}

impl Operation {
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            ' ' => Some(Operation::Context),
            '-' => Some(Operation::Remove),
            '+' => Some(Operation::Add),
            _ => None,
        }
    }

    pub fn prefix(self) -> char {
        match self {
            Operation::Context => ' ',
            Operation::Remove => '-',
            Operation::Add => '+',
        }
    }

    /// Whether the line must already exist in the target.
    pub fn is_before(self) -> bool {
        matches!(self, Operation::Context | Operation::Remove)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLine {
    pub operation: Operation,
    pub text: String,
}

impl ChangeLine {
    pub fn new(operation: Operation, text: impl Into<String>) -> Self {
        Self {
            operation,
            text: text.into(),
        }
    }

    pub fn context(text: impl Into<String>) -> Self {
        Self::new(Operation::Context, text)
    }

    pub fn remove(text: impl Into<String>) -> Self {
        Self::new(Operation::Remove, text)
    }

    pub fn add(text: impl Into<String>) -> Self {
        Self::new(Operation::Add, text)
    }

    /// Parse one raw change entry.
    ///
    /// The first character selects the operation and is stripped; the rest is
    /// kept verbatim. An entry carrying embedded line terminators expands into
    /// several lines sharing the same operation. Returns `None` when the prefix
    /// is missing or unknown.
    pub fn parse(raw: &str) -> Option<Vec<ChangeLine>> {
        let mut chars = raw.chars();
        let operation = Operation::from_prefix(chars.next()?)?;
        let rest = chars.as_str();

        let texts = lines::split(rest);
        if texts.is_empty() {
            return Some(vec![ChangeLine::new(operation, "")]);
        }
        Some(
            texts
                .into_iter()
                .map(|text| ChangeLine::new(operation, text))
                .collect(),
        )
    }
}

impl fmt::Display for ChangeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operation.prefix(), self.text)
    }
}

/// One localized edit: an anchor plus the ordered change lines around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub anchor: String,
    pub change_lines: Vec<ChangeLine>,
}

impl Chunk {
    pub fn new(anchor: impl Into<String>, change_lines: Vec<ChangeLine>) -> Self {
        Self {
            anchor: anchor.into(),
            change_lines,
        }
    }

    /// Build a chunk from raw prefixed change strings.
    pub fn from_raw(
        index: usize,
        anchor: impl Into<String>,
        changes: &[String],
    ) -> Result<Self, RequestError> {
        let mut change_lines = Vec::with_capacity(changes.len());
        for (line, raw) in changes.iter().enumerate() {
            let parsed =
                ChangeLine::parse(raw).ok_or_else(|| RequestError::MalformedChangeLine {
                    chunk: index,
                    line,
                    text: raw.clone(),
                })?;
            change_lines.extend(parsed);
        }
        Ok(Self::new(anchor, change_lines))
    }

    /// Text of the Context and Remove lines, in order.
    pub fn expected_before(&self) -> Vec<&str> {
        self.change_lines
            .iter()
            .filter(|line| line.operation.is_before())
            .map(|line| line.text.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub target_id: String,
    pub chunks: Vec<Chunk>,
}

impl PatchRequest {
    pub fn new(target_id: impl Into<String>, chunks: Vec<Chunk>) -> Self {
        Self {
            target_id: target_id.into(),
            chunks,
        }
    }
}

/// One chunk as it arrives on the wire. Both keys are required; unknown keys
/// are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawChunk {
    pub context_marker: String,
    pub changes: Vec<String>,
}

/// A request as it arrives from the editing tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPatchRequest {
    pub path: String,
    #[serde(default)]
    pub chunks: Vec<RawChunk>,
}

impl TryFrom<RawPatchRequest> for PatchRequest {
    type Error = RequestError;

    fn try_from(raw: RawPatchRequest) -> Result<Self, Self::Error> {
        let chunks = raw
            .chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| Chunk::from_raw(index, chunk.context_marker, &chunk.changes))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PatchRequest::new(raw.path, chunks))
    }
}

/// `{ requests = [...] }` form of a request document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestBatch {
    requests: Vec<RawPatchRequest>,
}

/// Top-level layout of a request document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentShape {
    /// A bare list of requests (JSON only).
    List,
    /// A table with a `requests` key.
    Batch,
    /// A single request.
    Single,
}

impl DocumentShape {
    fn of_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(_) => DocumentShape::List,
            serde_json::Value::Object(map) if map.contains_key("requests") => DocumentShape::Batch,
            _ => DocumentShape::Single,
        }
    }

    fn of_toml(input: &str) -> Self {
        // Syntax errors are reported by the typed pass below
        match input.parse::<toml_edit::DocumentMut>() {
            Ok(doc) if doc.contains_key("requests") => DocumentShape::Batch,
            _ => DocumentShape::Single,
        }
    }
}

/// Wire encoding of a request document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFormat {
    Json,
    Toml,
}

impl RequestFormat {
    /// Pick the format from a file extension (`.toml` or anything else as JSON).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => RequestFormat::Toml,
            _ => RequestFormat::Json,
        }
    }
}

/// Decode a request document and convert every request in it.
///
/// The document's shape is settled first, then the matching concrete type is
/// deserialized, so field-level errors name the offending key.
pub fn parse_requests(
    input: &str,
    format: RequestFormat,
) -> Result<Vec<PatchRequest>, RequestError> {
    let raw = match format {
        RequestFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(input)?;
            match DocumentShape::of_json(&value) {
                DocumentShape::List => serde_json::from_str::<Vec<RawPatchRequest>>(input)?,
                DocumentShape::Batch => serde_json::from_str::<RequestBatch>(input)?.requests,
                DocumentShape::Single => vec![serde_json::from_str::<RawPatchRequest>(input)?],
            }
        }
        RequestFormat::Toml => match DocumentShape::of_toml(input) {
            DocumentShape::Batch => toml_edit::de::from_str::<RequestBatch>(input)?.requests,
            _ => vec![toml_edit::de::from_str::<RawPatchRequest>(input)?],
        },
    };

    raw.into_iter().map(PatchRequest::try_from).collect()
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("chunk {chunk}, change {line}: expected ' ', '-' or '+' prefix, found {text:?}")]
    MalformedChangeLine {
        chunk: usize,
        line: usize,
        text: String,
    },

    #[error("invalid JSON request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML request: {0}")]
    Toml(#[from] toml_edit::de::Error),
}
