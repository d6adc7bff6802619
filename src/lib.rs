//! Anchor Patch: context-anchored patch application for agent-authored edits
//!
//! A patch request is a list of chunks. Each chunk names an anchor (a short
//! snippet such as `@@ class UserService`) and an ordered list of context,
//! removed and added lines. The engine finds the anchor, aligns the chunk's
//! context and removed lines against the file with whitespace-insensitive
//! comparison, and splices in the replacement.
//!
//! # Architecture
//!
//! - [`lines`] splits content into logical lines, whatever the line endings.
//! - [`anchor`] locates the line a chunk's search starts from.
//! - [`matcher`] finds the matching window and builds an [`Edit`].
//! - [`engine`] folds the chunks of one request over a working buffer.
//!
//! The engine is pure: it never touches the filesystem. [`writeback`] and
//! [`safety`] provide the read/verify/write layer used by the CLI.
//!
//! # Guarantees
//!
//! - A request applies completely or not at all
//! - Context lines keep the file's own whitespace; added lines keep the chunk's
//! - Ties between candidate windows go to the earliest one
//! - Failures are reported in [`ProcessResult::errors`], never by panicking
//!
//! # Example
//!
//! ```
//! use anchor_patch::{process, ChangeLine, Chunk, EngineConfig, PatchRequest};
//!
//! let request = PatchRequest::new(
//!     "greeting.txt",
//!     vec![Chunk::new(
//!         "@@ fn greet",
//!         vec![
//!             ChangeLine::context("fn greet() {"),
//!             ChangeLine::remove("    hi();"),
//!             ChangeLine::add("    hello();"),
//!         ],
//!     )],
//! );
//!
//! let result = process(&request, &EngineConfig::default(), "fn greet() {\n    hi();\n}\n");
//! assert!(result.success);
//! assert_eq!(result.modified_content, "fn greet() {\n    hello();\n}");
//! ```

pub mod anchor;
pub mod config;
pub mod engine;
pub mod lines;
pub mod matcher;
pub mod request;
pub mod safety;
pub mod writeback;

// Re-exports
pub use anchor::{locate, AnchorLocator, DEFAULT_DECORATOR};
pub use config::{
    load_from_path, load_from_str, ConfigError, ConfigSource, EngineConfig, ValidationError,
};
pub use engine::{process, AppliedChange, ChunkError, Engine, ProcessResult, Suggestion};
pub use matcher::{build_edit, Edit, MatchError};
pub use request::{
    parse_requests, ChangeLine, Chunk, Operation, PatchRequest, RawChunk, RawPatchRequest,
    RequestError, RequestFormat,
};
pub use safety::{SafetyError, WorkspaceGuard};
pub use writeback::{
    patch_file, ContentVerification, FilePatch, FilePatcher, WriteError, WriteMode,
};
