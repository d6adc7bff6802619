//! Scenario tests for the patch engine.
//!
//! Each submodule drives `process` end to end on realistic source files.

mod line_endings;
mod multi_chunk;
mod user_service;
