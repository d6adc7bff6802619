pub mod loader;
pub mod schema;

pub use loader::{
    discover, load_from_path, load_from_str, resolve, to_toml_string, ConfigError, ConfigSource,
    CONFIG_FILE_NAME,
};
pub use schema::{EngineConfig, ValidationError, ValidationIssue, DEFAULT_SUGGESTION_THRESHOLD};
