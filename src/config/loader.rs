//! Reading engine configs from TOML and locating the one to use.

use crate::config::schema::{EngineConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in a directory when none is given explicitly.
pub const CONFIG_FILE_NAME: &str = ".anchor-patch.toml";

#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Not TOML, or a key that `EngineConfig` does not know.
    Parse {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    /// Well-formed, but a value is out of range.
    Invalid {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    /// Attach the file a string-level error came from.
    fn with_path(self, path: &Path) -> Self {
        match self {
            ConfigError::Parse { path: None, source } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                source,
            },
            ConfigError::Invalid { path: None, source } => ConfigError::Invalid {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        }
    }

    /// The file the error refers to, if known.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } => Some(path),
            ConfigError::Parse { path, .. } | ConfigError::Invalid { path, .. } => {
                path.as_deref()
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            ConfigError::Read { .. } => "cannot read engine config",
            ConfigError::Parse { .. } => "engine config is not valid TOML",
            ConfigError::Invalid { .. } => "engine config rejected",
        };
        match self.path() {
            Some(path) => write!(f, "{what} {}", path.display())?,
            None => f.write_str(what)?,
        }
        match self {
            ConfigError::Read { source, .. } => write!(f, ": {source}"),
            ConfigError::Parse { source, .. } => write!(f, ": {}", source.to_string().trim_end()),
            ConfigError::Invalid { source, .. } => write!(f, ": {source}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid { source, .. } => Some(source),
        }
    }
}

/// Where an effective config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named by the caller.
    Explicit(PathBuf),
    /// Found as [`CONFIG_FILE_NAME`] in the searched directory.
    Discovered(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::Discovered(path) => Some(path),
            ConfigSource::Defaults => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(path) => write!(f, "{}", path.display()),
            ConfigSource::Discovered(path) => write!(f, "{} (discovered)", path.display()),
            ConfigSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Parse { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Invalid { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// The config file in `dir`, if there is one.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

/// Pick and load the effective config.
///
/// An explicit path wins and must load. Otherwise [`CONFIG_FILE_NAME`] in
/// `dir` is used when present, and the defaults when it is not. A discovered
/// file that fails to load is an error, never a silent fallback.
pub fn resolve(
    explicit: Option<&Path>,
    dir: &Path,
) -> Result<(EngineConfig, ConfigSource), ConfigError> {
    if let Some(path) = explicit {
        let config = load_from_path(path)?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    match discover(dir) {
        Some(path) => {
            let config = load_from_path(&path)?;
            Ok((config, ConfigSource::Discovered(path)))
        }
        None => Ok((EngineConfig::default(), ConfigSource::Defaults)),
    }
}

/// Render a config back to TOML.
pub fn to_toml_string(config: &EngineConfig) -> Result<String, toml_edit::ser::Error> {
    toml_edit::ser::to_string(config)
}
