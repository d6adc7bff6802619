use crate::anchor::DEFAULT_DECORATOR;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 0.6;

/// Tunables for the patch engine.
///
/// The defaults reproduce the wire format's reference behaviour exactly; every
/// field only relaxes or enriches diagnostics, never the matching rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Prefix stripped from anchors before searching. Empty disables stripping.
    pub decorator: String,
    /// Warn when an anchor matches more than one line.
    pub warn_ambiguous_anchor: bool,
    /// Append the most similar line to "context not found" errors.
    pub suggest_closest_line: bool,
    /// Minimum normalized Levenshtein similarity for a suggestion.
    pub suggestion_threshold: f64,
    /// Re-append `\n` to successful output when the input ended with a terminator.
    pub preserve_trailing_newline: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            decorator: DEFAULT_DECORATOR.to_string(),
            warn_ambiguous_anchor: true,
            suggest_closest_line: true,
            suggestion_threshold: DEFAULT_SUGGESTION_THRESHOLD,
            preserve_trailing_newline: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if !self.decorator.is_empty() && self.decorator.trim().is_empty() {
            issues.push(ValidationIssue::InvalidValue {
                field: "decorator",
                message: "must not consist only of whitespace".to_string(),
            });
        }

        if self.decorator.contains(['\n', '\r']) {
            issues.push(ValidationIssue::InvalidValue {
                field: "decorator",
                message: "must not contain line terminators".to_string(),
            });
        }

        if !(self.suggestion_threshold > 0.0 && self.suggestion_threshold <= 1.0) {
            issues.push(ValidationIssue::InvalidValue {
                field: "suggestion_threshold",
                message: format!("must be in (0, 1], got {}", self.suggestion_threshold),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid engine config field '{field}': {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.decorator, "@@ ");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_decorator_is_valid() {
        let config = EngineConfig {
            decorator: String::new(),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_collects_all_issues() {
        let config = EngineConfig {
            decorator: "  ".to_string(),
            suggestion_threshold: 1.5,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.issues.len(), 2);
        let message = err.to_string();
        assert!(message.contains("decorator"));
        assert!(message.contains("suggestion_threshold"));
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let config = EngineConfig {
            suggestion_threshold: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
