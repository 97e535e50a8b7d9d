//! Error types for teamwatch operations.
//!
//! This module defines [`TeamwatchError`], the error enum shared by the file
//! reader, configuration loader, and directory watcher. The derived-state
//! computations in `teamwatch-insights` never fail on well-formed input and
//! do not use it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`TeamwatchError`].
pub type Result<T> = std::result::Result<T, TeamwatchError>;

/// Error type for all teamwatch I/O and configuration operations.
///
/// Malformed individual team files are not errors at this level: the reader
/// skips them with a warning so one bad task file cannot hide a whole team.
#[derive(Debug, Error)]
pub enum TeamwatchError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file not found
    #[error("Configuration not found at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration file is invalid YAML
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Environment override could not be parsed
    #[error("Invalid value for {variable}: {value}")]
    ConfigEnv { variable: String, value: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error with context
    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory creation failed
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Parsing Errors
    // =========================================================================
    /// A team file (config, task, inbox) could not be decoded
    #[error("Invalid team file {path}: {message}")]
    TeamFileParse { path: PathBuf, message: String },

    // =========================================================================
    // Team Errors
    // =========================================================================
    /// Team has no readable config.json
    #[error("Team not found: {team}")]
    TeamNotFound { team: String },

    /// Team or agent identifier contains characters that are not allowed
    #[error("Invalid {field}: {value:?}; allowed characters are letters, numbers, '_' and '-'")]
    InvalidIdentifier { field: String, value: String },

    // =========================================================================
    // File Watching Errors
    // =========================================================================
    /// File watcher initialization failed
    #[error("Failed to initialize file watcher: {message}")]
    WatcherInit { message: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (bug in teamwatch)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TeamwatchError {
    /// Create a ConfigNotFound error with source
    pub fn config_not_found_with_source(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source: Some(source),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create an InvalidIdentifier error
    pub fn invalid_identifier(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for read failures that may clear up on the next poll, such as
    /// a file caught mid-write.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::TeamFileParse { .. })
    }

    /// Returns actionable guidance for the user
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound { .. } => {
                Some("Create the file or omit --config to use ~/.teamwatch/config.yaml")
            }
            Self::ConfigInvalid { .. } => Some("Check YAML syntax in the configuration file"),
            Self::ConfigEnv { .. } => Some("Numeric overrides must be positive integers"),
            Self::ConfigValidation { .. } => Some("Thresholds and intervals must be greater than 0"),
            Self::TeamNotFound { .. } => {
                Some("Run 'teamwatch teams' to list teams with a readable config.json")
            }
            Self::InvalidIdentifier { .. } => {
                Some("Use the team directory name exactly as it appears under teams/")
            }
            Self::WatcherInit { .. } => Some("Check that the teams and tasks directories are readable"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_error() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = TeamwatchError::config_not_found_with_source("/home/user/.teamwatch/config.yaml", source);
        assert!(err.to_string().contains("Configuration not found"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.guidance().is_some());
    }

    #[test]
    fn test_invalid_identifier_error() {
        let err = TeamwatchError::invalid_identifier("team name", "../etc");
        assert!(err.to_string().contains("team name"));
        assert!(err.to_string().contains("../etc"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_classification() {
        let io = std::io::Error::new(std::io::ErrorKind::Interrupted, "busy");
        assert!(TeamwatchError::io("reading team file", "/tmp/x.json", io).is_recoverable());
        assert!(TeamwatchError::TeamFileParse {
            path: "/tmp/x.json".into(),
            message: "EOF while parsing".into(),
        }
        .is_recoverable());
        assert!(!TeamwatchError::internal("bug").is_recoverable());
        assert!(!TeamwatchError::ConfigEnv {
            variable: "STALL_THRESHOLD_MINUTES".into(),
            value: "ten".into(),
        }
        .is_recoverable());
    }

    #[test]
    fn test_error_guidance() {
        let err = TeamwatchError::TeamNotFound {
            team: "alpha".into(),
        };
        assert_eq!(
            err.guidance(),
            Some("Run 'teamwatch teams' to list teams with a readable config.json")
        );
        assert_eq!(TeamwatchError::internal("x").guidance(), None);
    }
}
