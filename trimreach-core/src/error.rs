//! Typed error handling for trimreach.
//!
//! Only run-level failures are errors. Unresolvable methods, unresolvable
//! annotation targets and propagation conflicts are logged and skipped by
//! the code that meets them.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for trimreach operations.
#[derive(Error, Debug)]
pub enum TrimreachError {
    /// I/O error when reading inputs or writing reports
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Malformed annotation configuration (fatal for that file)
    #[error("Config error at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// The program graph handed over by the graph builder could not be decoded
    #[error("Input error at {path}: {message}")]
    Input { path: PathBuf, message: String },

    /// Invalid argument provided
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A report sink failed while streaming chains
    #[error("Output error: {message}")]
    Output { message: String },

    /// The run was stopped through its cancellation token
    #[error("Analysis cancelled")]
    Cancelled,

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TrimreachError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an input error.
    pub fn input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an output error.
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Config { path, .. } => Some(path),
            Self::Input { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TrimreachError {
    fn from(err: std::io::Error) -> Self {
        Self::Output {
            message: err.to_string(),
        }
    }
}

/// Convenience type alias for trimreach results.
pub type TrimreachResult<T> = Result<T, TrimreachError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> TrimreachResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> TrimreachResult<T> {
        self.map_err(|e| TrimreachError::io(path, e))
    }
}
