//! Error types for xxmanifest
//!
//! Per-file read failures never leave the digest engine; they are turned
//! into manifest error lines. Everything defined here that reaches the top
//! of a run is fatal: output failures, bad configuration, worker spawn errors.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for xxmanifest operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// I/O error while reading a source file
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Failure creating, writing or flushing the manifest file
    #[error("Cannot write manifest '{path}': {source}")]
    OutputIo {
        /// Manifest path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File or directory not found
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed manifest line
    #[error("Manifest parse error on line {line}: {message}")]
    ManifestParse {
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        message: String,
    },

    /// Worker pool error
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    /// Run cancelled before completion
    #[error("Operation cancelled")]
    Cancelled,
}

impl ManifestError {
    /// Create a source-side I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an output-side I/O error with path context
    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputIo {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a manifest parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::ManifestParse {
            line,
            message: message.into(),
        }
    }

    /// Whether this error must abort a run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }

    /// Check if this error is a permission issue
    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::Io { source, .. } | Self::OutputIo { source, .. } => {
                source.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::OutputIo { path, .. } | Self::NotFound(path) => {
                Some(path)
            }
            _ => None,
        }
    }

    /// Message used on manifest error lines: the bare OS error, without the path
    pub fn line_message(&self) -> String {
        match self {
            Self::Io { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for xxmanifest operations
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Attach a source path to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Attach the manifest path to an I/O error, marking it fatal
    fn with_output_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| ManifestError::io(path, e))
    }

    fn with_output_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| ManifestError::output(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(ErrorKind::NotFound, "file not found");
        let err = ManifestError::io("/test/path", io_err);
        assert_eq!(err.path().unwrap(), &PathBuf::from("/test/path"));
        assert!(!err.is_fatal());
        assert_eq!(err.line_message(), "file not found");
    }

    #[test]
    fn test_output_errors_are_fatal() {
        let io_err = std::io::Error::new(ErrorKind::PermissionDenied, "denied");
        let err: Result<()> = Err(io_err).with_output_path("/out/CRC.xxhash3");
        let err = err.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.is_permission_error());
        assert!(err.to_string().contains("/out/CRC.xxhash3"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ManifestError::config("threads must be at most 1024");
        assert_eq!(
            err.to_string(),
            "Configuration error: threads must be at most 1024"
        );
        assert!(err.path().is_none());
    }
}
