//! Error types for glob resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Message used when the pattern input fails validation.
pub const INVALID_PATTERNS_MESSAGE: &str =
    "Patterns must be a string (non empty) or an array of strings";

/// Errors that can occur while resolving patterns.
#[derive(Debug, Error)]
pub enum GlobError {
    /// Pattern input is empty or contains an empty pattern.
    #[error("Patterns must be a string (non empty) or an array of strings")]
    InvalidPatterns,

    /// A pattern could not be compiled into a matcher.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A group or extglob pattern could not be compiled.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidExtglob { pattern: String, message: String },

    /// Invalid settings.
    #[error("Invalid settings: {message}")]
    InvalidSettings { message: String },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Symbolic link cycle detected while following links.
    #[error("Symbolic link loop detected at {path}")]
    Loop { path: PathBuf },

    /// A worker task failed to complete.
    #[error("Worker failed: {message}")]
    Join { message: String },
}

/// Coarse classification used by error filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any traversal happened.
    Validation,
    /// The target vanished or never existed.
    NotFound,
    /// Any other traversal failure.
    Traversal,
    /// Internal failure of the execution machinery.
    Internal,
}

impl GlobError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPatterns
            | Self::InvalidPattern { .. }
            | Self::InvalidExtglob { .. }
            | Self::InvalidSettings { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PermissionDenied { .. } | Self::Io { .. } | Self::Loop { .. } => {
                ErrorKind::Traversal
            }
            Self::Join { .. } => ErrorKind::Internal,
        }
    }

    /// Whether this error means the path does not exist (ENOENT).
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Path the error refers to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::PermissionDenied { path }
            | Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::Loop { path } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_error_io() {
        let err = GlobError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, GlobError::PermissionDenied { .. }));
        assert_eq!(err.kind(), ErrorKind::Traversal);
    }

    #[test]
    fn test_not_found_classification() {
        let enoent = GlobError::io(
            "/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(enoent.is_not_found());
        assert_eq!(enoent.path(), Some(std::path::Path::new("/missing")));

        let other = GlobError::io("/x", std::io::Error::other("boom"));
        assert!(!other.is_not_found());
        assert!(matches!(other, GlobError::Io { .. }));
    }

    #[test]
    fn test_validation_message() {
        assert_eq!(GlobError::InvalidPatterns.to_string(), INVALID_PATTERNS_MESSAGE);
        assert_eq!(GlobError::InvalidPatterns.kind(), ErrorKind::Validation);

        let extglob = GlobError::InvalidExtglob {
            pattern: "@(a|!(b))".to_string(),
            message: "nested negation".to_string(),
        };
        assert_eq!(extglob.kind(), ErrorKind::Validation);
        assert!(extglob.path().is_none());
    }
}
