//! Error types for Folio.
//!
//! Library crates use [`FolioError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Folio operations.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    /// Configuration loading error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No file exists under the requested key.
    #[error("file not found: {key}")]
    NotFound { key: String },

    /// The key cannot address a file in the collection (e.g. `..` segments).
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// A sourcer could not produce a file collection.
    #[error("source error: {0}")]
    Source(String),

    /// A renderer could not transform a file.
    #[error("render error: {0}")]
    Render(String),

    /// A collection reported neither a file nor an error.
    #[error("file collection from sourcer {sourcer:?} returned an empty result")]
    EmptyResult { sourcer: String },

    /// Eager sourcing failed while constructing the server.
    #[error("failed to source files on initialization with sourcer {sourcer:?}: {source}")]
    Initialization {
        sourcer: String,
        source: Box<FolioError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;

impl FolioError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a not-found error for a lookup key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an invalid-key error with the reason it was rejected.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FolioError::config("unknown log target");
        assert_eq!(err.to_string(), "config error: unknown log target");

        let err = FolioError::not_found("posts/hello.md");
        assert_eq!(err.to_string(), "file not found: posts/hello.md");
    }

    #[test]
    fn initialization_error_names_sourcer_and_cause() {
        let err = FolioError::Initialization {
            sourcer: "dir".into(),
            source: Box::new(FolioError::Source("root missing".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"dir\""));
        assert!(msg.contains("root missing"));
    }
}
