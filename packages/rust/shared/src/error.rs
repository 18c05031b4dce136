//! Error types for docgraph.
//!
//! Library crates use [`DocGraphError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docgraph operations.
#[derive(Debug, thiserror::Error)]
pub enum DocGraphError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a page or calling the model service.
    #[error("network error: {0}")]
    Network(String),

    /// A navigator interaction (goto, locate, click, wait) failed.
    #[error("navigation error: {message}")]
    Navigation { message: String },

    /// A timeout-bounded operation did not finish in time.
    #[error("timed out after {after_ms}ms: {operation}")]
    Timeout { operation: String, after_ms: u64 },

    /// HTML, selector, or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Model service error (transport, response shape, or empty extraction).
    #[error("model error: {0}")]
    Model(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (invalid record, schema mismatch, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocGraphError>;

impl DocGraphError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a navigation error from any displayable message.
    pub fn navigation(msg: impl Into<String>) -> Self {
        Self::Navigation {
            message: msg.into(),
        }
    }

    /// Create a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after_ms: after.as_millis() as u64,
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure is a recoverable interaction problem (skip and continue).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Navigation { .. } | Self::Timeout { .. } | Self::Model(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DocGraphError::config("missing start URL");
        assert_eq!(err.to_string(), "config error: missing start URL");

        let err = DocGraphError::timeout("wait_for #tree", std::time::Duration::from_secs(2));
        assert_eq!(err.to_string(), "timed out after 2000ms: wait_for #tree");
    }

    #[test]
    fn transient_classification() {
        assert!(DocGraphError::navigation("click failed").is_transient());
        assert!(DocGraphError::Model("empty extraction".into()).is_transient());
        assert!(!DocGraphError::validation("bad record").is_transient());
    }
}
