//! Error types for sitedocs.
//!
//! Library crates use [`SiteDocsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all sitedocs operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteDocsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a sitemap or a page.
    #[error("network error: {message}")]
    Network {
        message: String,
        /// Whether a retry could plausibly succeed (timeouts, 5xx, 429).
        transient: bool,
    },

    /// Sitemap XML is malformed or not a sitemap.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// HTML-to-PDF rendering failed for one document.
    #[error("render error: {0}")]
    Render(String),

    /// A glob pattern (or literal path in single mode) matched no files.
    #[error("no files found matching pattern: {pattern}{}", reason_suffix(.reason))]
    NoMatch {
        pattern: String,
        reason: Option<String>,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid input value (URL, argument, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default()
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteDocsError>;

impl SiteDocsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Network failure that is not worth retrying (4xx, bad body, ...).
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network {
            message: msg.into(),
            transient: false,
        }
    }

    /// Network failure a retry may recover from.
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Network {
            message: msg.into(),
            transient: true,
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

    /// A pattern that expanded to nothing.
    pub fn no_match(pattern: impl Into<String>) -> Self {
        Self::NoMatch {
            pattern: pattern.into(),
            reason: None,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the retry policy should try this operation again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network { transient: true, .. })
    }
}
