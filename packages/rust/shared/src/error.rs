//! Error types for doccrawl.
//!
//! Library crates use [`DocCrawlError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all doccrawl operations.
#[derive(Debug, thiserror::Error)]
pub enum DocCrawlError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The server answered 404: the locator is wrong or the resource is private.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// The server is throttling us (429, or GitHub's 403 "rate limit exceeded").
    #[error("rate limited: {url}")]
    RateLimited {
        url: String,
        /// Seconds advertised by a `Retry-After` header, if any.
        retry_after: Option<u64>,
    },

    /// Transient transport failure: timeout, connection reset, unreadable body.
    #[error("network error: {0}")]
    Network(String),

    /// Any other non-success HTTP status.
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    /// Response body could not be interpreted (bad JSON/XML, wrong content type).
    #[error("malformed response: {message}")]
    Malformed { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocCrawlError>;

impl DocCrawlError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a malformed-response error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed {
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

    /// Whether another attempt at the same request could plausibly succeed.
    ///
    /// 404s are final for every source; so are bodies we could not interpret.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Network(_) | Self::Http { .. }
        )
    }
}
