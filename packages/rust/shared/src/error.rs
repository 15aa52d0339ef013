//! Error types for medsource.
//!
//! Library crates use [`MedSourceError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all medsource operations.
#[derive(Debug, thiserror::Error)]
pub enum MedSourceError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching a page or calling the LLM endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// Structured store connectivity or query execution error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The structured table lacks columns the pipeline cannot work without.
    #[error("schema error: missing required columns {missing:?}; the table must contain at least 'medication' and 'side_effect'")]
    Schema { missing: Vec<String> },

    /// A generated query failed the read-only safety contract.
    #[error("unsafe generated query: {0}")]
    InvalidQuery(String),

    /// Language-model call failed (transport, status, or empty response).
    #[error("LLM error: {0}")]
    Llm(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad identifier, malformed input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MedSourceError>;

impl MedSourceError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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
}
