//! Error types for scrapling.
//!
//! This module defines the error types returned by parsing, selection, and
//! storage operations. Queries that simply find nothing never error; they
//! return empty collections or `None`.

/// Error type for parsing and selection operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTML byte stream could not be decoded.
    #[error("HTML decoding failed: {0}")]
    ParseError(String),

    /// Character encoding label was not recognized.
    #[error("Encoding detection failed: {0}")]
    EncodingError(String),

    /// A CSS or XPath expression could not be compiled.
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector {
        /// The offending selector source text.
        selector: String,
        /// What the compiler objected to.
        message: String,
    },

    /// A regular expression pattern could not be compiled.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The offending pattern source text.
        pattern: String,
        /// What the regex compiler objected to.
        message: String,
    },

    /// An operation received element handles from different documents.
    #[error("handles belong to different documents")]
    MixedDocument,

    /// Adaptive features were requested on a document parsed without
    /// `adaptive: true`.
    #[error("adaptive mode is disabled for this document")]
    AdaptiveDisabled,

    /// The fingerprint storage backend failed to read or write.
    #[error("storage operation failed: {0}")]
    StorageError(String),

    /// `json()` was called on content that is not valid JSON.
    #[error("JSON decoding failed: {0}")]
    JsonError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err.to_string())
    }
}

/// Result type alias for parsing and selection operations.
pub type Result<T> = std::result::Result<T, Error>;
