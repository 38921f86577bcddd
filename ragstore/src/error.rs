//! Error types for the `ragstore` crate.

use thiserror::Error;

use crate::filter::ParseError;

/// Errors that can occur in vector store and search operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// A search request violated its invariants (`top_k >= 1`, threshold in `[0, 1]`).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Two vectors that must share a dimensionality did not.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality required by the store or query.
        expected: usize,
        /// The dimensionality that was supplied.
        actual: usize,
    },

    /// A filter expression could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The external embedding collaborator failed.
    #[error("Embedding unavailable ({provider}): {message}")]
    EmbeddingUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The search was cancelled or its deadline passed before it completed.
    #[error("Search cancelled")]
    Cancelled,

    /// A document could not be stored as given.
    #[error("Invalid document '{id}': {reason}")]
    InvalidDocument {
        /// The offending document ID.
        id: String,
        /// Why the document was rejected.
        reason: String,
    },

    /// An error occurred in a vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    Backend {
        /// The backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for vector store operations.
pub type Result<T> = std::result::Result<T, VectorError>;
