//! Error types for proxim.

use thiserror::Error;

/// Errors that can occur during hashing, indexing, or search operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LshError {
    /// Invalid construction parameter.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Dataset moments rejected at hasher generation.
    #[error("bad moments: {0}")]
    BadMoments(String),

    /// Dimension mismatch between a vector and the index.
    #[error("dimension mismatch: expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A bucketed id has no stored vector.
    #[error("vector not found for id {0:?}")]
    VectorNotFound(String),

    /// Store backend failure.
    #[error("store error: {0}")]
    Store(String),

    /// Hasher blob could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for proxim operations.
pub type Result<T> = std::result::Result<T, LshError>;
