//! Error types for the Sparse Merkle Sum Tree implementation

use thiserror::Error;

/// Raised when adding two sums would exceed [`u64::MAX`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Error)]
#[error("sum overflow")]
pub struct SumOverflow;

/// Error type for the pure digest and proof functions.
///
/// These functions never touch a database so they don't carry a database error.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Error)]
pub enum ProofError {
    /// The proof is structurally malformed or contradicts itself
    #[error("bad proof")]
    BadProof,
    /// The proof nodes sum up to more than [`u64::MAX`]
    #[error("sum overflow")]
    SumOverflow,
}

impl From<SumOverflow> for ProofError {
    fn from(_: SumOverflow) -> Self {
        Self::SumOverflow
    }
}

/// Error type for tree operations
#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum TreeError<DbError> {
    /// A node referenced by the tree is missing from the database
    #[error("node {0} not found in database")]
    NodeNotFound(String),
    /// A node record read from the database is malformed
    #[error("corrupted node record: {0}")]
    CorruptedNode(String),
    /// The key (or path) has the wrong length for this tree
    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    /// The root handed to an import is not a `hash ‖ sum` encoding
    #[error("invalid root: expected {expected} bytes, got {got}")]
    InvalidRoot { expected: usize, got: usize },
    /// Sum overflow
    #[error("sum overflow")]
    SumOverflow,
    /// Invalid merkle proof
    #[error("bad proof")]
    BadProof,
    /// Database error
    #[error("database error: {0}")]
    DbError(DbError),
}

impl<DbError> From<SumOverflow> for TreeError<DbError> {
    fn from(_: SumOverflow) -> Self {
        Self::SumOverflow
    }
}

impl<DbError> From<ProofError> for TreeError<DbError> {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::BadProof => Self::BadProof,
            ProofError::SumOverflow => Self::SumOverflow,
        }
    }
}
