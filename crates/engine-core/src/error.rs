//! Error types for MNA assembly and linear solves.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A device was stamped with a node count that does not match what it
    /// registered during `Setup`.
    #[error("node mismatch: device expects {expected} terminals, got {actual}")]
    NodeMismatch { expected: usize, actual: usize },

    /// LU factorization failed because the matrix is numerically singular.
    #[error("matrix is singular")]
    SingularMatrix,

    /// Matrix/vector dimensions disagree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
