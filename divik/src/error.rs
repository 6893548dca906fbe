//! Error types for divisive clustering.
//!
//! Termination of a branch (node too small, degenerate fit, rejected split)
//! is not an error: the engine reports it as `Ok(None)`. Everything here
//! unwinds the whole recursion.

use kmeans::KmeansError;
use thiserror::Error;

/// Result type alias for divisive clustering operations.
pub type Result<T> = std::result::Result<T, DivikError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DivikError {
    /// Invalid parameters or inputs, detected before any fitting starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Eigensolver or SVD did not converge, or produced non-finite values.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// The caller requested cancellation through the reporter.
    #[error("clustering cancelled")]
    Cancelled,

    /// Failure inside the base k-means numerics.
    #[error(transparent)]
    Kmeans(#[from] KmeansError),
}

impl DivikError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::Numerical(msg.into())
    }
}
