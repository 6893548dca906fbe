//! Error types for the k-means numerics

use thiserror::Error;

/// Result type alias for k-means operations.
pub type Result<T> = std::result::Result<T, KmeansError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KmeansError {
    /// Nothing to cluster.
    #[error("cannot cluster an empty dataset")]
    EmptyData,

    /// Requested more clusters than there are samples (or zero clusters).
    #[error("invalid number of clusters: {k} for {n_samples} samples")]
    InvalidClusterCount { k: usize, n_samples: usize },

    /// Centroids and data disagree on the number of features.
    #[error("dimension mismatch: expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Distance name not present in the catalog.
    #[error("unknown distance metric: {0}")]
    UnknownMetric(String),
}
