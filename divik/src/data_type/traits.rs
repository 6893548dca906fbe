use ndarray::{Array2, ArrayView2};

use crate::error::Result;

/// A fitted partition of one node's rows.
pub trait FittedClustering {
    /// Whether the order selection converged to an answer.
    fn fitted(&self) -> bool;
    fn n_clusters(&self) -> usize;
    /// One label per row of the data the model was fitted on.
    fn labels(&self) -> &[usize];
}

/// Clustering capability that picks its own number of clusters, bounded by
/// `max_clusters`.
///
/// Implementors are immutable configuration. `fit` must return a fresh model
/// and never touch `self`, so the same selector can serve every node of the
/// tree (and sibling branches running on different threads).
pub trait OrderSelector: Sync {
    type Model: FittedClustering + Send;

    fn max_clusters(&self) -> usize;

    fn fit(&self, data: ArrayView2<f64>) -> Result<Self::Model>;

    /// Reject invalid configuration before any data is touched.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Per-node feature filter.
///
/// Like [`OrderSelector`], the implementor is configuration only: every call
/// returns its own fitted state next to the transformed data.
pub trait FeatureSelector: Sync {
    type Fitted: Send;

    fn fit_transform(&self, data: ArrayView2<f64>) -> Result<(Self::Fitted, Array2<f64>)>;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
