use crate::error::{DivikError, Result};

/// Thresholds and scheduling options for the divisive recursion
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DivikContext {
    /// A node must have more rows than this (and than the selector's
    /// `max_clusters`) before a split is attempted.
    pub minimal_size: usize,
    /// A split is rejected when any sub-cluster has this many rows or fewer.
    pub rejection_size: usize,
    /// Fan sibling branches out over the rayon pool.
    pub parallel: bool,
}

impl Default for DivikContext {
    fn default() -> Self {
        Self { minimal_size: 16, rejection_size: 0, parallel: false }
    }
}

impl DivikContext {
    pub fn new(minimal_size: usize, rejection_size: usize) -> Self {
        Self { minimal_size, rejection_size, parallel: false }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check the thresholds against the order selector's bound.
    ///
    /// Sizes are unsigned, so the only invalid combination left is a selector
    /// that can never produce more than one cluster.
    pub fn validate(&self, max_clusters: usize) -> Result<()> {
        if max_clusters < 2 {
            return Err(DivikError::configuration(format!(
                "order selector must allow at least 2 clusters, got max_clusters = {max_clusters}"
            )));
        }
        Ok(())
    }
}
