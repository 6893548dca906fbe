//! High level entry point running the divisive engine on a whole dataset

use ndarray::ArrayView2;
use tracing::info;

use crate::{
    clusterization::{DivideResult, divide},
    context::DivikContext,
    data_type::traits::{FeatureSelector, OrderSelector},
    error::{DivikError, Result},
    report::Reporter,
};

/// Divisive clustering configured with an order selector, a feature selector
/// and the recursion thresholds.
#[derive(Clone, Debug, Default)]
pub struct Divik<O, S> {
    pub order_selector: O,
    pub feature_selector: S,
    pub context: DivikContext,
}

/// Result of [`Divik::fit`]
pub struct DivikFit<O: OrderSelector, S: FeatureSelector> {
    /// `None` when the whole dataset was kept as one cluster
    pub tree: Option<DivideResult<O, S>>,
    /// Flat label of every row, numbered in depth-first leaf order
    pub labels: Vec<usize>,
    /// Label path from the root for every flat label
    pub paths: Vec<Vec<usize>>,
    pub depth: usize,
    pub n_clusters: usize,
}

impl<O: OrderSelector, S: FeatureSelector> Divik<O, S> {
    pub fn new(order_selector: O, feature_selector: S, context: DivikContext) -> Self {
        Self { order_selector, feature_selector, context }
    }

    /// Check every part of the configuration
    pub fn validate(&self) -> Result<()> {
        self.context.validate(self.order_selector.max_clusters())?;
        self.order_selector.validate()?;
        self.feature_selector.validate()
    }

    /// Build the tree for all rows and flatten its leaves into labels
    ///
    /// # Errors
    /// * `Configuration` for invalid parameters or empty data, before any fitting
    /// * `Cancelled` when `report` requests it
    pub fn fit<R: Reporter + ?Sized>(&self, data: ArrayView2<f64>, report: &R) -> Result<DivikFit<O, S>> {
        self.validate()?;
        let n = data.nrows();
        if n == 0 || data.ncols() == 0 {
            return Err(DivikError::configuration("cannot cluster an empty dataset"));
        }

        let selection = vec![true; n];
        let tree = divide(data, &selection, &self.order_selector, &self.feature_selector, &self.context, report)?;

        let (labels, paths, depth) = match &tree {
            Some(root) => {
                let mut labels = vec![0; n];
                let mut paths = Vec::new();
                for (label, leaf) in root.leaves(&selection).into_iter().enumerate() {
                    leaf.selection
                        .iter()
                        .zip(labels.iter_mut())
                        .filter(|(selected, _)| **selected)
                        .for_each(|(_, slot)| *slot = label);
                    paths.push(leaf.path);
                }
                (labels, paths, root.depth())
            }
            None => (vec![0; n], vec![Vec::new()], 0),
        };

        info!(n_samples = n, n_clusters = paths.len(), depth, "divisive clustering finished");
        Ok(DivikFit { tree, n_clusters: paths.len(), labels, paths, depth })
    }
}
