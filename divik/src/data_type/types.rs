use serde::{Deserialize, Serialize};

use crate::{
    metrics::label_counts,
    selection::recursive_selection,
};

/// One accepted split of the divisive tree.
///
/// `merged` holds the node-local labels (one per row of the node's subset) and
/// `subregions` one entry per distinct label in ascending label order. `None`
/// marks a sub-cluster that was not split any further.
#[derive(Clone, Debug)]
pub struct DivikResult<M, F> {
    pub clustering: M,
    pub feature_selector: F,
    pub merged: Vec<usize>,
    pub subregions: Vec<Option<DivikResult<M, F>>>,
}

/// Final cluster of the tree: the label path from the root and its root-relative mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf {
    pub path: Vec<usize>,
    pub selection: Vec<bool>,
}

/// Model-free view of a tree, suitable for serialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSummary {
    pub n_clusters: usize,
    /// Population of every sub-cluster, in ascending label order
    pub sizes: Vec<usize>,
    pub subregions: Vec<Option<TreeSummary>>,
}

impl<M, F> DivikResult<M, F> {
    /// Distinct labels of `merged`, ascending; aligned with `subregions`
    pub fn clusters(&self) -> Vec<usize> {
        label_counts(&self.merged).into_keys().collect()
    }

    /// Number of split levels below and including this node
    pub fn depth(&self) -> usize {
        1 + self
            .subregions
            .iter()
            .map(|child| child.as_ref().map_or(0, DivikResult::depth))
            .max()
            .unwrap_or(0)
    }

    /// Number of final clusters under this node
    pub fn n_leaves(&self) -> usize {
        self.subregions
            .iter()
            .map(|child| child.as_ref().map_or(1, DivikResult::n_leaves))
            .sum()
    }

    /// Enumerate final clusters depth-first in ascending label order
    ///
    /// # Arguments
    /// * `selection` - Root-relative mask this node was fitted on
    pub fn leaves(&self, selection: &[bool]) -> Vec<Leaf> {
        let mut out = Vec::new();
        self.collect_leaves(selection, &mut Vec::new(), &mut out);
        out
    }

    fn collect_leaves(&self, selection: &[bool], path: &mut Vec<usize>, out: &mut Vec<Leaf>) {
        for (cluster, child) in self.clusters().into_iter().zip(self.subregions.iter()) {
            let child_selection = recursive_selection(selection, &self.merged, cluster);
            path.push(cluster);
            match child {
                Some(node) => node.collect_leaves(&child_selection, path, out),
                None => out.push(Leaf { path: path.clone(), selection: child_selection }),
            }
            path.pop();
        }
    }

    pub fn summary(&self) -> TreeSummary {
        let counts = label_counts(&self.merged);
        TreeSummary {
            n_clusters: counts.len(),
            sizes: counts.into_values().collect(),
            subregions: self
                .subregions
                .iter()
                .map(|child| child.as_ref().map(DivikResult::summary))
                .collect(),
        }
    }
}
