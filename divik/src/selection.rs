//! Boolean row masks over the root dataset
//!
//! Every node of the tree is described by a mask as long as the full dataset.
//! Row `i` of a node's subset is the `i`-th `true` position of its mask.

use ndarray::{Array2, ArrayView2, Axis};

/// Positions of the `true` entries, in ascending order
pub fn selected_indices(selection: &[bool]) -> Vec<usize> {
    selection
        .iter()
        .enumerate()
        .filter_map(|(i, &selected)| if selected { Some(i) } else { None })
        .collect()
}

/// Copy the selected rows of `data` into an owned subset
pub fn select_rows(data: ArrayView2<f64>, selection: &[bool]) -> Array2<f64> {
    data.select(Axis(0), &selected_indices(selection))
}

/// Build the mask of one sub-cluster
///
/// # Arguments
/// * `current_selection` - Mask of the parent node (root-relative)
/// * `partition` - Labels of the parent's rows, one per `true` entry of the mask
/// * `cluster_number` - Label whose rows form the child
///
/// # Returns
/// * Mask that is `true` exactly where the parent mask is `true` and the
///   corresponding row was labelled `cluster_number`
pub fn recursive_selection(
    current_selection: &[bool],
    partition: &[usize],
    cluster_number: usize,
) -> Vec<bool> {
    let mut labels = partition.iter();
    current_selection
        .iter()
        .map(|&selected| selected && labels.next().is_some_and(|&label| label == cluster_number))
        .collect()
}
