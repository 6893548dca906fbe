//! Euclidean centroid calculation for K-Means clustering
//! Implements centroid recalculation by computing the mean (average) of all points in each cluster

use ndarray::{Array1, Array2, ArrayView2};

/// Recalculate cluster centroids using Euclidean mean (arithmetic average)
///
/// # Arguments
/// * `data` - Samples as rows
/// * `labels` - Cluster id of every row
/// * `previous` - Centroids from the previous iteration
///
/// # Returns
/// * New centroids; a cluster that lost all of its points keeps its previous centroid
pub fn euclidean_recalculate(
    data: ArrayView2<f64>,
    labels: &[usize],
    previous: &Array2<f64>,
) -> Array2<f64> {
    let k = previous.nrows();
    let mut sums = Array2::<f64>::zeros(previous.raw_dim());
    let mut counts = vec![0usize; k];

    // Step 1: Sum all data points within each cluster
    for (row, &cluster) in data.rows().into_iter().zip(labels.iter()) {
        let mut acc = sums.row_mut(cluster);
        acc += &row;
        counts[cluster] += 1;
    }

    // Step 2: Divide each cluster's sum by its count to compute the mean
    for (cluster, count) in counts.into_iter().enumerate() {
        if count > 0 {
            let mean: Array1<f64> = sums.row(cluster).mapv(|v| v / count as f64);
            sums.row_mut(cluster).assign(&mean);
        } else {
            sums.row_mut(cluster).assign(&previous.row(cluster));
        }
    }

    sums
}
