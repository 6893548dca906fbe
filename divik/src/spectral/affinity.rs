use kmeans::{DistanceMetric, pairwise_distances};
use ndarray::{Array2, ArrayView2};

use crate::error::{DivikError, Result};

/// RBF affinity with a per-sample bandwidth
///
/// The bandwidth `sigma_i` of a sample is its distance to the `n_neighbors`-th
/// nearest other sample, and `A_ij = exp(-d_ij^2 / (sigma_i * sigma_j))`.
/// Dense regions get narrow kernels and sparse regions wide ones, so clusters
/// of different density stay connected internally.
///
/// # Arguments
/// * `distance` - Metric for the pairwise distances
/// * `data` - Samples as rows
/// * `n_neighbors` - Neighbor rank defining the local scale, clamped to `n_samples - 1`
///
/// # Returns
/// * Symmetric matrix of shape (n_samples, n_samples) with values in [0, 1]
pub fn locally_adjusted_affinity(
    distance: DistanceMetric,
    data: ArrayView2<f64>,
    n_neighbors: usize,
) -> Result<Array2<f64>> {
    if n_neighbors == 0 {
        return Err(DivikError::configuration("n_neighbors must be at least 1"));
    }
    let n = data.nrows();
    if n == 0 {
        return Err(DivikError::configuration("cannot build affinity of an empty dataset"));
    }

    let distances = pairwise_distances(distance, data);
    let rank = n_neighbors.min(n - 1);

    // Position 0 of a sorted row is the sample itself
    let sigma: Vec<f64> = distances
        .rows()
        .into_iter()
        .map(|row| {
            let mut sorted = row.to_vec();
            sorted.sort_by(f64::total_cmp);
            sorted[rank]
        })
        .collect();

    // Upper triangle mirrored so the result is exactly symmetric
    let mut affinity = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        affinity[[i, i]] = 1.0;
        for j in (i + 1)..n {
            let d = distances[[i, j]];
            let scale = sigma[i] * sigma[j];
            let value = if scale > 0.0 {
                (-d * d / scale).exp()
            } else if d == 0.0 {
                1.0
            } else {
                0.0
            };
            affinity[[i, j]] = value;
            affinity[[j, i]] = value;
        }
    }
    Ok(affinity)
}
