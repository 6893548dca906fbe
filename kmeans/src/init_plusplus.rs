//! K-Means++ initialization algorithm
//! Implements the K-Means++ algorithm for smart initial centroid selection
//! which improves clustering quality and convergence speed

use ndarray::{Array2, ArrayView2};
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use crate::types::DistanceMetric;

/// Initialize cluster centroids using K-Means++ algorithm
///
/// K-Means++ selects initial centroids with probability proportional to their
/// squared distance from existing centroids, spreading them out across the data space.
///
/// # Arguments
/// * `data` - Samples as rows
/// * `k` - Number of centroids to pick
/// * `metric` - Distance used to measure the spread
/// * `rng` - Seeded generator owned by the caller
///
/// # Returns
/// * `Some(Array2)` containing k initial centroids, or `None` if data is empty
///
/// # Algorithm
/// 1. Choose first centroid randomly from data
/// 2. For each remaining centroid:
///    - Calculate distance from each point to nearest existing centroid
///    - Choose next centroid with probability proportional to squared distance
pub fn set_centroid_by_data(
    data: ArrayView2<f64>,
    k: usize,
    metric: DistanceMetric,
    rng: &mut ChaCha20Rng,
) -> Option<Array2<f64>> {
    let n = data.nrows();
    if n == 0 || k == 0 {
        return None;
    }

    let mut chosen: Vec<usize> = Vec::with_capacity(k);

    // Step 1: Select first centroid uniformly at random
    chosen.push(rng.random_range(0..n));

    // Step 2: Select remaining k-1 centroids
    for _clust in 1..k {
        // Squared distance of every point to its nearest chosen centroid
        let distances: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|i| {
                chosen
                    .iter()
                    .map(|&c| metric.distance(data.row(i), data.row(c)))
                    .fold(f64::INFINITY, f64::min)
                    .powi(2)
            })
            .collect();

        let total_distance: f64 = distances.iter().sum();

        // Every point coincides with a centroid already; any pick is as good as another
        if !(total_distance > 0.0) || !total_distance.is_finite() {
            chosen.push(rng.random_range(0..n));
            continue;
        }

        // Weighted random selection using cumulative distances
        let rand_val: f64 = rng.random_range(0.0..total_distance);
        let mut cumulative = 0.0;
        let mut selected_index = n - 1;
        for (i, d) in distances.iter().enumerate() {
            cumulative += d;
            if rand_val < cumulative {
                selected_index = i;
                break;
            }
        }
        chosen.push(selected_index);
    }

    Some(data.select(ndarray::Axis(0), &chosen))
}
