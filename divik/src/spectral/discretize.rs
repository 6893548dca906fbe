//! Discretization of a spectral embedding into hard labels
//! Implements the multiclass spectral rounding of Yu & Shi: search for the
//! rotation that brings the normalized embedding closest to a discrete
//! indicator matrix, alternating label assignment and an SVD-based rotation
//! update until the normalized cut objective stops changing.

use nalgebra::DMatrix;
use ndarray::ArrayView2;
use rand::prelude::*;
use rand_chacha::ChaCha20Rng;

use crate::error::{DivikError, Result};

const MAX_SVD_RESTARTS: usize = 30;
const MAX_ITER: usize = 20;
const EPS: f64 = f64::EPSILON;

/// Assign labels by rotating the embedding onto the nearest discrete partition
///
/// # Arguments
/// * `embedding` - Spectral embedding, shape (n_samples, n_clusters)
/// * `rng` - Generator choosing the first rotation axis
///
/// # Returns
/// * One label per sample in `[0, n_clusters)`
///
/// # Errors
/// * `Numerical` when no SVD restart converges
pub fn discretize(embedding: ArrayView2<f64>, rng: &mut ChaCha20Rng) -> Result<Vec<usize>> {
    let (n_samples, n_components) = embedding.dim();
    if n_samples == 0 || n_components == 0 {
        return Err(DivikError::configuration("cannot discretize an empty embedding"));
    }
    if n_components == 1 {
        return Ok(vec![0; n_samples]);
    }

    let vectors = normalize(embedding);

    let mut svd_restarts = 0;
    while svd_restarts < MAX_SVD_RESTARTS {
        // Initial rotation: rows as mutually orthogonal as possible
        let mut rotation = DMatrix::<f64>::zeros(n_components, n_components);
        let first = rng.random_range(0..n_samples);
        rotation.set_column(0, &vectors.row(first).transpose());
        let mut c = vec![0.0; n_samples];
        for j in 1..n_components {
            let projection = &vectors * rotation.column(j - 1);
            let mut best = 0;
            for i in 0..n_samples {
                c[i] += projection[i].abs();
                if c[i] < c[best] {
                    best = i;
                }
            }
            rotation.set_column(j, &vectors.row(best).transpose());
        }

        let mut last_objective = 0.0;
        let mut n_iter = 0;
        loop {
            n_iter += 1;
            let discrete = &vectors * &rotation;
            let labels: Vec<usize> = (0..n_samples)
                .map(|i| {
                    discrete
                        .row(i)
                        .iter()
                        .enumerate()
                        .fold((0, f64::NEG_INFINITY), |best, (j, &v)| if v > best.1 { (j, v) } else { best })
                        .0
                })
                .collect();

            // Indicator^T * vectors
            let mut t_svd = DMatrix::<f64>::zeros(n_components, n_components);
            for (i, &label) in labels.iter().enumerate() {
                for j in 0..n_components {
                    t_svd[(label, j)] += vectors[(i, j)];
                }
            }

            let Some(svd) = t_svd.try_svd(true, true, EPS, 0) else {
                svd_restarts += 1;
                break;
            };
            let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
                svd_restarts += 1;
                break;
            };

            let ncut = 2.0 * (n_samples as f64 - svd.singular_values.sum());
            if (ncut - last_objective).abs() < EPS || n_iter > MAX_ITER {
                return Ok(labels);
            }
            last_objective = ncut;
            rotation = v_t.transpose() * u.transpose();
        }
    }

    Err(DivikError::numerical("SVD did not converge while discretizing the embedding"))
}

// Columns scaled to norm sqrt(n) with a deterministic sign, then rows to unit norm
fn normalize(embedding: ArrayView2<f64>) -> DMatrix<f64> {
    let (n_samples, n_components) = embedding.dim();
    let mut vectors = DMatrix::from_fn(n_samples, n_components, |i, j| embedding[[i, j]]);
    let norm_ones = (n_samples as f64).sqrt();

    for j in 0..n_components {
        let norm = vectors.column(j).norm();
        if norm > 0.0 {
            let sign = if vectors[(0, j)] < 0.0 { -1.0 } else { 1.0 };
            let scaled = vectors.column(j) * (sign * norm_ones / norm);
            vectors.set_column(j, &scaled);
        }
    }
    for i in 0..n_samples {
        let norm = vectors.row(i).norm();
        if norm > 0.0 {
            let scaled = vectors.row(i) / norm;
            vectors.set_row(i, &scaled);
        }
    }
    vectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;

    #[test]
    fn indicator_embedding_is_recovered() {
        // Two perfectly separated groups of three samples
        let embedding = Array2::from_shape_fn((6, 2), |(i, j)| if (i < 3) == (j == 0) { 1.0 } else { 0.0 });
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let labels = discretize(embedding.view(), &mut rng).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn single_component_is_one_cluster() {
        let embedding = Array2::from_elem((4, 1), 0.5);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        assert_eq!(discretize(embedding.view(), &mut rng).unwrap(), vec![0; 4]);
    }
}
