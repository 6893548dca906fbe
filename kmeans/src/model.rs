use std::time::Instant;

use ndarray::{Array2, ArrayView2};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::{
    error::{KmeansError, Result},
    euclidean_centers::euclidean_recalculate,
    init_plusplus::set_centroid_by_data,
    types::DistanceMetric,
};

// Configuration of a K-Means run. It holds no fitted state, so one value can be
// shared by any number of fits; `fit` returns a fresh `KMeansFit` every call.
#[derive(Clone, Debug, PartialEq)]
pub struct KMeans {
    pub k: usize,
    pub metric: DistanceMetric,
    pub max_iter: usize,
    pub n_init: usize,
    pub seed: u64,
}

/// Outcome of a single K-Means fit
#[derive(Clone, Debug)]
pub struct KMeansFit {
    pub centroids: Array2<f64>,
    pub labels: Vec<usize>,
    /// Sum of distances from each point to its centroid
    pub inertia: f64,
    pub n_iter: usize,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self { k, metric: DistanceMetric::Euclidean, max_iter: 100, n_init: 1, seed: 0 }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit the model to the rows of `data`
    ///
    /// Runs `n_init` k-means++ initialisations from one seeded generator and
    /// keeps the run with the lowest inertia.
    ///
    /// # Errors
    /// * `EmptyData` when `data` has no rows
    /// * `InvalidClusterCount` when `k` is zero or exceeds the number of rows
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<KMeansFit> {
        let n = data.nrows();
        if n == 0 {
            return Err(KmeansError::EmptyData);
        }
        if self.k == 0 || self.k > n {
            return Err(KmeansError::InvalidClusterCount { k: self.k, n_samples: n });
        }

        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
        let fit_timer = Instant::now();
        let mut best: Option<KMeansFit> = None;

        for _ in 0..self.n_init.max(1) {
            let candidate = self.single_run(data, &mut rng)?;
            let better = best.as_ref().is_none_or(|b| candidate.inertia < b.inertia);
            if better {
                best = Some(candidate);
            }
        }

        debug!(k = self.k, n_samples = n, elapsed = ?fit_timer.elapsed(), "k-means fitted");
        best.ok_or(KmeansError::EmptyData)
    }

    fn single_run(&self, data: ArrayView2<f64>, rng: &mut ChaCha20Rng) -> Result<KMeansFit> {
        // Init centroids based on data
        let mut centroids =
            set_centroid_by_data(data, self.k, self.metric, rng).ok_or(KmeansError::EmptyData)?;

        // First assignment of points to centroids
        let (mut labels, mut inertia) = assign_points(data, centroids.view(), self.metric)?;
        let mut n_iter = 0;

        while n_iter < self.max_iter {
            n_iter += 1;
            // Recalculate centroids based on assigned points and reassign
            centroids = euclidean_recalculate(data, &labels, &centroids);
            let (new_labels, new_inertia) = assign_points(data, centroids.view(), self.metric)?;
            let converged = new_labels == labels;
            labels = new_labels;
            inertia = new_inertia;
            if converged {
                break;
            }
        }

        Ok(KMeansFit { centroids, labels, inertia, n_iter })
    }
}

impl KMeansFit {
    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    /// Assign new rows to the nearest fitted centroid
    pub fn predict(&self, data: ArrayView2<f64>, metric: DistanceMetric) -> Result<Vec<usize>> {
        assign_points(data, self.centroids.view(), metric).map(|(labels, _)| labels)
    }
}

/// Assign every row to its nearest centroid
///
/// # Returns
/// * Tuple of (labels, summed distance of each row to its centroid)
pub fn assign_points(
    data: ArrayView2<f64>,
    centroids: ArrayView2<f64>,
    metric: DistanceMetric,
) -> Result<(Vec<usize>, f64)> {
    if centroids.nrows() == 0 {
        return Err(KmeansError::EmptyData);
    }
    if data.ncols() != centroids.ncols() {
        return Err(KmeansError::DimensionMismatch { expected: centroids.ncols(), got: data.ncols() });
    }

    let assigned: Vec<(usize, f64)> = (0..data.nrows())
        .into_par_iter()
        .map(|i| {
            centroids
                .rows()
                .into_iter()
                .enumerate()
                .map(|(c, centroid)| (c, metric.distance(data.row(i), centroid)))
                .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
        })
        .collect();

    let inertia = assigned.iter().map(|(_, d)| d).sum();
    Ok((assigned.into_iter().map(|(c, _)| c).collect(), inertia))
}

/// Within-cluster dispersion: summed distance of every row to its own centroid
pub fn dispersion(
    data: ArrayView2<f64>,
    labels: &[usize],
    centroids: ArrayView2<f64>,
    metric: DistanceMetric,
) -> f64 {
    data.rows()
        .into_iter()
        .zip(labels.iter())
        .map(|(row, &c)| metric.distance(row, centroids.row(c)))
        .sum()
}
