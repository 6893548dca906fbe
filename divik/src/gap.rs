//! K-Means with the number of clusters chosen by the GAP statistic
//!
//! For every candidate `k` the log within-cluster dispersion of the data is
//! compared with its expectation under uniform reference datasets drawn from
//! the bounding box of the features. The smallest `k` satisfying
//! `gap(k) >= gap(k + 1) - s(k + 1)` wins.

use kmeans::{DistanceMetric, KMeans, KMeansFit, dispersion};
use ndarray::{Array2, ArrayView2, Axis};
use rand::SeedableRng;
use rand::seq::index::sample;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Uniform};
use rayon::prelude::*;
use tracing::debug;

use crate::{
    data_type::traits::{FittedClustering, OrderSelector},
    error::{DivikError, Result},
    metrics::feature_bounds,
};

/// Order selector searching `k` in `1..=max_clusters` with the GAP statistic
#[derive(Clone, Debug, PartialEq)]
pub struct GapSearch {
    pub max_clusters: usize,
    /// Number of uniform reference datasets
    pub n_trials: usize,
    pub max_iter: usize,
    pub n_init: usize,
    pub distance: DistanceMetric,
    pub seed: u64,
    /// Rows used for the search itself; the final model is always fitted on all rows
    pub sample_size: Option<usize>,
}

impl Default for GapSearch {
    fn default() -> Self {
        Self {
            max_clusters: 10,
            n_trials: 10,
            max_iter: 100,
            n_init: 1,
            distance: DistanceMetric::Euclidean,
            seed: 0,
            sample_size: None,
        }
    }
}

/// Outcome of a [`GapSearch`] fit
#[derive(Clone, Debug)]
pub struct GapSearchModel {
    pub fitted: bool,
    pub n_clusters: usize,
    pub labels: Vec<usize>,
    pub centroids: Option<Array2<f64>>,
    /// `gap(k)` for every evaluated `k`, starting at 1
    pub gaps: Vec<f64>,
    /// `s(k)` matching `gaps`
    pub errors: Vec<f64>,
}

impl FittedClustering for GapSearchModel {
    fn fitted(&self) -> bool {
        self.fitted
    }

    fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    fn labels(&self) -> &[usize] {
        &self.labels
    }
}

impl GapSearch {
    fn kmeans(&self, k: usize, seed: u64) -> KMeans {
        KMeans::new(k)
            .with_metric(self.distance)
            .with_max_iter(self.max_iter)
            .with_n_init(self.n_init)
            .with_seed(seed)
    }

    fn log_dispersion(&self, data: ArrayView2<f64>, k: usize, seed: u64) -> Result<(f64, KMeansFit)> {
        let fit = self.kmeans(k, seed).fit(data)?;
        let w = dispersion(data, &fit.labels, fit.centroids.view(), self.distance);
        Ok((w.max(f64::MIN_POSITIVE).ln(), fit))
    }

    // gap(k) and s(k) for one candidate k
    fn gap(&self, data: ArrayView2<f64>, references: &[Array2<f64>], k: usize) -> Result<(f64, f64, KMeansFit)> {
        let (log_w, fit) = self.log_dispersion(data, k, self.seed)?;

        let reference_logs = references
            .par_iter()
            .enumerate()
            .map(|(trial, reference)| {
                let seed = self.seed.wrapping_add(trial as u64 + 1);
                self.log_dispersion(reference.view(), k, seed).map(|(log, _)| log)
            })
            .collect::<Result<Vec<f64>>>()?;

        let b = reference_logs.len() as f64;
        let mean = reference_logs.iter().sum::<f64>() / b;
        let std = (reference_logs.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / b).sqrt();
        Ok((mean - log_w, std * (1.0 + 1.0 / b).sqrt(), fit))
    }

    fn references(&self, data: ArrayView2<f64>, rng: &mut ChaCha20Rng) -> Result<Vec<Array2<f64>>> {
        let distributions = feature_bounds(data)
            .into_iter()
            .map(|(lo, hi)| {
                Uniform::new_inclusive(lo, hi)
                    .map_err(|e| DivikError::numerical(format!("invalid reference bounds [{lo}, {hi}]: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let shape = data.dim();
        Ok((0..self.n_trials)
            .map(|_| Array2::from_shape_fn(shape, |(_, j)| distributions[j].sample(&mut *rng)))
            .collect())
    }

    /// Search the number of clusters and fit the final model
    ///
    /// # Returns
    /// * A fitted model with the chosen `k`, or an unfitted single-cluster
    ///   model when no `k` up to the bound satisfies the criterion
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<GapSearchModel> {
        self.validate()?;
        let n = data.nrows();
        if n == 0 {
            return Err(DivikError::configuration("cannot search clusters of an empty dataset"));
        }

        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);

        // Step 1: optional subsample for the search
        let sampled = match self.sample_size {
            Some(size) if size < n => {
                let mut rows = sample(&mut rng, n, size.max(1)).into_vec();
                rows.sort_unstable();
                Some(data.select(Axis(0), &rows))
            }
            _ => None,
        };
        let search = match &sampled {
            Some(s) => s.view(),
            None => data.view(),
        };
        let k_max = self.max_clusters.min(search.nrows());

        // Step 2: reference datasets, shared by every k
        let references = self.references(search, &mut rng)?;

        // Step 3: first k with gap(k) >= gap(k + 1) - s(k + 1)
        let mut gaps = Vec::new();
        let mut errors = Vec::new();
        let (gap, error, mut fit) = self.gap(search, &references, 1)?;
        gaps.push(gap);
        errors.push(error);

        let mut chosen = None;
        for k in 1..k_max {
            let (next_gap, next_error, next_fit) = self.gap(search, &references, k + 1)?;
            gaps.push(next_gap);
            errors.push(next_error);
            if gaps[k - 1] >= next_gap - next_error {
                chosen = Some((k, fit));
                break;
            }
            fit = next_fit;
        }
        debug!(chosen_k = ?chosen.as_ref().map(|(k, _)| *k), evaluated = gaps.len(), "gap search finished");

        let Some((k, fit)) = chosen else {
            return Ok(GapSearchModel {
                fitted: false,
                n_clusters: 1,
                labels: vec![0; n],
                centroids: None,
                gaps,
                errors,
            });
        };

        // Step 4: labels for every row
        let final_fit = if sampled.is_some() { self.kmeans(k, self.seed).fit(data)? } else { fit };
        Ok(GapSearchModel {
            fitted: true,
            n_clusters: k,
            labels: final_fit.labels,
            centroids: Some(final_fit.centroids),
            gaps,
            errors,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_clusters < 2 {
            return Err(DivikError::configuration("max_clusters must be at least 2"));
        }
        if self.n_trials == 0 {
            return Err(DivikError::configuration("n_trials must be at least 1"));
        }
        if self.sample_size == Some(0) {
            return Err(DivikError::configuration("sample_size must be positive"));
        }
        Ok(())
    }
}

impl OrderSelector for GapSearch {
    type Model = GapSearchModel;

    fn max_clusters(&self) -> usize {
        self.max_clusters
    }

    fn fit(&self, data: ArrayView2<f64>) -> Result<GapSearchModel> {
        GapSearch::fit(self, data)
    }

    fn validate(&self) -> Result<()> {
        GapSearch::validate(self)
    }
}
