use std::str::FromStr;

use kmeans::{DistanceMetric, KMeans};
use ndarray::{Array2, ArrayView2};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use crate::{
    data_type::traits::{FittedClustering, OrderSelector},
    error::{DivikError, Result},
    spectral::{
        affinity::locally_adjusted_affinity,
        discretize::discretize,
        eigengap::{largest_gap, normalized_laplacian, EigenSolver},
    },
};

/// Strategy turning the spectral embedding into labels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssignLabels {
    /// K-Means on the embedding rows
    #[default]
    KMeans,
    /// Yu & Shi rotation towards a discrete indicator matrix
    Discretize,
}

impl FromStr for AssignLabels {
    type Err = DivikError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kmeans" => Ok(Self::KMeans),
            "discretize" => Ok(Self::Discretize),
            other => Err(DivikError::configuration(format!("unknown label assignment: {other}"))),
        }
    }
}

/// Spectral Clustering with automated n_clusters selection
///
/// Builds a locally adjusted affinity, estimates the number of clusters from
/// the eigengap of its normalized Laplacian and segments the spectral
/// embedding into exactly that many clusters.
///
/// `max_clusters` only bounds the node sizes the divisive engine will hand
/// over; the eigengap itself is not capped.
#[derive(Clone, Debug, PartialEq)]
pub struct AutoSpectralClustering {
    pub distance: DistanceMetric,
    pub n_neighbors: usize,
    pub max_clusters: usize,
    pub assign_labels: AssignLabels,
    /// Restarts of the k-means label assignment
    pub n_init: usize,
    pub max_iter: usize,
    pub seed: u64,
    pub solver: EigenSolver,
}

impl Default for AutoSpectralClustering {
    fn default() -> Self {
        Self {
            distance: DistanceMetric::Euclidean,
            n_neighbors: 7,
            max_clusters: 10,
            assign_labels: AssignLabels::KMeans,
            n_init: 10,
            max_iter: 300,
            seed: 0,
            solver: EigenSolver::default(),
        }
    }
}

/// Result of [`AutoSpectralClustering`] on one dataset
#[derive(Clone, Debug)]
pub struct AutoSpectralModel {
    pub affinity_matrix: Array2<f64>,
    pub n_clusters: usize,
    pub labels: Vec<usize>,
}

impl FittedClustering for AutoSpectralModel {
    fn fitted(&self) -> bool {
        true
    }

    fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    fn labels(&self) -> &[usize] {
        &self.labels
    }
}

impl AutoSpectralClustering {
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<AutoSpectralModel> {
        self.validate()?;
        debug!(rows = data.nrows(), "starting automated spectral clustering");

        let affinity_matrix = locally_adjusted_affinity(self.distance, data, self.n_neighbors)?;

        // Laplacian and its spectrum are shared by the count estimate and the embedding
        let (laplacian, degree_sqrt) = normalized_laplacian(affinity_matrix.view())?;
        let spectrum = self.solver.decompose(laplacian.view())?;
        let n_clusters = largest_gap(&spectrum.values);
        debug!(n_clusters, "eigengap estimate");

        if n_clusters == 1 {
            return Ok(AutoSpectralModel { affinity_matrix, n_clusters, labels: vec![0; data.nrows()] });
        }

        // Eigenvectors of the smallest eigenvalues, rescaled by D^-1/2
        let n = data.nrows();
        let embedding = Array2::from_shape_fn((n, n_clusters), |(i, j)| {
            let d = degree_sqrt[i];
            let v = spectrum.vectors[[i, j]];
            if d > 0.0 { v / d } else { v }
        });

        let labels = match self.assign_labels {
            AssignLabels::KMeans => {
                KMeans::new(n_clusters)
                    .with_n_init(self.n_init)
                    .with_max_iter(self.max_iter)
                    .with_seed(self.seed)
                    .fit(embedding.view())?
                    .labels
            }
            AssignLabels::Discretize => {
                let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
                discretize(embedding.view(), &mut rng)?
            }
        };

        debug!(n_clusters, "automated spectral clustering done");
        Ok(AutoSpectralModel { affinity_matrix, n_clusters, labels })
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_neighbors == 0 {
            return Err(DivikError::configuration("n_neighbors must be at least 1"));
        }
        if self.max_clusters < 2 {
            return Err(DivikError::configuration("max_clusters must be at least 2"));
        }
        Ok(())
    }
}

impl OrderSelector for AutoSpectralClustering {
    type Model = AutoSpectralModel;

    fn max_clusters(&self) -> usize {
        self.max_clusters
    }

    fn fit(&self, data: ArrayView2<f64>) -> Result<AutoSpectralModel> {
        AutoSpectralClustering::fit(self, data)
    }

    fn validate(&self) -> Result<()> {
        AutoSpectralClustering::validate(self)
    }
}
