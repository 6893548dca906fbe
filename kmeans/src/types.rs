//! Type definitions for K-Means clustering
//! Includes the distance metric catalog and the pairwise distance helper
//! used by graph-based clustering

use std::{fmt, str::FromStr};

use ndarray::{Array2, ArrayView1, ArrayView2};
use num_traits::Float;
use rayon::prelude::*;

use crate::error::KmeansError;

/// Distance metrics available for clustering
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DistanceMetric {
    /// Standard Euclidean distance
    #[default]
    Euclidean,
    /// Squared Euclidean distance (no square root)
    SqEuclidean,
    /// Sum of absolute differences (Manhattan)
    Cityblock,
    /// Largest absolute difference over all features
    Chebyshev,
    /// One minus the cosine of the angle between vectors
    Cosine,
    /// Cosine distance of the mean-centered vectors
    Correlation,
}

impl DistanceMetric {
    /// Every metric in the catalog, in declaration order
    pub const ALL: [DistanceMetric; 6] = [
        Self::Euclidean,
        Self::SqEuclidean,
        Self::Cityblock,
        Self::Chebyshev,
        Self::Cosine,
        Self::Correlation,
    ];

    /// Canonical lowercase name, the same spelling `FromStr` accepts
    pub fn name(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::SqEuclidean => "sqeuclidean",
            Self::Cityblock => "cityblock",
            Self::Chebyshev => "chebyshev",
            Self::Cosine => "cosine",
            Self::Correlation => "correlation",
        }
    }

    /// Calculate the distance between two feature vectors
    ///
    /// Vectors are compared pairwise by position; a length mismatch is the
    /// caller's bug and only the common prefix is used.
    ///
    /// # Arguments
    /// * `left` - First feature vector
    /// * `right` - Second feature vector
    pub fn distance<T: Float>(&self, left: ArrayView1<T>, right: ArrayView1<T>) -> T {
        let pairs = left.iter().copied().zip(right.iter().copied());
        match self {
            Self::Euclidean => Self::SqEuclidean.distance(left, right).sqrt(),
            Self::SqEuclidean => pairs.fold(T::zero(), |acc, (a, b)| acc + (a - b) * (a - b)),
            Self::Cityblock => pairs.fold(T::zero(), |acc, (a, b)| acc + (a - b).abs()),
            Self::Chebyshev => pairs.fold(T::zero(), |acc, (a, b)| acc.max((a - b).abs())),
            Self::Cosine => cosine(pairs),
            Self::Correlation => {
                let left_mean = mean(left);
                let right_mean = mean(right);
                cosine(pairs.map(|(a, b)| (a - left_mean, b - right_mean)))
            }
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = KmeansError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|metric| metric.name() == lowered)
            .ok_or_else(|| KmeansError::UnknownMetric(s.to_string()))
    }
}

fn mean<T: Float>(values: ArrayView1<T>) -> T {
    if values.is_empty() {
        return T::zero();
    }
    let count = T::from(values.len()).unwrap_or_else(T::one);
    values.iter().fold(T::zero(), |acc, &v| acc + v) / count
}

// Zero vectors are at distance 0 from each other and 1 from anything else.
fn cosine<T: Float>(pairs: impl Iterator<Item = (T, T)>) -> T {
    let (dot, left_norm, right_norm) = pairs.fold(
        (T::zero(), T::zero(), T::zero()),
        |(dot, l, r), (a, b)| (dot + a * b, l + a * a, r + b * b),
    );
    if left_norm.is_zero() && right_norm.is_zero() {
        return T::zero();
    }
    if left_norm.is_zero() || right_norm.is_zero() {
        return T::one();
    }
    (T::one() - dot / (left_norm.sqrt() * right_norm.sqrt())).max(T::zero())
}

/// Calculate the full pairwise distance matrix between the rows of `data`
///
/// Only the upper triangle is computed (rows in parallel) and mirrored, so
/// the result is exactly symmetric with a zero diagonal.
///
/// # Arguments
/// * `metric` - Distance metric to use
/// * `data` - Samples as rows, shape (n_samples, n_features)
///
/// # Returns
/// * Matrix of shape (n_samples, n_samples)
pub fn pairwise_distances(metric: DistanceMetric, data: ArrayView2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let upper: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (i..n)
                .map(|j| if i == j { 0.0 } else { metric.distance(data.row(i), data.row(j)) })
                .collect()
        })
        .collect();

    Array2::from_shape_fn((n, n), |(i, j)| {
        if i <= j { upper[i][j - i] } else { upper[j][i - j] }
    })
}
