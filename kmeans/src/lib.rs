
pub mod error;
pub mod model;
pub mod types;
mod euclidean_centers;
mod init_plusplus;

pub use error::{KmeansError, Result};
pub use model::{assign_points, dispersion, KMeans, KMeansFit};
pub use types::{pairwise_distances, DistanceMetric};
