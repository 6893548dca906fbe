//! Spectral clustering pieces: affinity, eigengap estimate and the
//! auto-order clusterer built on top of them.

pub mod affinity;
pub mod auto;
pub mod discretize;
pub mod eigengap;

pub use affinity::locally_adjusted_affinity;
pub use auto::{AssignLabels, AutoSpectralClustering, AutoSpectralModel};
pub use eigengap::{EigenSolver, eigengap};
