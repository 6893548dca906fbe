//! Divisive hierarchical clustering
//!
//! A dataset is split by an order selector that picks its own number of
//! clusters, and every resulting sub-cluster is split again until it is too
//! small, shows no structure, or a split produces a cluster too small to trust.

pub mod clusterization;
pub mod context;
pub mod data_type;
pub mod error;
pub mod estimator;
pub mod feature_selection;
pub mod gap;
pub mod metrics;
pub mod report;
pub mod selection;
pub mod spectral;

pub use clusterization::{DivideResult, divide};
pub use context::DivikContext;
pub use data_type::{
    dataset::DataCollection,
    traits::{FeatureSelector, FittedClustering, OrderSelector},
    types::{DivikResult, Leaf, TreeSummary},
};
pub use error::{DivikError, Result};
pub use estimator::{Divik, DivikFit};
pub use feature_selection::{HighAbundanceAndVarianceSelector, NoSelector, SelectedFeatures, VarianceSelector};
pub use gap::{GapSearch, GapSearchModel};
pub use report::{CancellationToken, LoggingReporter, NoopReporter, Reporter};
pub use spectral::{AssignLabels, AutoSpectralClustering, AutoSpectralModel, EigenSolver, eigengap};
