//! Divisive clustering run configured from the command line
//! Picks the order selector and feature selector, runs the tree and flattens it
//! into a result that no longer depends on the selector types.

use anyhow::{Result, bail};
use divik::{
    AutoSpectralClustering, CancellationToken, Divik, DivikContext, FeatureSelector, GapSearch,
    HighAbundanceAndVarianceSelector, LoggingReporter, NoSelector, OrderSelector, TreeSummary, VarianceSelector,
};
use kmeans::DistanceMetric;
use ndarray::ArrayView2;
use tracing::info;

/// Order selection strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Method {
    Gap,
    Spectral,
}

/// Feature filter applied at every node
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Selector {
    None,
    Variance,
    Abundance,
}

/// Everything a run needs besides the data
#[derive(Clone, Debug)]
pub struct RunSettings {
    pub method: Method,
    pub selector: Selector,
    pub distance: DistanceMetric,
    pub max_clusters: usize,
    pub n_neighbors: usize,
    pub percentile: f64,
    pub seed: u64,
    pub context: DivikContext,
}

/// Flattened outcome of a run
#[derive(Clone, Debug)]
pub struct Outcome {
    pub labels: Vec<usize>,
    pub paths: Vec<Vec<usize>>,
    pub depth: usize,
    pub n_clusters: usize,
    pub tree: Option<TreeSummary>,
}

/// Run divisive clustering with the configured selectors
///
/// # Arguments
/// * `data` - Rows to cluster
/// * `settings` - Parsed command line options
/// * `token` - Cancelled from the Ctrl-C handler
pub fn clusterization(data: ArrayView2<f64>, settings: &RunSettings, token: CancellationToken) -> Result<Outcome> {
    if settings.max_clusters < 2 {
        bail!("--max-clusters must be at least 2");
    }
    let reporter = LoggingReporter::with_token(data.nrows(), token);

    match settings.selector {
        Selector::None => with_order_selector(data, settings, NoSelector, &reporter),
        Selector::Variance => {
            let selector = VarianceSelector { percentile: settings.percentile };
            with_order_selector(data, settings, selector, &reporter)
        }
        Selector::Abundance => {
            let selector = HighAbundanceAndVarianceSelector {
                variance_percentile: settings.percentile,
                ..Default::default()
            };
            with_order_selector(data, settings, selector, &reporter)
        }
    }
}

fn with_order_selector<S: FeatureSelector>(
    data: ArrayView2<f64>,
    settings: &RunSettings,
    feature_selector: S,
    reporter: &LoggingReporter,
) -> Result<Outcome> {
    match settings.method {
        Method::Gap => {
            let order_selector = GapSearch {
                max_clusters: settings.max_clusters,
                distance: settings.distance,
                seed: settings.seed,
                ..Default::default()
            };
            run(Divik::new(order_selector, feature_selector, settings.context.clone()), data, reporter)
        }
        Method::Spectral => {
            let order_selector = AutoSpectralClustering {
                max_clusters: settings.max_clusters,
                distance: settings.distance,
                n_neighbors: settings.n_neighbors,
                seed: settings.seed,
                ..Default::default()
            };
            run(Divik::new(order_selector, feature_selector, settings.context.clone()), data, reporter)
        }
    }
}

fn run<O: OrderSelector, S: FeatureSelector>(
    divik: Divik<O, S>,
    data: ArrayView2<f64>,
    reporter: &LoggingReporter,
) -> Result<Outcome> {
    let fit = divik.fit(data, reporter)?;
    info!(splits = reporter.splits(), settled = reporter.settled(), "tree assembled");
    Ok(Outcome {
        tree: fit.tree.as_ref().map(|root| root.summary()),
        labels: fit.labels,
        paths: fit.paths,
        depth: fit.depth,
        n_clusters: fit.n_clusters,
    })
}
