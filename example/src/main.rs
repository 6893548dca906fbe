//! Divisive clustering of a numeric dataset
//! Loads rows from JSON or CSV, builds the DiviK tree with the selected order
//! and feature selectors, and writes flat labels and the tree summary.

use std::path::{Path, PathBuf};

use algorythm::{Method, RunSettings, Selector, clusterization};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use divik::{CancellationToken, DataCollection, DivikContext};
use kmeans::DistanceMetric;
use loading::load_data;
use output::{write_labels, write_tree};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

// Module declarations
mod algorythm;
mod loading;
mod output;

/// Command-line arguments for the clustering program
#[derive(Parser, Debug)]
#[command(name = "divik-cli", author, version, about)]
struct Args {
    /// Path to the input data (.json array of rows or .csv)
    #[arg(long)]
    pub data: PathBuf,
    /// Output directory for results
    #[arg(long)]
    pub outdir: PathBuf,
    /// Order selection: GAP statistic k-means or auto-order spectral clustering
    #[arg(long, value_enum, default_value_t = Method::Gap)]
    pub method: Method,
    /// Upper bound on clusters per split
    #[arg(long, default_value_t = 10)]
    pub max_clusters: usize,
    /// Nodes with at most this many rows are not split
    #[arg(long, default_value_t = 16)]
    pub minimal_size: usize,
    /// Splits producing a sub-cluster of at most this many rows are rejected
    #[arg(long, default_value_t = 0)]
    pub rejection_size: usize,
    /// Distance metric (euclidean, sqeuclidean, cityblock, chebyshev, cosine, correlation)
    #[arg(long, default_value = "euclidean")]
    pub distance: DistanceMetric,
    /// Neighbor rank of the local scale in spectral affinity
    #[arg(long, default_value_t = 7)]
    pub neighbors: usize,
    /// Per-node feature filter
    #[arg(long, value_enum, default_value_t = Selector::None)]
    pub selector: Selector,
    /// Variance percentile of the feature filter
    #[arg(long, default_value_t = 20.0)]
    pub percentile: f64,
    /// Split sibling branches in parallel
    #[arg(long)]
    pub parallel: bool,
    /// Random seed for reproducibility
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Scale every row to unit root mean square before clustering
    #[arg(long)]
    pub normalize: bool,
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args: Args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();

    // Get current timestamp for versioning/tracking
    let time: i64 = Utc::now().timestamp();

    // Create output directory if it doesn't exist
    let project_folder = args.outdir.clone();
    if !fs::try_exists(&project_folder).await.unwrap_or(false) {
        fs::create_dir_all(&project_folder)
            .await
            .with_context(|| format!("failed to create {}", project_folder.display()))?;
        info!(dir = %project_folder.display(), "output directory created");
    }

    let data = DataCollection::new(load_data(&args.data).await?, args.normalize)?.data;
    info!(rows = data.nrows(), features = data.ncols(), "data loaded");

    let settings = RunSettings {
        method: args.method,
        selector: args.selector,
        distance: args.distance,
        max_clusters: args.max_clusters,
        n_neighbors: args.neighbors,
        percentile: args.percentile,
        seed: args.seed,
        context: DivikContext::new(args.minimal_size, args.rejection_size).with_parallel(args.parallel),
    };

    // Ctrl-C cancels the run at the next node boundary
    let token = CancellationToken::new();
    let handler_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            handler_token.cancel();
        }
    });

    let outcome = tokio::task::spawn_blocking(move || clusterization(data.view(), &settings, token))
        .await
        .context("clustering task panicked")??;
    info!(n_clusters = outcome.n_clusters, depth = outcome.depth, "clustering done");

    write_outputs(&outcome, &project_folder, time).await
}

async fn write_outputs(outcome: &algorythm::Outcome, project_folder: &Path, time: i64) -> Result<()> {
    write_labels(outcome, project_folder, "labels").await?;
    write_tree(outcome, project_folder, "tree", time).await?;
    info!(dir = %project_folder.display(), "results written");
    Ok(())
}

// Example command line usage:
// cargo run --release -p divik-cli -- --data ./data/points.csv --outdir ./out --method spectral --max-clusters 8
