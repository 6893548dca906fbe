//! Progress and cancellation side channel of the divisive recursion
//!
//! The engine calls a [`Reporter`] at every lifecycle step of every node.
//! None of the calls influence the result except [`Reporter::stop_check`],
//! which is the single cooperative cancellation point.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use ndarray::ArrayView2;
use tracing::{debug, info, warn};

use crate::error::{DivikError, Result};

/// Observer of the recursion. All methods default to no-ops.
///
/// Sibling branches may run on different threads, hence `Sync`.
pub trait Reporter: Sync {
    /// Branch ended without a split; `size` rows stay merged.
    fn finished_for(&self, _size: usize) {}
    /// Subset about to be passed to the feature selector.
    fn filter(&self, _subset: ArrayView2<f64>) {}
    /// Subset returned by the feature selector.
    fn filtered(&self, _subset: ArrayView2<f64>) {}
    /// Subset about to be fitted by the order selector.
    fn processing(&self, _subset: ArrayView2<f64>) {}
    /// Return `Err(DivikError::Cancelled)` to abort the whole recursion.
    fn stop_check(&self) -> Result<()> {
        Ok(())
    }
    /// Split found but discarded because a sub-cluster was too small.
    fn rejected(&self, _size: usize) {}
    /// Split accepted into `k` sub-clusters.
    fn recurring(&self, _k: usize) {}
    /// Children done, node being assembled.
    fn assemble(&self) {}
}

/// Reporter that ignores everything and never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}

/// Shared flag for cooperative cancellation.
///
/// Clones share the flag, so one clone can be handed to a signal handler while
/// another sits inside the reporter.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reporter that logs progress through `tracing`.
///
/// Progress is the share of samples whose fate is settled: rows end up either
/// in a finished leaf or in a rejected node. Each finished branch bumps the
/// counter and an `info!` line shows the percentage.
#[derive(Debug)]
pub struct LoggingReporter {
    n_samples: usize,
    settled: AtomicUsize,
    splits: AtomicUsize,
    token: CancellationToken,
}

impl LoggingReporter {
    pub fn new(n_samples: usize) -> Self {
        Self::with_token(n_samples, CancellationToken::new())
    }

    pub fn with_token(n_samples: usize, token: CancellationToken) -> Self {
        Self { n_samples, settled: AtomicUsize::new(0), splits: AtomicUsize::new(0), token }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Number of rows that reached a leaf so far
    pub fn settled(&self) -> usize {
        self.settled.load(Ordering::SeqCst)
    }

    /// Number of accepted splits so far
    pub fn splits(&self) -> usize {
        self.splits.load(Ordering::SeqCst)
    }

    fn settle(&self, size: usize) -> usize {
        self.settled.fetch_add(size, Ordering::SeqCst) + size
    }

    fn percent(&self, settled: usize) -> f64 {
        if self.n_samples == 0 {
            return 100.0;
        }
        100.0 * settled as f64 / self.n_samples as f64
    }
}

impl Reporter for LoggingReporter {
    fn finished_for(&self, size: usize) {
        let settled = self.settle(size);
        info!(size, progress = %format!("{:.1}%", self.percent(settled)), "branch finished");
    }

    fn filter(&self, subset: ArrayView2<f64>) {
        debug!(rows = subset.nrows(), features = subset.ncols(), "feature selection");
    }

    fn filtered(&self, subset: ArrayView2<f64>) {
        debug!(rows = subset.nrows(), features = subset.ncols(), "features selected");
    }

    fn processing(&self, subset: ArrayView2<f64>) {
        debug!(rows = subset.nrows(), features = subset.ncols(), "fitting order selector");
    }

    fn stop_check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            warn!("cancellation requested, unwinding");
            return Err(DivikError::Cancelled);
        }
        Ok(())
    }

    fn rejected(&self, size: usize) {
        let settled = self.settle(size);
        warn!(size, progress = %format!("{:.1}%", self.percent(settled)), "split rejected");
    }

    fn recurring(&self, k: usize) {
        self.splits.fetch_add(1, Ordering::SeqCst);
        info!(k, "recurring into sub-clusters");
    }

    fn assemble(&self) {
        debug!("assembling node");
    }
}
