//! Divisive recursion engine
//!
//! Splits the rows selected by a mask into sub-clusters and recurses into each
//! of them until a branch is too small, has no structure left, or produces a
//! sub-cluster too small to trust.
//!
//! The engine owns no numerics: it filters features with a [`FeatureSelector`],
//! lets an [`OrderSelector`] decide the number of clusters and assembles the
//! resulting [`DivikResult`] tree.

use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::{
    context::DivikContext,
    data_type::{
        traits::{FeatureSelector, FittedClustering, OrderSelector},
        types::DivikResult,
    },
    error::{DivikError, Result},
    metrics::label_counts,
    report::Reporter,
    selection::{recursive_selection, select_rows},
};

/// Tree produced by [`divide`] for a given selector pair
pub type DivideResult<O, S> =
    DivikResult<<O as OrderSelector>::Model, <S as FeatureSelector>::Fitted>;

/// Recursively split the rows of `data` selected by `selection`
///
/// # Arguments
/// * `data` - Full dataset, shared read-only by every node
/// * `selection` - Root-relative mask of this node's rows
/// * `order_selector` - Decides the number of clusters and the labels
/// * `feature_selector` - Filters features before every fit
/// * `context` - Size thresholds and scheduling
/// * `report` - Progress events and the cancellation check
///
/// # Returns
/// * `Ok(Some(node))` when the rows were split
/// * `Ok(None)` when this branch ends here (too small, no structure, or rejected)
///
/// # Errors
/// * `Cancelled` as soon as `report.stop_check()` asks for it; no partial tree is returned
/// * any error of the selectors, unchanged
/// * `Configuration` when the mask length does not match the data or a
///   selector or the context is invalid; checked before any data is touched
/// * `Numerical` when the order selector returns a label count other than the node size
///
/// # Algorithm
/// 1. Take the subset and stop when it is not larger than `max(max_clusters, minimal_size)`
/// 2. Filter features and fit the order selector on a fresh instance each
/// 3. Stop on a failed fit or a single cluster; reject when any sub-cluster is too small
/// 4. Recurse once per label in ascending order
pub fn divide<O, S, R>(
    data: ArrayView2<f64>,
    selection: &[bool],
    order_selector: &O,
    feature_selector: &S,
    context: &DivikContext,
    report: &R,
) -> Result<Option<DivideResult<O, S>>>
where
    O: OrderSelector,
    S: FeatureSelector,
    R: Reporter + ?Sized,
{
    if selection.len() != data.nrows() {
        return Err(DivikError::configuration(format!(
            "selection has {} entries, data has {} rows",
            selection.len(),
            data.nrows()
        )));
    }
    context.validate(order_selector.max_clusters())?;
    order_selector.validate()?;
    feature_selector.validate()?;

    split_node(data, selection, order_selector, feature_selector, context, report)
}

fn split_node<O, S, R>(
    data: ArrayView2<f64>,
    selection: &[bool],
    order_selector: &O,
    feature_selector: &S,
    context: &DivikContext,
    report: &R,
) -> Result<Option<DivideResult<O, S>>>
where
    O: OrderSelector,
    S: FeatureSelector,
    R: Reporter + ?Sized,
{
    let subset = select_rows(data, selection);
    let size = subset.nrows();

    // Too small to even try
    if size <= order_selector.max_clusters().max(context.minimal_size) {
        report.finished_for(size);
        return Ok(None);
    }

    report.filter(subset.view());
    let (fitted_selector, filtered) = feature_selector.fit_transform(subset.view())?;
    report.filtered(filtered.view());

    report.processing(filtered.view());
    report.stop_check()?;
    let clustering = order_selector.fit(filtered.view())?;

    if clustering.labels().len() != size {
        return Err(DivikError::numerical(format!(
            "order selector returned {} labels for {} rows",
            clustering.labels().len(),
            size
        )));
    }
    let partition = clustering.labels().to_vec();
    let counts = label_counts(&partition);

    // No structure found. A single distinct label would recurse on the same rows forever.
    if !clustering.fitted() || clustering.n_clusters() == 1 || counts.len() < 2 {
        report.finished_for(size);
        return Ok(None);
    }

    if counts.values().any(|&count| count <= context.rejection_size) {
        report.rejected(size);
        return Ok(None);
    }

    report.recurring(counts.len());
    drop(subset);
    drop(filtered);

    let clusters: Vec<usize> = counts.into_keys().collect();
    let recurse = |cluster: &usize| {
        let child = recursive_selection(selection, &partition, *cluster);
        split_node(data, &child, order_selector, feature_selector, context, report)
    };

    // Indexed collect keeps ascending label order whatever the scheduling
    let subregions = if context.parallel {
        clusters.par_iter().map(recurse).collect::<Result<Vec<_>>>()?
    } else {
        clusters.iter().map(recurse).collect::<Result<Vec<_>>>()?
    };

    report.assemble();
    Ok(Some(DivikResult {
        clustering,
        feature_selector: fitted_selector,
        merged: partition,
        subregions,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ndarray::{Array1, Array2, ArrayView2, Axis};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        FinishedFor(usize),
        Filter,
        Filtered,
        Processing,
        StopCheck,
        Rejected(usize),
        Recurring(usize),
        Assemble,
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
        cancel: bool,
    }

    impl Recorder {
        fn push(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Reporter for Recorder {
        fn finished_for(&self, size: usize) {
            self.push(Event::FinishedFor(size));
        }
        fn filter(&self, _subset: ArrayView2<f64>) {
            self.push(Event::Filter);
        }
        fn filtered(&self, _subset: ArrayView2<f64>) {
            self.push(Event::Filtered);
        }
        fn processing(&self, _subset: ArrayView2<f64>) {
            self.push(Event::Processing);
        }
        fn stop_check(&self) -> Result<()> {
            self.push(Event::StopCheck);
            if self.cancel { Err(DivikError::Cancelled) } else { Ok(()) }
        }
        fn rejected(&self, size: usize) {
            self.push(Event::Rejected(size));
        }
        fn recurring(&self, k: usize) {
            self.push(Event::Recurring(k));
        }
        fn assemble(&self) {
            self.push(Event::Assemble);
        }
    }

    struct Split {
        labels: Vec<usize>,
        n_clusters: usize,
    }

    impl FittedClustering for Split {
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

    // Splits at the median of the first column
    struct MedianSplit;

    impl OrderSelector for MedianSplit {
        type Model = Split;

        fn max_clusters(&self) -> usize {
            2
        }

        fn fit(&self, data: ArrayView2<f64>) -> Result<Split> {
            let mut values = data.column(0).to_vec();
            values.sort_by(f64::total_cmp);
            let median = values[values.len() / 2];
            let labels = data.column(0).iter().map(|&v| usize::from(v >= median)).collect();
            Ok(Split { labels, n_clusters: 2 })
        }
    }

    // Claims two clusters but puts every row in the same one
    struct Degenerate;

    impl OrderSelector for Degenerate {
        type Model = Split;

        fn max_clusters(&self) -> usize {
            2
        }

        fn fit(&self, data: ArrayView2<f64>) -> Result<Split> {
            Ok(Split { labels: vec![0; data.nrows()], n_clusters: 2 })
        }
    }

    // Loses the label of the last row
    struct ShortLabels;

    impl OrderSelector for ShortLabels {
        type Model = Split;

        fn max_clusters(&self) -> usize {
            2
        }

        fn fit(&self, data: ArrayView2<f64>) -> Result<Split> {
            let n = data.nrows().saturating_sub(1);
            Ok(Split { labels: (0..n).map(|i| usize::from(2 * i >= n)).collect(), n_clusters: 2 })
        }
    }

    struct Misconfigured;

    impl OrderSelector for Misconfigured {
        type Model = Split;

        fn max_clusters(&self) -> usize {
            3
        }

        fn fit(&self, data: ArrayView2<f64>) -> Result<Split> {
            MedianSplit.fit(data)
        }

        fn validate(&self) -> Result<()> {
            Err(DivikError::configuration("bad selector"))
        }
    }

    // Fitted state is the column means of the node it saw
    struct MeanCentering;

    impl FeatureSelector for MeanCentering {
        type Fitted = Array1<f64>;

        fn fit_transform(&self, data: ArrayView2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
            let means = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(data.ncols()));
            let centered = &data - &means;
            Ok((means, centered))
        }
    }

    fn line(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, 1), |(i, _)| i as f64)
    }

    fn run<O: OrderSelector>(
        selector: &O,
        data: &Array2<f64>,
        context: &DivikContext,
        report: &Recorder,
    ) -> Result<Option<DivideResult<O, MeanCentering>>> {
        let selection = vec![true; data.nrows()];
        divide(data.view(), &selection, selector, &MeanCentering, context, report)
    }

    #[test]
    fn small_node_finishes_without_fitting() {
        let report = Recorder::default();
        let result = run(&MedianSplit, &line(10), &DivikContext::new(20, 0), &report).unwrap();
        assert!(result.is_none());
        assert_eq!(report.events(), vec![Event::FinishedFor(10)]);
    }

    #[test]
    fn node_of_exactly_minimal_size_is_not_split() {
        let report = Recorder::default();
        let result = run(&MedianSplit, &line(15), &DivikContext::new(15, 0), &report).unwrap();
        assert!(result.is_none());
        assert_eq!(report.events(), vec![Event::FinishedFor(15)]);

        let report = Recorder::default();
        let result = run(&MedianSplit, &line(16), &DivikContext::new(15, 0), &report).unwrap();
        assert!(result.is_some());
        assert_eq!(report.events()[0], Event::Filter);
    }

    #[test]
    fn node_of_exactly_max_clusters_is_not_split() {
        let report = Recorder::default();
        let result = run(&MedianSplit, &line(2), &DivikContext::new(0, 0), &report).unwrap();
        assert!(result.is_none());
        assert_eq!(report.events(), vec![Event::FinishedFor(2)]);
    }

    #[test]
    fn missing_labels_are_an_error() {
        let report = Recorder::default();
        let result = run(&ShortLabels, &line(10), &DivikContext::new(2, 0), &report);
        assert!(matches!(result, Err(DivikError::Numerical(_))));
        assert!(!report.events().contains(&Event::Recurring(2)));
    }

    #[test]
    fn invalid_selector_fails_before_touching_data() {
        let report = Recorder::default();
        let result = run(&Misconfigured, &line(40), &DivikContext::new(15, 0), &report);
        assert!(matches!(result, Err(DivikError::Configuration(_))));
        assert!(report.events().is_empty());
    }

    #[test]
    fn splits_until_nodes_are_small() {
        let report = Recorder::default();
        let tree = run(&MedianSplit, &line(40), &DivikContext::new(15, 0), &report).unwrap().unwrap();

        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.n_leaves(), 4);
        assert_eq!(tree.merged.len(), 40);
        assert_eq!(tree.subregions.len(), 2);

        let events = report.events();
        assert_eq!(
            events[..5],
            [Event::Filter, Event::Filtered, Event::Processing, Event::StopCheck, Event::Recurring(2)]
        );
        assert_eq!(events.last(), Some(&Event::Assemble));
        let finished: usize = events
            .iter()
            .filter_map(|e| if let Event::FinishedFor(size) = e { Some(*size) } else { None })
            .sum();
        assert_eq!(finished, 40);
    }

    #[test]
    fn leaves_partition_the_rows() {
        let report = Recorder::default();
        let data = line(40);
        let tree = run(&MedianSplit, &data, &DivikContext::new(15, 0), &report).unwrap().unwrap();
        let leaves = tree.leaves(&vec![true; 40]);

        assert_eq!(leaves.len(), 4);
        for row in 0..40 {
            assert_eq!(leaves.iter().filter(|leaf| leaf.selection[row]).count(), 1);
        }
        assert_eq!(leaves[0].path, vec![0, 0]);
        assert_eq!(leaves[3].path, vec![1, 1]);
        assert!(leaves[0].selection[..10].iter().all(|&s| s));
    }

    #[test]
    fn every_node_keeps_its_own_selector_state() {
        let report = Recorder::default();
        let tree = run(&MedianSplit, &line(40), &DivikContext::new(15, 0), &report).unwrap().unwrap();
        let lower = tree.subregions[0].as_ref().unwrap();
        let upper = tree.subregions[1].as_ref().unwrap();

        assert_eq!(tree.feature_selector[0], 19.5);
        assert_eq!(lower.feature_selector[0], 9.5);
        assert_eq!(upper.feature_selector[0], 29.5);
    }

    #[test]
    fn small_subcluster_rejects_the_split() {
        let report = Recorder::default();
        let result = run(&MedianSplit, &line(40), &DivikContext::new(15, 20), &report).unwrap();
        assert!(result.is_none());
        assert_eq!(report.events().last(), Some(&Event::Rejected(40)));
    }

    #[test]
    fn single_distinct_label_ends_the_branch() {
        let report = Recorder::default();
        let result = run(&Degenerate, &line(40), &DivikContext::new(15, 0), &report).unwrap();
        assert!(result.is_none());
        assert_eq!(report.events().last(), Some(&Event::FinishedFor(40)));
    }

    #[test]
    fn cancellation_aborts_the_whole_run() {
        let report = Recorder { cancel: true, ..Default::default() };
        let result = run(&MedianSplit, &line(40), &DivikContext::new(15, 0), &report);
        assert!(matches!(result, Err(DivikError::Cancelled)));
        assert!(!report.events().contains(&Event::Recurring(2)));
    }

    #[test]
    fn parallel_branches_keep_label_order() {
        let data = line(64);
        let sequential = run(&MedianSplit, &data, &DivikContext::new(7, 0), &Recorder::default())
            .unwrap()
            .unwrap();
        let parallel = run(&MedianSplit, &data, &DivikContext::new(7, 0).with_parallel(true), &Recorder::default())
            .unwrap()
            .unwrap();

        assert_eq!(sequential.summary(), parallel.summary());
        assert_eq!(sequential.leaves(&vec![true; 64]), parallel.leaves(&vec![true; 64]));
    }

    #[test]
    fn mask_must_match_the_data() {
        let report = Recorder::default();
        let data = line(5);
        let result = divide(data.view(), &[true; 3], &MedianSplit, &MeanCentering, &DivikContext::default(), &report);
        assert!(matches!(result, Err(DivikError::Configuration(_))));
    }
}
