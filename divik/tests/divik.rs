use divik::{
    AutoSpectralClustering, CancellationToken, DataCollection, Divik, DivikContext, DivikError, GapSearch,
    LoggingReporter, NoSelector, NoopReporter, VarianceSelector,
};
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};

// 5 blobs of 20 points in 2D, centers on a coarse grid
fn five_blobs() -> Array2<f64> {
    let centers = [(0.0, 0.0), (20.0, 0.0), (0.0, 20.0), (20.0, 20.0), (40.0, 40.0)];
    let mut rng = ChaCha20Rng::seed_from_u64(2024);
    let noise = Normal::new(0.0, 0.5).unwrap();
    let mut data = Array2::zeros((100, 2));
    for (b, (x, y)) in centers.iter().enumerate() {
        for i in 0..20 {
            data[[b * 20 + i, 0]] = x + noise.sample(&mut rng);
            data[[b * 20 + i, 1]] = y + noise.sample(&mut rng);
        }
    }
    data
}

fn gap_divik() -> Divik<GapSearch, NoSelector> {
    let selector = GapSearch { n_init: 5, ..Default::default() };
    Divik::new(selector, NoSelector, DivikContext::new(5, 2))
}

#[test]
fn gap_tree_partitions_every_row() {
    let data = five_blobs();
    let fit = gap_divik().fit(data.view(), &NoopReporter).unwrap();

    assert_eq!(fit.labels.len(), 100);
    assert_eq!(fit.paths.len(), fit.n_clusters);
    assert!(fit.labels.iter().all(|&l| l < fit.n_clusters));
    assert!(fit.n_clusters >= 2);

    let tree = fit.tree.as_ref().unwrap();
    assert_eq!(tree.n_leaves(), fit.n_clusters);
    assert_eq!(tree.depth(), fit.depth);

    let leaves = tree.leaves(&vec![true; 100]);
    for row in 0..100 {
        assert_eq!(leaves.iter().filter(|leaf| leaf.selection[row]).count(), 1);
    }
}

#[test]
fn separated_blobs_never_share_a_label() {
    let data = five_blobs();
    let fit = gap_divik().fit(data.view(), &NoopReporter).unwrap();
    let blob_label = |b: usize| fit.labels[b * 20];
    for a in 0..5 {
        for b in (a + 1)..5 {
            assert_ne!(blob_label(a), blob_label(b), "blobs {a} and {b} merged");
        }
    }
}

#[test]
fn spectral_tree_with_variance_filter() {
    let data = five_blobs();
    let divik = Divik::new(
        AutoSpectralClustering::default(),
        VarianceSelector { percentile: 0.0 },
        DivikContext::new(10, 2),
    );
    let fit = divik.fit(data.view(), &NoopReporter).unwrap();
    assert_eq!(fit.labels.len(), 100);
    assert!(fit.n_clusters >= 2);

    let summary = fit.tree.unwrap().summary();
    assert_eq!(summary.sizes.iter().sum::<usize>(), 100);
    let json = serde_json::to_string(&summary).unwrap();
    assert!(json.contains("\"sizes\""));
}

#[test]
fn tiny_dataset_is_one_cluster() {
    let data = DataCollection::from_vec(&[vec![1.0, 2.0], vec![2.0, 1.0], vec![3.0, 3.0]], false).unwrap();
    let fit = gap_divik().fit(data.data.view(), &NoopReporter).unwrap();
    assert!(fit.tree.is_none());
    assert_eq!(fit.labels, vec![0, 0, 0]);
    assert_eq!(fit.depth, 0);
    assert_eq!(fit.n_clusters, 1);
}

#[test]
fn cancelled_token_stops_the_run() {
    let data = five_blobs();
    let token = CancellationToken::new();
    token.cancel();
    let reporter = LoggingReporter::with_token(100, token);
    let result = gap_divik().fit(data.view(), &reporter);
    assert!(matches!(result, Err(DivikError::Cancelled)));
}

#[test]
fn invalid_configuration_fails_before_fitting() {
    let data = five_blobs();
    let divik = Divik::new(GapSearch { max_clusters: 1, ..Default::default() }, NoSelector, DivikContext::default());
    assert!(matches!(divik.fit(data.view(), &NoopReporter), Err(DivikError::Configuration(_))));

    let empty = Array2::<f64>::zeros((0, 2));
    assert!(matches!(gap_divik().fit(empty.view(), &NoopReporter), Err(DivikError::Configuration(_))));
}
