//! Partition statistics used by the recursion and the order selectors

use std::collections::BTreeMap;

use ndarray::ArrayView2;

/// Count the occurrences of every label
///
/// # Returns
/// * Map of label -> population, iterated in ascending label order
pub fn label_counts(labels: &[usize]) -> BTreeMap<usize, usize> {
    labels.iter().fold(BTreeMap::new(), |mut acc, &label| {
        *acc.entry(label).or_insert(0) += 1;
        acc
    })
}

/// Per-feature (min, max) of the rows, the bounding box reference samples are drawn from
pub fn feature_bounds(data: ArrayView2<f64>) -> Vec<(f64, f64)> {
    data.columns()
        .into_iter()
        .map(|column| {
            column.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
        })
        .collect()
}

/// Percentile with linear interpolation between closest ranks
///
/// `q` is in [0, 100]. Returns `None` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn counts_are_ordered_by_label() {
        let counts = label_counts(&[2, 0, 2, 1, 2]);
        assert_eq!(counts.into_iter().collect::<Vec<_>>(), vec![(0, 1), (1, 1), (2, 3)]);
    }

    #[test]
    fn percentile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 100.0), Some(4.0));
        assert_eq!(percentile(&values, 50.0), Some(2.5));
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn bounds_per_column() {
        let data = array![[1.0, -2.0], [3.0, 5.0], [2.0, 0.0]];
        assert_eq!(feature_bounds(data.view()), vec![(1.0, 3.0), (-2.0, 5.0)]);
    }
}
