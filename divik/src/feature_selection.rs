//! Feature filters applied at every node before clustering
//!
//! Each selector is plain configuration. `fit_transform` computes the
//! statistics of the node it is given and returns them as a [`SelectedFeatures`]
//! value owned by that node.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::{
    data_type::traits::FeatureSelector,
    error::{DivikError, Result},
    metrics::percentile,
};

/// Fitted state of a feature selector: which columns survived and why.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedFeatures {
    pub selected: Vec<bool>,
    /// Variance cut applied at this node, if any
    pub variance_threshold: Option<f64>,
    /// Mean-abundance cut applied at this node, if any
    pub abundance_threshold: Option<f64>,
}

impl SelectedFeatures {
    fn all(n_features: usize) -> Self {
        Self { selected: vec![true; n_features], variance_threshold: None, abundance_threshold: None }
    }

    pub fn n_selected(&self) -> usize {
        self.selected.iter().filter(|&&s| s).count()
    }

    /// Keep the selected columns of `data`
    pub fn transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        if data.ncols() != self.selected.len() {
            return Err(DivikError::configuration(format!(
                "selector fitted on {} features, got {}",
                self.selected.len(),
                data.ncols()
            )));
        }
        let columns: Vec<usize> = self
            .selected
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();
        Ok(data.select(Axis(1), &columns))
    }
}

/// Pass-through selector
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSelector;

impl FeatureSelector for NoSelector {
    type Fitted = SelectedFeatures;

    fn fit_transform(&self, data: ArrayView2<f64>) -> Result<(SelectedFeatures, Array2<f64>)> {
        Ok((SelectedFeatures::all(data.ncols()), data.to_owned()))
    }
}

/// Keeps the features whose variance reaches the given percentile of all feature variances.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VarianceSelector {
    pub percentile: f64,
}

impl Default for VarianceSelector {
    fn default() -> Self {
        Self { percentile: 20.0 }
    }
}

impl FeatureSelector for VarianceSelector {
    type Fitted = SelectedFeatures;

    fn fit_transform(&self, data: ArrayView2<f64>) -> Result<(SelectedFeatures, Array2<f64>)> {
        let mut fitted = SelectedFeatures::all(data.ncols());
        fitted.variance_threshold =
            keep_above_percentile(&mut fitted.selected, &column_stat(data, variance), self.percentile);
        let transformed = fitted.transform(data)?;
        Ok((fitted, transformed))
    }

    fn validate(&self) -> Result<()> {
        check_percentile("variance", self.percentile)
    }
}

/// Drops low-abundance features first, then applies the variance filter to the rest.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HighAbundanceAndVarianceSelector {
    pub abundance_percentile: f64,
    pub variance_percentile: f64,
}

impl Default for HighAbundanceAndVarianceSelector {
    fn default() -> Self {
        Self { abundance_percentile: 10.0, variance_percentile: 20.0 }
    }
}

impl FeatureSelector for HighAbundanceAndVarianceSelector {
    type Fitted = SelectedFeatures;

    fn fit_transform(&self, data: ArrayView2<f64>) -> Result<(SelectedFeatures, Array2<f64>)> {
        let mut fitted = SelectedFeatures::all(data.ncols());
        fitted.abundance_threshold =
            keep_above_percentile(&mut fitted.selected, &column_stat(data, mean), self.abundance_percentile);
        fitted.variance_threshold =
            keep_above_percentile(&mut fitted.selected, &column_stat(data, variance), self.variance_percentile);
        let transformed = fitted.transform(data)?;
        Ok((fitted, transformed))
    }

    fn validate(&self) -> Result<()> {
        check_percentile("abundance", self.abundance_percentile)?;
        check_percentile("variance", self.variance_percentile)
    }
}

fn check_percentile(name: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(DivikError::configuration(format!(
            "{name} percentile must be within [0, 100], got {value}"
        )));
    }
    Ok(())
}

fn column_stat(data: ArrayView2<f64>, stat: fn(ArrayView1<f64>) -> f64) -> Vec<f64> {
    data.columns().into_iter().map(stat).collect()
}

fn mean(column: ArrayView1<f64>) -> f64 {
    column.mean().unwrap_or(0.0)
}

fn variance(column: ArrayView1<f64>) -> f64 {
    if column.is_empty() {
        return 0.0;
    }
    column.var(0.0)
}

// Narrows `selected` to the still-selected features whose statistic reaches the
// percentile computed over the still-selected ones. Returns the threshold used.
fn keep_above_percentile(selected: &mut [bool], stats: &[f64], q: f64) -> Option<f64> {
    let candidates: Vec<f64> = selected
        .iter()
        .zip(stats.iter())
        .filter_map(|(&keep, &s)| keep.then_some(s))
        .collect();
    let threshold = percentile(&candidates, q)?;
    selected
        .iter_mut()
        .zip(stats.iter())
        .for_each(|(keep, &s)| *keep = *keep && s >= threshold);
    Some(threshold)
}
