use ndarray::{Array2, Axis};

use crate::error::{DivikError, Result};

/// Dense dataset, one sample per row.
#[derive(Clone, Debug, PartialEq)]
pub struct DataCollection {
    pub data: Array2<f64>,
}

impl DataCollection {
    /// Wrap an existing matrix after checking it can be clustered
    pub fn new(data: Array2<f64>, normal: bool) -> Result<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(DivikError::configuration(format!(
                "dataset must be non-empty, got shape {:?}",
                data.dim()
            )));
        }
        if let Some(((row, col), value)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(DivikError::configuration(format!(
                "dataset contains non-finite value {value} at ({row}, {col})"
            )));
        }

        let data = if normal { rms_normalize(data) } else { data };
        Ok(Self { data })
    }

    /// Build from row vectors; all rows must have the same length
    pub fn from_vec(rows: &[Vec<f64>], normal: bool) -> Result<Self> {
        let n_features = rows.first().map_or(0, Vec::len);
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_features) {
            return Err(DivikError::configuration(format!(
                "row {idx} has {} features, expected {n_features}",
                row.len()
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((rows.len(), n_features), flat)
            .map_err(|e| DivikError::configuration(e.to_string()))?;
        Self::new(data, normal)
    }

    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }
}

// Scale every row to unit root mean square; all-zero rows stay as they are.
fn rms_normalize(mut data: Array2<f64>) -> Array2<f64> {
    for mut row in data.axis_iter_mut(Axis(0)) {
        let rms = (row.iter().map(|v| v * v).sum::<f64>() / row.len() as f64).sqrt();
        if rms > 0.0 {
            row.mapv_inplace(|v| v / rms);
        }
    }
    data
}
