//! Input loading: a JSON array of numeric rows or a CSV file of numbers

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use ndarray::Array2;
use serde_json::Value;

/// Load a dense matrix, choosing the format by file extension
///
/// # Arguments
/// * `path` - `.json` file holding `[[f64, ...], ...]` or a `.csv` file
///
/// # Returns
/// * Rows of the file as a (n_samples, n_features) matrix
pub async fn load_data(path: &Path) -> Result<Array2<f64>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;

    let rows = match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("json") => parse_json(&contents)?,
        Some("csv") => parse_csv(&contents)?,
        _ => bail!("unsupported input format: {}", path.display()),
    };
    to_matrix(rows)
}

pub fn parse_json(contents: &str) -> Result<Vec<Vec<f64>>> {
    let value: Value = serde_json::from_str(contents).context("input is not valid JSON")?;
    let Value::Array(rows) = value else {
        bail!("JSON input must be an array of rows");
    };

    rows.iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Array(values) => values
                .iter()
                .map(|v| v.as_f64().ok_or_else(|| anyhow!("row {i}: {v} is not a number")))
                .collect(),
            _ => Err(anyhow!("row {i} is not an array")),
        })
        .collect()
}

/// Parse comma separated numbers; a first line that is not numeric is taken as a header.
pub fn parse_csv(contents: &str) -> Result<Vec<Vec<f64>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("malformed CSV record {i}"))?;
        let parsed: std::result::Result<Vec<f64>, _> = record.iter().map(str::parse::<f64>).collect();
        match parsed {
            Ok(row) => rows.push(row),
            Err(_) if i == 0 => continue,
            Err(e) => bail!("CSV record {i}: {e}"),
        }
    }
    Ok(rows)
}

fn to_matrix(rows: Vec<Vec<f64>>) -> Result<Array2<f64>> {
    let n_features = rows.first().map(Vec::len).ok_or_else(|| anyhow!("input has no rows"))?;
    if let Some(i) = rows.iter().position(|row| row.len() != n_features) {
        bail!("row {i} has {} values, expected {n_features}", rows[i].len());
    }
    let n_samples = rows.len();
    Array2::from_shape_vec((n_samples, n_features), rows.into_iter().flatten().collect())
        .context("cannot shape input rows into a matrix")
}
