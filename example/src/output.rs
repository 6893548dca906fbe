//! Result writers: flat labels as CSV and the tree summary as JSON

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::algorythm::Outcome;

/// Write one line per row: `row;cluster;path`
///
/// The path is the label of every split from the root, joined with `/`.
pub async fn write_labels(outcome: &Outcome, project_folder: &Path, table: &str) -> Result<()> {
    let mut result = String::from("row;cluster;path\n");
    for (row, &cluster) in outcome.labels.iter().enumerate() {
        let path = outcome.paths[cluster].iter().map(usize::to_string).collect::<Vec<_>>().join("/");
        result.push_str(&format!("{row};{cluster};{path}\n"));
    }

    let file_path = project_folder.join(format!("{table}.csv"));
    write_file(&file_path, result.as_bytes()).await
}

/// Write the model-free tree with run metadata
pub async fn write_tree(outcome: &Outcome, project_folder: &Path, table: &str, time: i64) -> Result<()> {
    let document = json!({
        "time": time,
        "n_clusters": outcome.n_clusters,
        "depth": outcome.depth,
        "paths": outcome.paths,
        "tree": outcome.tree,
    });
    let contents = serde_json::to_vec_pretty(&document).context("cannot serialize the tree")?;

    let file_path = project_folder.join(format!("{table}.json"));
    write_file(&file_path, &contents).await
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let data_file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("cannot create {}", path.display()))?;
    let mut data_file = BufWriter::new(data_file);
    data_file.write_all(contents).await?;
    data_file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use divik::TreeSummary;

    fn outcome() -> Outcome {
        Outcome {
            labels: vec![0, 1, 1, 0],
            paths: vec![vec![0], vec![1, 0]],
            depth: 2,
            n_clusters: 2,
            tree: Some(TreeSummary { n_clusters: 2, sizes: vec![2, 2], subregions: vec![None, None] }),
        }
    }

    #[tokio::test]
    async fn labels_file_lists_every_row() {
        let dir = tempfile::tempdir().unwrap();
        write_labels(&outcome(), dir.path(), "labels").await.unwrap();
        let written = tokio::fs::read_to_string(dir.path().join("labels.csv")).await.unwrap();
        assert_eq!(written, "row;cluster;path\n0;0;0\n1;1;1/0\n2;1;1/0\n3;0;0\n");
    }

    #[tokio::test]
    async fn tree_file_round_trips_the_summary() {
        let dir = tempfile::tempdir().unwrap();
        write_tree(&outcome(), dir.path(), "tree", 1_700_000_000).await.unwrap();
        let written = tokio::fs::read_to_string(dir.path().join("tree.json")).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["n_clusters"], 2);
        let tree: TreeSummary = serde_json::from_value(value["tree"].clone()).unwrap();
        assert_eq!(tree, outcome().tree.unwrap());
    }
}
