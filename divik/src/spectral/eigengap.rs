//! Normalized graph Laplacian and eigengap estimation of the number of clusters

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView2};

use crate::error::{DivikError, Result};

/// Iteration budget and tolerance of the symmetric eigensolver
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EigenSolver {
    pub max_iter: usize,
    /// Convergence tolerance; `0.0` means machine precision
    pub tol: f64,
}

impl Default for EigenSolver {
    fn default() -> Self {
        Self { max_iter: 5000, tol: 0.0 }
    }
}

/// Eigenvalues in ascending order with their eigenvectors as matching columns
#[derive(Clone, Debug)]
pub struct Eigenpairs {
    pub values: Vec<f64>,
    pub vectors: Array2<f64>,
}

impl EigenSolver {
    /// Decompose a symmetric matrix
    ///
    /// # Errors
    /// * `Numerical` when the solver does not converge within `max_iter`
    ///   sweeps or returns non-finite eigenvalues
    pub fn decompose(&self, matrix: ArrayView2<f64>) -> Result<Eigenpairs> {
        let n = matrix.nrows();
        let dense = DMatrix::from_fn(n, n, |i, j| matrix[[i, j]]);
        let eps = if self.tol > 0.0 { self.tol } else { f64::EPSILON };

        // nalgebra treats 0 as "no limit"; keep the budget bounded
        let eig = SymmetricEigen::try_new(dense, eps, self.max_iter.max(1)).ok_or_else(|| {
            DivikError::numerical(format!(
                "symmetric eigensolver did not converge within {} iterations",
                self.max_iter
            ))
        })?;

        if eig.eigenvalues.iter().any(|v| !v.is_finite()) {
            return Err(DivikError::numerical("eigensolver produced non-finite eigenvalues"));
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

        let values = order.iter().map(|&i| eig.eigenvalues[i]).collect();
        let vectors = Array2::from_shape_fn((n, n), |(row, col)| eig.eigenvectors[(row, order[col])]);
        Ok(Eigenpairs { values, vectors })
    }
}

/// Normalized graph Laplacian `I - D^-1/2 A D^-1/2`
///
/// The diagonal of the affinity is ignored. Isolated vertices (zero degree)
/// get a zero row, column and diagonal entry.
///
/// # Returns
/// * Tuple of (Laplacian, square root of every vertex degree)
pub fn normalized_laplacian(affinity: ArrayView2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    check_affinity(affinity)?;
    let n = affinity.nrows();

    let degree_sqrt: Array1<f64> = Array1::from_shape_fn(n, |i| {
        let degree: f64 = (0..n).filter(|&j| j != i).map(|j| affinity[[i, j]]).sum();
        degree.sqrt()
    });

    let laplacian = Array2::from_shape_fn((n, n), |(i, j)| {
        let (di, dj) = (degree_sqrt[i], degree_sqrt[j]);
        if i == j {
            if di > 0.0 { 1.0 } else { 0.0 }
        } else if di > 0.0 && dj > 0.0 {
            -affinity[[i, j]] / (di * dj)
        } else {
            0.0
        }
    });

    Ok((laplacian, degree_sqrt))
}

fn check_affinity(affinity: ArrayView2<f64>) -> Result<()> {
    let (rows, cols) = affinity.dim();
    if rows != cols {
        return Err(DivikError::configuration(format!("affinity must be square, got {rows}x{cols}")));
    }
    if rows == 0 {
        return Err(DivikError::configuration("affinity matrix is empty"));
    }
    for i in 0..rows {
        for j in (i + 1)..cols {
            let (a, b) = (affinity[[i, j]], affinity[[j, i]]);
            if !a.is_finite() || a < 0.0 {
                return Err(DivikError::numerical(format!("affinity ({i}, {j}) = {a} is not a finite non-negative value")));
            }
            if (a - b).abs() > 1e-10 * a.abs().max(b.abs()).max(1.0) {
                return Err(DivikError::numerical(format!("affinity is not symmetric at ({i}, {j})")));
            }
        }
    }
    Ok(())
}

/// Index of the largest forward difference plus one; the first maximum wins ties
pub fn largest_gap(sorted_eigenvalues: &[f64]) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for (i, pair) in sorted_eigenvalues.windows(2).enumerate() {
        let gap = pair[1] - pair[0];
        if best.is_none_or(|(_, b)| gap > b) {
            best = Some((i, gap));
        }
    }
    best.map_or(1, |(i, _)| i + 1)
}

/// Find number of clusters using eigengap
///
/// Computes the full spectrum of the normalized Laplacian of `affinity` and
/// returns the position of the largest consecutive eigenvalue gap.
///
/// # Arguments
/// * `affinity` - Symmetric non-negative matrix, shape (n_samples, n_samples)
/// * `solver` - Iteration budget of the eigensolver
///
/// # Returns
/// * Number of clusters, at least 1
pub fn eigengap(affinity: ArrayView2<f64>, solver: &EigenSolver) -> Result<usize> {
    let (laplacian, _) = normalized_laplacian(affinity)?;
    let spectrum = solver.decompose(laplacian.view())?;
    Ok(largest_gap(&spectrum.values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn block_diagonal(blocks: usize, size: usize) -> Array2<f64> {
        let n = blocks * size;
        Array2::from_shape_fn((n, n), |(i, j)| if i / size == j / size { 1.0 } else { 0.0 })
    }

    #[test]
    fn three_blocks_give_three_clusters() {
        let affinity = block_diagonal(3, 10);
        assert_eq!(eigengap(affinity.view(), &EigenSolver::default()).unwrap(), 3);
    }

    #[test]
    fn estimate_is_deterministic() {
        let affinity = block_diagonal(4, 5);
        let solver = EigenSolver::default();
        let first = eigengap(affinity.view(), &solver).unwrap();
        for _ in 0..5 {
            assert_eq!(eigengap(affinity.view(), &solver).unwrap(), first);
        }
        assert_eq!(first, 4);
    }

    #[test]
    fn laplacian_of_a_block_is_known() {
        let (laplacian, degree_sqrt) = normalized_laplacian(block_diagonal(1, 3).view()).unwrap();
        assert!((degree_sqrt[0] - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(laplacian[[0, 0]], 1.0);
        assert!((laplacian[[0, 1]] + 0.5).abs() < 1e-12);
        let spectrum = EigenSolver::default().decompose(laplacian.view()).unwrap();
        assert!(spectrum.values[0].abs() < 1e-12);
        assert!((spectrum.values[1] - 1.5).abs() < 1e-12);
        assert!((spectrum.values[2] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn ties_resolve_to_the_first_gap() {
        assert_eq!(largest_gap(&[0.0, 1.0, 2.0, 3.0]), 1);
        assert_eq!(largest_gap(&[0.0, 0.1, 1.1, 1.2]), 2);
        assert_eq!(largest_gap(&[0.5]), 1);
    }

    #[test]
    fn single_sample_is_one_cluster() {
        assert_eq!(eigengap(array![[1.0]].view(), &EigenSolver::default()).unwrap(), 1);
    }

    #[test]
    fn rejects_malformed_affinity() {
        let solver = EigenSolver::default();
        let asymmetric = array![[0.0, 1.0], [0.5, 0.0]];
        assert!(matches!(eigengap(asymmetric.view(), &solver), Err(DivikError::Numerical(_))));
        let rectangular = Array2::<f64>::zeros((2, 3));
        assert!(matches!(eigengap(rectangular.view(), &solver), Err(DivikError::Configuration(_))));
    }

    #[test]
    fn exhausted_iteration_budget_is_a_numerical_error() {
        let path = Array2::from_shape_fn((8, 8), |(i, j)| {
            if i.abs_diff(j) == 1 { 1.0 + (i + j) as f64 * 0.1 } else { 0.0 }
        });
        let (laplacian, _) = normalized_laplacian(path.view()).unwrap();
        let starved = EigenSolver { max_iter: 1, tol: 0.0 };
        assert!(matches!(starved.decompose(laplacian.view()), Err(DivikError::Numerical(_))));
        assert!(matches!(eigengap(path.view(), &starved), Err(DivikError::Numerical(_))));
        assert!(EigenSolver::default().decompose(laplacian.view()).is_ok());
    }

    #[test]
    fn isolated_vertex_keeps_zero_row() {
        let affinity = array![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        let (laplacian, degree_sqrt) = normalized_laplacian(affinity.view()).unwrap();
        assert_eq!(degree_sqrt[2], 0.0);
        assert_eq!(laplacian.row(2).to_vec(), vec![0.0, 0.0, 0.0]);
    }
}
