//! Dense and sparse linear system solvers shared by the iteration controller.

use faer::prelude::*;
use faer::sparse::{SparseColMat, Triplet};
use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Systems with this many or more unknowns use the sparse solver path.
pub const SPARSE_THRESHOLD: usize = 50;

/// Solve a dense linear system `Ax = b` by LU decomposition.
pub fn solve_dense(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    if a.nrows() != a.ncols() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: a.ncols(),
        });
    }
    if a.nrows() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: b.len(),
        });
    }

    a.clone().lu().solve(b).ok_or(Error::SingularMatrix)
}

/// Solve a sparse linear system `Ax = b` assembled from `(row, col, value)`
/// triplets. Duplicate entries at the same position are summed by faer,
/// which is how repeated device stamps at a shared matrix handle compose.
pub fn solve_sparse(
    size: usize,
    triplets: &[(usize, usize, f64)],
    rhs: &DVector<f64>,
) -> Result<DVector<f64>> {
    if size != rhs.len() {
        return Err(Error::DimensionMismatch {
            expected: size,
            actual: rhs.len(),
        });
    }

    let faer_triplets: Vec<_> = triplets.iter().map(|&(r, c, v)| Triplet::new(r, c, v)).collect();

    let sparse_mat = SparseColMat::<usize, f64>::try_new_from_triplets(size, size, &faer_triplets)
        .map_err(|_| Error::SingularMatrix)?;

    let lu = sparse_mat.sp_lu().map_err(|_| Error::SingularMatrix)?;

    let faer_rhs = Col::<f64>::from_fn(size, |i| rhs[i]);
    let faer_x = lu.solve(&faer_rhs);

    Ok(DVector::from_fn(size, |i, _| faer_x[i]))
}

/// A sparse LU solver wrapper that reuses the assembled size across calls.
///
/// Topology (which `(row, col)` pairs are nonzero) is fixed once a circuit's
/// devices finish `Setup`; only the stamped values change between Newton
/// iterations and accepted timesteps. This keeps the size around so callers
/// don't need to thread it separately, and is the natural place to grow a
/// genuine symbolic-factorization cache if that becomes the bottleneck.
pub struct CachedSparseLu {
    size: usize,
}

impl CachedSparseLu {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn solve(&self, triplets: &[(usize, usize, f64)], rhs: &DVector<f64>) -> Result<DVector<f64>> {
        solve_sparse(self.size, triplets, rhs)
    }
}
