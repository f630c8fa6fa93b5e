//! Linear solvers for the Newton tangent systems.
use crate::nalgebra::{DMatrix, DVector, DVectorView};
use crate::Real;
use nalgebra_sparse::CsrMatrix;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinearSolveError {
    /// The matrix is (numerically) singular.
    Singular,
    /// The matrix is not square or does not match the length of the right-hand side.
    DimensionMismatch {
        nrows: usize,
        ncols: usize,
        rhs_len: usize,
    },
}

impl Display for LinearSolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinearSolveError::Singular => write!(f, "Linear system matrix is singular."),
            LinearSolveError::DimensionMismatch { nrows, ncols, rhs_len } => write!(
                f,
                "Dimension mismatch: {}x{} matrix with right-hand side of length {}.",
                nrows, ncols, rhs_len
            ),
        }
    }
}

impl Error for LinearSolveError {}

/// Solves linear systems `A x = b` with a sparse system matrix.
pub trait LinearSolver<T: Real> {
    fn solve(&mut self, matrix: &CsrMatrix<T>, rhs: &DVectorView<T>) -> Result<DVector<T>, LinearSolveError>;
}

/// Direct solver using a dense LU decomposition with partial pivoting.
///
/// The sparse matrix is converted to a dense matrix, so this is only practical for small problems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DenseLuSolver;

impl<T: Real> LinearSolver<T> for DenseLuSolver {
    fn solve(&mut self, matrix: &CsrMatrix<T>, rhs: &DVectorView<T>) -> Result<DVector<T>, LinearSolveError> {
        if matrix.nrows() != matrix.ncols() || matrix.nrows() != rhs.len() {
            return Err(LinearSolveError::DimensionMismatch {
                nrows: matrix.nrows(),
                ncols: matrix.ncols(),
                rhs_len: rhs.len(),
            });
        }
        let dense = DMatrix::from(matrix);
        let solution = dense
            .lu()
            .solve(rhs)
            .ok_or(LinearSolveError::Singular)?;
        if solution.iter().all(|x| x.is_finite()) {
            Ok(solution)
        } else {
            Err(LinearSolveError::Singular)
        }
    }
}
