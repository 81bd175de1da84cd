//! Dense linear solver based on Gaussian elimination with partial pivoting.
//!
//! The elimination is kept as a factorization ([`PivotedLu`]) so that one matrix can be
//! solved against several right-hand sides without repeating the \(O(n^3)\) part.
//! Solving a single system with [`solve`] is the same as eliminating the augmented matrix \([A \mid b]\).

use itertools::Itertools;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector, MatrixXx2};

use crate::Float;
use crate::error::{Result, TpsError};

/// Smallest system for which the two substitutions of [`PivotedLu::solve_columns`] run on separate threads.
#[cfg(feature = "parallel")]
const PARALLEL_MIN_DIM: usize = 256;

/// Solve \(A x = b\) for a square matrix `a`.
///
/// Both inputs are consumed, so the caller's values are never observed to change.
///
/// # Errors
/// - [`TpsError::DimensionMismatch`] if `a` is not square or `b` does not match its size.
/// - [`TpsError::SingularMatrix`] if a column has no usable pivot or the solution is not finite.
///
/// # Example:
/// ```
/// # use nalgebra::{dmatrix, dvector};
/// let a = dmatrix![2f64, 1.; 1., 3.];
/// let b = dvector![3., 5.];
/// let x = tpsrs::solve(a, b).unwrap();
/// assert!((x[0] - 0.8).abs() < 1e-12 && (x[1] - 1.4).abs() < 1e-12);
/// ```
pub fn solve<F: Float>(a: DMatrix<F>, b: DVector<F>) -> Result<DVector<F>> {
    PivotedLu::factor(a)?.solve(&b)
}

/// Row-pivoted LU factorization \(P A = L U\) produced by Gaussian elimination.
#[derive(Clone, Debug)]
pub struct PivotedLu<F: Float> {
    /// `U` in the upper triangle, the elimination multipliers of `L` below the diagonal.
    lu: DMatrix<F>,
    /// Row swapped into position `i` at elimination step `i`.
    pivots: Vec<usize>,
}

impl<F: Float> PivotedLu<F> {
    /// Factor `a` using the default pivot tolerance.
    ///
    /// A pivot taken from row `r` of `a` for column `k` is treated as zero if its magnitude does not exceed
    /// \(n \varepsilon \min(\max_j |a_{rj}|, \max_i |a_{ik}|)\).
    /// Both maxima are taken over the original matrix, so equations and unknowns of very different
    /// magnitude are each measured on their own scale.
    pub fn factor(a: DMatrix<F>) -> Result<Self> {
        let eps = F::default_epsilon() * nalgebra::convert::<f64, F>(a.nrows() as f64);
        let row_scale = a.row_iter().map(|row| max_magnitude(row.iter().copied())).collect_vec();
        let column_scale = a.column_iter().map(|col| max_magnitude(col.iter().copied())).collect_vec();

        Self::eliminate(a, |row, column| eps * row_scale[row].min(column_scale[column]))
    }

    /// Factor `a`, treating every pivot with magnitude `<= tolerance` as zero.
    pub fn factor_with_tolerance(a: DMatrix<F>, tolerance: F) -> Result<Self> {
        Self::eliminate(a, |_, _| tolerance)
    }

    /// Gaussian elimination with partial pivoting.
    ///
    /// `tolerance` receives the original row index of the pivot and its column.
    fn eliminate(mut a: DMatrix<F>, tolerance: impl Fn(usize, usize) -> F) -> Result<Self> {
        let (n, cols) = a.shape();
        if n != cols {
            return Err(TpsError::DimensionMismatch {
                expected: n,
                actual: cols,
            });
        }

        let mut pivots = Vec::with_capacity(n);
        let mut origin = (0..n).collect_vec();
        for i in 0..n {
            let (pivot_row, magnitude) = (i..n)
                .map(|row| (row, a[(row, i)].abs()))
                .fold((i, F::zero()), |best, candidate| {
                    if candidate.1 > best.1 { candidate } else { best }
                });

            if magnitude <= tolerance(origin[pivot_row], i) {
                warn!("No usable pivot in column {i} (largest magnitude {magnitude}).");
                return Err(TpsError::SingularMatrix { column: i });
            }

            if pivot_row != i {
                a.swap_rows(i, pivot_row);
                origin.swap(i, pivot_row);
            }
            pivots.push(pivot_row);

            let pivot = a[(i, i)];
            for k in (i + 1)..n {
                let factor = a[(k, i)] / pivot;
                a[(k, i)] = factor;
                for j in (i + 1)..n {
                    let upper = a[(i, j)];
                    a[(k, j)] -= factor * upper;
                }
            }
        }

        debug!("Factored {n}x{n} matrix.");
        Ok(Self { lu: a, pivots })
    }

    /// Size of the factored matrix.
    pub fn dim(&self) -> usize {
        self.pivots.len()
    }

    /// Solve \(A x = b\) against the stored factors.
    pub fn solve(&self, b: &DVector<F>) -> Result<DVector<F>> {
        let n = self.dim();
        if b.len() != n {
            return Err(TpsError::DimensionMismatch {
                expected: n,
                actual: b.len(),
            });
        }

        let mut x = b.clone();
        for (i, &row) in self.pivots.iter().enumerate() {
            if row != i {
                x.swap_rows(i, row);
            }
        }

        // forward elimination with the stored multipliers
        for i in 0..n {
            let xi = x[i];
            for k in (i + 1)..n {
                x[k] -= self.lu[(k, i)] * xi;
            }
        }

        // back substitution
        for i in (0..n).rev() {
            let mut sum = x[i];
            for k in (i + 1)..n {
                sum -= self.lu[(i, k)] * x[k];
            }
            x[i] = sum / self.lu[(i, i)];
        }

        if let Some(column) = x.iter().position(|v| !v.is_finite()) {
            warn!("Rejected non-finite solution at index {column}.");
            return Err(TpsError::SingularMatrix { column });
        }

        Ok(x)
    }

    /// Solve for both columns of `b` independently.
    pub fn solve_columns(&self, b: &MatrixXx2<F>) -> Result<MatrixXx2<F>> {
        let bx = b.column(0).into_owned();
        let by = b.column(1).into_owned();

        #[cfg(feature = "parallel")]
        let (x, y) = if self.dim() >= PARALLEL_MIN_DIM {
            rayon::join(|| self.solve(&bx), || self.solve(&by))
        } else {
            (self.solve(&bx), self.solve(&by))
        };
        #[cfg(not(feature = "parallel"))]
        let (x, y) = (self.solve(&bx), self.solve(&by));

        Ok(MatrixXx2::from_columns(&[x?, y?]))
    }
}

fn max_magnitude<F: Float>(values: impl Iterator<Item = F>) -> F {
    values.fold(F::zero(), |acc, v| acc.max(v.abs()))
}
