//! Conversions of the various point containers into the list of points used internally,
//! in the spirit of [`nshare`](https://github.com/rust-cv/nshare).

use itertools::Itertools;
use nalgebra::{MatrixXx2, Vector2};
use ndarray::{Array2, ArrayView2};

use crate::Float;
use crate::error::{Result, TpsError};

/// Anything that can be read as an ordered list of 2D points.
///
/// Implemented for lists of [`Vector2`] or `[F; 2]`, for `ndarray` arrays of shape `(n_points, 2)`,
/// and for `nalgebra` matrices with two columns.
pub trait IntoPoints {
    /// Scalar type of the coordinates.
    type Scalar: Float;

    /// Convert into a list of points.
    ///
    /// Fails with [`TpsError::InvalidShape`] if an array does not have two columns.
    fn into_points(self) -> Result<Vec<Vector2<Self::Scalar>>>;
}

impl<F: Float> IntoPoints for Vec<Vector2<F>> {
    type Scalar = F;

    fn into_points(self) -> Result<Vec<Vector2<F>>> {
        Ok(self)
    }
}

impl<F: Float> IntoPoints for &[Vector2<F>] {
    type Scalar = F;

    fn into_points(self) -> Result<Vec<Vector2<F>>> {
        Ok(self.to_vec())
    }
}

impl<F: Float> IntoPoints for Vec<[F; 2]> {
    type Scalar = F;

    fn into_points(self) -> Result<Vec<Vector2<F>>> {
        Ok(self.into_iter().map(Vector2::from).collect_vec())
    }
}

impl<F: Float> IntoPoints for &[[F; 2]] {
    type Scalar = F;

    fn into_points(self) -> Result<Vec<Vector2<F>>> {
        Ok(self.iter().copied().map(Vector2::from).collect_vec())
    }
}

impl<F: Float> IntoPoints for ArrayView2<'_, F> {
    type Scalar = F;

    fn into_points(self) -> Result<Vec<Vector2<F>>> {
        check_columns(self.ncols())?;
        Ok(self
            .rows()
            .into_iter()
            .map(|r| Vector2::new(r[0], r[1]))
            .collect_vec())
    }
}

impl<F: Float> IntoPoints for &Array2<F> {
    type Scalar = F;

    fn into_points(self) -> Result<Vec<Vector2<F>>> {
        self.view().into_points()
    }
}

impl<F: Float> IntoPoints for Array2<F> {
    type Scalar = F;

    fn into_points(self) -> Result<Vec<Vector2<F>>> {
        self.view().into_points()
    }
}

impl<F: Float> IntoPoints for MatrixXx2<F> {
    type Scalar = F;

    fn into_points(self) -> Result<Vec<Vector2<F>>> {
        Ok(self
            .row_iter()
            .map(|r| Vector2::new(r[0], r[1]))
            .collect_vec())
    }
}

pub(crate) fn check_columns(ncols: usize) -> Result<()> {
    if ncols == 2 {
        Ok(())
    } else {
        Err(TpsError::InvalidShape {
            expected: 2,
            actual: ncols,
        })
    }
}

/// Stack points as the rows of an `(n_points, 2)` matrix.
pub(crate) fn points_matrix<F: Float>(points: &[Vector2<F>]) -> MatrixXx2<F> {
    MatrixXx2::from_fn(points.len(), |i, j| points[i][j])
}
