//! Fitting and evaluation of the thin plate spline.

use itertools::Itertools;
use log::debug;
use nalgebra::{Matrix3x2, MatrixXx2, Vector2};
use ndarray::{Array2, ArrayView2, Zip};

use crate::Float;
use crate::error::{Result, TpsError};
use crate::kernel::{squared_distance, u2};
use crate::points::{IntoPoints, check_columns};
use crate::solver::PivotedLu;
use crate::system::{Frame, TpsSystem, kernel_matrix};

/// Minimum number of control points needed to determine the affine part.
pub const MIN_POINTS: usize = 3;

/// A fitted thin plate spline mapping source points onto destination points.
///
/// Only [`TpsFitter::fit`] (or [`generate`](crate::generate())) creates a spline,
/// and it is never mutated afterwards, so it can be shared between threads freely.
#[derive(Clone, Debug, PartialEq)]
pub struct ThinPlateSpline<F: Float> {
    /// Source control points.
    source: Vec<Vector2<F>>,
    /// Destination control points.
    destination: Vec<Vector2<F>>,
    /// Affine coefficients. Rows: constant, x, y. Columns: output x, output y.
    linear: Matrix3x2<F>,
    /// Non-linear weight per control point and output dimension.
    weights: MatrixXx2<F>,
}

impl<F: Float> ThinPlateSpline<F> {
    /// Fit the spline mapping `src[i]` onto `dst[i]` with default options.
    ///
    /// See [`TpsFitter`] for the accepted inputs and the possible errors.
    pub fn generate<S, D>(src: S, dst: D) -> Result<Self>
    where
        S: IntoPoints<Scalar = F>,
        D: IntoPoints<Scalar = F>,
    {
        TpsFitter::new(src, dst)?.fit()
    }

    /// Evaluate the spline at `(x, y)`.
    pub fn project(&self, x: F, y: F) -> Vector2<F> {
        let point = Vector2::new(x, y);
        let linear = &self.linear;

        let mut p = Vector2::from_fn(|d, _| {
            linear[(0, d)] + x * linear[(1, d)] + y * linear[(2, d)]
        });

        for (i, src) in self.source.iter().enumerate() {
            let dist = u2(squared_distance(src, &point));
            p.x += dist * self.weights[(i, 0)];
            p.y += dist * self.weights[(i, 1)];
        }

        p
    }

    /// Evaluate the spline at `point`.
    pub fn project_point(&self, point: &Vector2<F>) -> Vector2<F> {
        self.project(point.x, point.y)
    }

    /// Evaluate the spline at every row of an array of shape `(n_points, 2)`.
    pub fn project_points(&self, points: ArrayView2<F>) -> Result<Array2<F>> {
        check_columns(points.ncols())?;

        let mut projected = Array2::zeros((points.nrows(), 2));
        Zip::from(projected.rows_mut())
            .and(points.rows())
            .for_each(|mut out, point| {
                let p = self.project(point[0], point[1]);
                out[0] = p.x;
                out[1] = p.y;
            });

        Ok(projected)
    }

    /// Bending energy \(\sum_d w_d^T K w_d\) of the fitted weights.
    ///
    /// Vanishes for a purely affine mapping.
    pub fn bending_energy(&self) -> F {
        let k = kernel_matrix(&self.source);
        (0..2).fold(F::zero(), |energy, d| {
            let w = self.weights.column(d);
            energy + w.dot(&(&k * w))
        })
    }

    /// Source control points.
    pub fn source(&self) -> &[Vector2<F>] {
        &self.source
    }

    /// Destination control points.
    pub fn destination(&self) -> &[Vector2<F>] {
        &self.destination
    }

    /// Affine coefficients. Rows: constant, x, y. Columns: output x, output y.
    pub fn linear(&self) -> &Matrix3x2<F> {
        &self.linear
    }

    /// Non-linear weights of shape `(n_points, 2)`.
    pub fn weights(&self) -> &MatrixXx2<F> {
        &self.weights
    }

    /// Number of control points.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Whether the spline has no control points. Always `false` for a fitted spline.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// Options for fitting a [`ThinPlateSpline`].
///
/// Use `with_` functions to set parameters, then call [`fit`](TpsFitter::fit()).
///
/// Example:
/// ```rust
/// # use nalgebra::vector;
/// # use tpsrs::TpsFitter;
/// let src = vec![vector![0f64, 0.], vector![1., 0.], vector![0., 1.], vector![1., 1.]];
/// let dst = vec![vector![0., 0.], vector![1., 0.], vector![0., 1.], vector![1.2, 1.1]];
/// let tps = TpsFitter::new(src, dst)
///     .unwrap()
///     .with_pivot_tolerance(1e-12)
///     .fit()
///     .unwrap();
/// let p = tps.project(1., 1.);
/// assert!((p.x - 1.2).abs() < 1e-9 && (p.y - 1.1).abs() < 1e-9);
/// ```
#[derive(Clone, Debug)]
pub struct TpsFitter<F: Float> {
    /// Source control points.
    source: Vec<Vector2<F>>,
    /// Destination control points.
    destination: Vec<Vector2<F>>,
    /// Absolute pivot tolerance. `None` selects the relative default of [`PivotedLu::factor`].
    pivot_tolerance: Option<F>,
}

impl<F: Float> TpsFitter<F> {
    /// Create a new instance from source and destination points.
    ///
    /// # Arguments
    /// - `src`: Source control points, e.g. a `Vec<Vector2<F>>` or an array of shape `(n_points, 2)`.
    /// - `dst`: Destination control points, in the same order as `src`.
    ///
    /// Fails only if an array input does not have two columns.
    pub fn new<S, D>(src: S, dst: D) -> Result<Self>
    where
        S: IntoPoints<Scalar = F>,
        D: IntoPoints<Scalar = F>,
    {
        Ok(Self {
            source: src.into_points()?,
            destination: dst.into_points()?,
            pivot_tolerance: None,
        })
    }

    /// Set an absolute tolerance below which a pivot counts as zero.
    ///
    /// The system is assembled on the source points moved into a [`Frame`] of unit size,
    /// so the tolerance does not depend on the units of the inputs.
    pub fn with_pivot_tolerance(mut self, tolerance: F) -> Self {
        self.pivot_tolerance = Some(tolerance);
        self
    }

    /// Fit the spline.
    ///
    /// # Errors
    /// - [`TpsError::DimensionMismatch`] if source and destination differ in length.
    /// - [`TpsError::InsufficientPoints`] if there are fewer than three control points.
    /// - [`TpsError::DegenerateFit`] if the system is singular, e.g. for collinear or repeated source points.
    pub fn fit(self) -> Result<ThinPlateSpline<F>> {
        let n = self.source.len();
        if self.destination.len() != n {
            return Err(TpsError::DimensionMismatch {
                expected: n,
                actual: self.destination.len(),
            });
        }
        if n < MIN_POINTS {
            return Err(TpsError::InsufficientPoints {
                required: MIN_POINTS,
                actual: n,
            });
        }

        let frame = Frame::enclosing(&self.source);
        let normalized = self.source.iter().map(|p| frame.apply(p)).collect_vec();
        debug!(
            "Assembling TPS system for {n} control points (center {:?}, scale {}).",
            frame.center, frame.scale
        );
        let TpsSystem { l, v } = TpsSystem::assemble(&normalized, &self.destination);

        let lu = match self.pivot_tolerance {
            Some(tolerance) => PivotedLu::factor_with_tolerance(l, tolerance),
            None => PivotedLu::factor(l),
        }
        .map_err(degenerate)?;
        let coefficients = lu.solve_columns(&v).map_err(degenerate)?;

        let (linear, weights) = frame.restore(
            &coefficients.fixed_rows::<3>(n).into_owned(),
            &coefficients.rows(0, n).into_owned(),
            &normalized,
        );
        debug!("Fitted TPS with {n} control points.");

        Ok(ThinPlateSpline {
            source: self.source,
            destination: self.destination,
            linear,
            weights,
        })
    }
}

fn degenerate(source: TpsError) -> TpsError {
    TpsError::DegenerateFit {
        source: Box::new(source),
    }
}

#[cfg(feature = "parallel")]
mod parallel {
    use super::*;

    impl<F: Float> ThinPlateSpline<F> {
        /// Evaluate the spline at every row of an array of shape `(n_points, 2)`, in parallel.
        ///
        /// Also see [`project_points`](ThinPlateSpline::project_points()).
        pub fn project_points_par(&self, points: ArrayView2<F>) -> Result<Array2<F>> {
            check_columns(points.ncols())?;

            let mut projected = Array2::zeros((points.nrows(), 2));
            Zip::from(projected.rows_mut())
                .and(points.rows())
                .par_for_each(|mut out, point| {
                    let p = self.project(point[0], point[1]);
                    out[0] = p.x;
                    out[1] = p.y;
                });

            Ok(projected)
        }
    }
}
