#![warn(missing_docs)]

//! Thin plate splines (TPS) for warping 2D points, after Bookstein (1989). \
//! A thin plate spline is the smooth, minimum-bending-energy mapping that takes a set of source control points
//! exactly onto their destination points. It can then be evaluated anywhere, which makes it suitable for
//! warping images, meshes or coordinate fields from sparse point correspondences.
//!
//! ## Interface
//! The central struct of this library is [`ThinPlateSpline`]. It is created by fitting control points, either with
//! [`generate()`] or [`ThinPlateSpline::generate()`], or through [`TpsFitter`] if options are needed.
//! Options are set via `TpsFitter::with_*()` functions.
//!
//! Example:
//! ```rust
//! # use nalgebra::vector;
//! let src = vec![vector![0f64, 0.], vector![1., 0.], vector![0., 1.]];
//! let dst = vec![vector![1., 2.], vector![2., 2.], vector![1., 3.]];
//! let tps = tpsrs::generate(src, dst).unwrap();
//! let p = tpsrs::project(&tps, 10., -5.);
//! assert!((p.x - 11.).abs() < 1e-9 && (p.y + 3.).abs() < 1e-9);
//! ```
//!
//! After fitting, the spline can be evaluated
//! - at a single point with [`ThinPlateSpline::project()`],
//! - at all rows of an array with [`ThinPlateSpline::project_points()`], also in parallel.
//!
//! The dense solver used for fitting is exposed as [`solve()`] and [`PivotedLu`].
//!
//! ## Kernel
//! The radial basis is evaluated on squared distances as \(U = r^2 \log r^2\), see [`kernel`].
//! This differs from the textbook \(r^2 \log r\) by a constant factor that the weights absorb,
//! but weights fitted here must only be evaluated with the same kernel.
//!
//! ## Errors
//! Fitting fails with a [`TpsError`] if the inputs have different lengths, if fewer than three points are given,
//! or if the source points are degenerate (repeated or collinear). Evaluation cannot fail.

mod error;
pub mod kernel;
mod points;
pub mod solver;
mod spline;
pub mod system;

use nalgebra::Vector2;

pub use error::{Result, TpsError};
pub use points::IntoPoints;
pub use solver::{PivotedLu, solve};
pub use spline::{MIN_POINTS, ThinPlateSpline, TpsFitter};

/// Scalar type of coordinates, kernel values and spline coefficients.
///
/// Blanket-implemented for every real field that `nalgebra` supports, in practice `f32` and `f64`.
/// The math functions (`ln`, `abs`, `max`, ...) come from [`nalgebra::RealField`] only;
/// bounding by [`num_traits::Float`] as well would make every such call ambiguous.
pub trait Float: Copy + Default + nalgebra::RealField + num_traits::FromPrimitive {}

impl<F> Float for F where F: Copy + Default + nalgebra::RealField + num_traits::FromPrimitive {}

/// Fit the thin plate spline mapping `src[i]` onto `dst[i]`.
///
/// # Errors
/// - [`TpsError::DimensionMismatch`] if `src` and `dst` differ in length.
/// - [`TpsError::InsufficientPoints`] if fewer than three points are given.
/// - [`TpsError::DegenerateFit`] if the system is singular.
pub fn generate<S, D>(src: S, dst: D) -> Result<ThinPlateSpline<S::Scalar>>
where
    S: IntoPoints,
    D: IntoPoints<Scalar = S::Scalar>,
{
    ThinPlateSpline::generate(src, dst)
}

/// Evaluate `model` at `(x, y)`.
pub fn project<F: Float>(model: &ThinPlateSpline<F>, x: F, y: F) -> Vector2<F> {
    model.project(x, y)
}
