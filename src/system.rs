//! Assembly of the bordered linear system of a thin plate spline.
//!
//! For `n` control points the system reads
//! \[ \begin{pmatrix} K & P \\ P^T & 0 \end{pmatrix} \begin{pmatrix} W \\ A \end{pmatrix} = \begin{pmatrix} V \\ 0 \end{pmatrix}, \]
//! where \(K_{ij} = U(\lVert s_i - s_j \rVert)\), the rows of \(P\) are \((1, x_i, y_i)\) and \(V\) holds the destination points.
//! The zero rows of the right-hand side are the side conditions: the weights sum to zero and are
//! orthogonal to the source coordinates, so the affine part alone carries the linear trend.
//!
//! Kernel entries grow like \(s^2 \log s^2\) with the coordinate scale \(s\) while the border stays at one.
//! [`Frame`] moves the source points to a unit-sized frame first and maps the solved coefficients back.

#![allow(non_snake_case)]
use nalgebra::{DMatrix, Matrix3x2, MatrixXx2, MatrixXx3, Vector2};

use crate::Float;
use crate::kernel::{squared_distance, u2};
use crate::points::points_matrix;

/// The assembled system for both output dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct TpsSystem<F: Float> {
    /// Bordered coefficient matrix of shape `(n + 3, n + 3)`.
    pub l: DMatrix<F>,
    /// Right-hand sides of shape `(n + 3, 2)`, one column per output dimension.
    pub v: MatrixXx2<F>,
}

impl<F: Float> TpsSystem<F> {
    /// Assemble the system mapping `src[i]` onto `dst[i]`.
    ///
    /// Both lists must have the same length; this is checked by the caller.
    pub fn assemble(src: &[Vector2<F>], dst: &[Vector2<F>]) -> Self {
        debug_assert_eq!(src.len(), dst.len());
        let n = src.len();
        let m = n + 3;

        let K = kernel_matrix(src);
        let P = pad_front(points_matrix(src));

        let mut l = DMatrix::zeros(m, m);
        l.view_mut((0, 0), (n, n)).copy_from(&K);
        l.view_mut((0, n), (n, 3)).copy_from(&P);
        l.view_mut((n, 0), (3, n)).copy_from(&P.transpose());

        let mut v = MatrixXx2::zeros(m);
        v.view_mut((0, 0), (n, 2)).copy_from(&points_matrix(dst));

        Self { l, v }
    }

    /// Number of control points the system was built from.
    pub fn n_points(&self) -> usize {
        self.l.nrows() - 3
    }
}

/// Kernel matrix \(K_{ij} = U(\lVert s_i - s_j \rVert)\) of the source points.
///
/// Symmetric with a zero diagonal.
pub fn kernel_matrix<F: Float>(src: &[Vector2<F>]) -> DMatrix<F> {
    let n = src.len();
    DMatrix::from_fn(n, n, |i, j| u2(squared_distance(&src[j], &src[i])))
}

/// Similarity transform \(p \mapsto (p - c) / s\) into a frame of unit size around the origin.
///
/// `c` is the center of the bounding box and `s` the power of two closest to its half width.
/// Dividing by a power of two is exact, so repeated points stay equal and coordinates that are
/// exact multiples of each other (e.g. on the line \(y = 2x\)) stay exact multiples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame<F: Float> {
    /// Center of the frame.
    pub center: Vector2<F>,
    /// Length that maps onto one.
    pub scale: F,
}

impl<F: Float> Frame<F> {
    /// Frame enclosing `points`.
    ///
    /// Falls back to the unit scale if the points do not span a finite, non-empty box.
    pub fn enclosing(points: &[Vector2<F>]) -> Self {
        let Some(first) = points.first() else {
            return Self {
                center: Vector2::zeros(),
                scale: F::one(),
            };
        };

        let (lower, upper) = points.iter().fold((*first, *first), |(lo, hi), p| {
            (
                Vector2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Vector2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        });

        let half = nalgebra::convert::<f64, F>(0.5);
        let center = (lower + upper) * half;
        let extent = (upper.x - lower.x).max(upper.y - lower.y) * half;
        let scale = if extent > F::zero() && extent.is_finite() {
            extent.log2().round().exp2()
        } else {
            F::one()
        };

        Self { center, scale }
    }

    /// Map `p` into the frame.
    pub fn apply(&self, p: &Vector2<F>) -> Vector2<F> {
        (p - self.center) / self.scale
    }

    /// Convert coefficients fitted on the `normalized` points back to the original coordinates.
    ///
    /// With \(r' = r / s\) the kernel splits into \(U(r'^2) = (U(r^2) - r^2 \log s^2) / s^2\).
    /// The side conditions reduce the sum of the second term over all weights to the constant
    /// \(\log s^2 \sum_i w_i \lVert s'_i \rVert^2\), which moves into the affine offset.
    pub fn restore(
        &self,
        linear: &Matrix3x2<F>,
        weights: &MatrixXx2<F>,
        normalized: &[Vector2<F>],
    ) -> (Matrix3x2<F>, MatrixXx2<F>) {
        let s2 = self.scale * self.scale;
        let log_s2 = s2.ln();

        let mut restored = *linear;
        for d in 0..2 {
            let shift = normalized
                .iter()
                .enumerate()
                .fold(F::zero(), |acc, (i, p)| acc + weights[(i, d)] * p.norm_squared());
            let (ax, ay) = (linear[(1, d)], linear[(2, d)]);

            restored[(0, d)] = linear[(0, d)]
                - (ax * self.center.x + ay * self.center.y) / self.scale
                - log_s2 * shift;
            restored[(1, d)] = ax / self.scale;
            restored[(2, d)] = ay / self.scale;
        }

        (restored, weights / s2)
    }
}

/// Prepend a column of ones, giving the rows \((1, x_i, y_i)\).
fn pad_front<F: Float>(x: MatrixXx2<F>) -> MatrixXx3<F> {
    x.insert_column(0, F::one())
}

#[cfg(test)]
mod tests {
    use nalgebra::{dmatrix, vector};

    use super::*;

    fn triangle() -> Vec<Vector2<f64>> {
        vec![vector![0., 0.], vector![1., 0.], vector![0., 1.]]
    }

    #[test]
    fn pad() {
        let mat = MatrixXx2::from_fn(3, |i, j| (2 * i + j) as f64);
        let pad = pad_front(mat);

        assert_eq!(pad.column(0).iter().copied().collect::<Vec<_>>(), vec![1.; 3]);
        assert_eq!(pad[(2, 1)], 4.);
        assert_eq!(pad[(2, 2)], 5.);
    }

    #[test]
    fn kernel_is_symmetric() {
        let src = vec![
            vector![0., 0.],
            vector![3., 0.],
            vector![1., 2.],
            vector![-1., 4.],
        ];
        let K = kernel_matrix(&src);

        assert_eq!(K.shape(), (4, 4));
        assert_eq!(K, K.transpose());
        for i in 0..4 {
            assert_eq!(K[(i, i)], 0.);
        }
        assert_eq!(K[(0, 1)], 9. * 9f64.ln());
    }

    #[test]
    fn frame_of_pixel_points() {
        let src: Vec<Vector2<f64>> = vec![vector![100., 200.], vector![4000., 300.], vector![500., 3900.]];
        let frame = Frame::enclosing(&src);

        assert_eq!(frame.center, vector![2050., 2050.]);
        assert_eq!(frame.scale, 2048.);
        for p in &src {
            let q = frame.apply(p);
            assert!(q.x.abs() <= 1. && q.y.abs() <= 1.);
        }
    }

    #[test]
    fn frame_keeps_exact_relations() {
        let line = (0..5).map(|k| k as f64 * 1.3e-6).map(|x| vector![x, 2. * x]).collect::<Vec<_>>();
        let frame = Frame::enclosing(&line);

        for p in &line {
            let q = frame.apply(p);
            assert_eq!(q.y, 2. * q.x);
        }
    }

    #[test]
    fn frame_of_coincident_points() {
        let frame = Frame::enclosing(&[vector![3., -2.]; 4]);
        assert_eq!(frame.center, vector![3., -2.]);
        assert_eq!(frame.scale, 1.);
        assert_eq!(frame.apply(&vector![3., -2.]), vector![0., 0.]);

        let empty = Frame::<f64>::enclosing(&[]);
        assert_eq!(empty.scale, 1.);
    }

    #[test]
    fn restore_coefficients() {
        // a kernel-free fit on the normalized points maps back to the same affine function
        let src: Vec<Vector2<f64>> = vec![vector![10., 20.], vector![50., 20.], vector![10., 60.]];
        let frame = Frame::enclosing(&src);
        let normalized = src.iter().map(|p| frame.apply(p)).collect::<Vec<_>>();

        let linear = Matrix3x2::new(1., -2., 0.5, 0.25, -1., 3.);
        let weights = MatrixXx2::zeros(3);
        let (restored, restored_weights) = frame.restore(&linear, &weights, &normalized);

        assert_eq!(restored_weights, weights);
        for (p, q) in src.iter().zip(&normalized) {
            for d in 0..2 {
                let in_units = restored[(0, d)] + restored[(1, d)] * p.x + restored[(2, d)] * p.y;
                let framed = linear[(0, d)] + linear[(1, d)] * q.x + linear[(2, d)] * q.y;
                assert!((in_units - framed).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn bordered_layout() {
        let src = triangle();
        let dst = vec![vector![1., 2.], vector![2., 2.], vector![1., 3.]];
        let system = TpsSystem::assemble(&src, &dst);

        let u = 2f64.ln() * 2.;
        let expected = dmatrix![
            0., 0., 0., 1., 0., 0.;
            0., 0., u,  1., 1., 0.;
            0., u,  0., 1., 0., 1.;
            1., 1., 1., 0., 0., 0.;
            0., 1., 0., 0., 0., 0.;
            0., 0., 1., 0., 0., 0.
        ];
        assert_eq!(system.l, expected);
        assert_eq!(system.l, system.l.transpose());
        assert_eq!(system.n_points(), 3);

        assert_eq!(system.v.column(0).iter().copied().collect::<Vec<_>>(), vec![1., 2., 1., 0., 0., 0.]);
        assert_eq!(system.v.column(1).iter().copied().collect::<Vec<_>>(), vec![2., 2., 3., 0., 0., 0.]);
    }
}
