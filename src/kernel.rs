//! The radial basis function of the thin plate spline.
//!
//! Bookstein (1989) defines the kernel on the Euclidean distance as \(U(r) = r^2 \log r^2\).
//! Since the kernel is only ever needed for distances between points, it is evaluated
//! directly on the squared distance, which avoids a square root per evaluation.
//! The same form is used when assembling the system and when projecting,
//! so the fitted weights stay consistent with the evaluation.

use nalgebra::Vector2;

use crate::Float;

/// Kernel evaluated on a squared distance: \(r^2 \log r^2\), with \(U(0) = 0\).
#[inline]
pub fn u2<F: Float>(r2: F) -> F {
    if r2 == F::zero() {
        F::zero()
    } else {
        r2 * r2.ln()
    }
}

/// Kernel evaluated on a plain distance `r`.
#[inline]
pub fn u<F: Float>(r: F) -> F {
    u2(r * r)
}

/// Squared Euclidean distance between two points.
#[inline]
pub fn squared_distance<F: Float>(a: &Vector2<F>, b: &Vector2<F>) -> F {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use nalgebra::vector;

    use super::*;

    #[test]
    fn zero_distance() {
        assert_eq!(u2(0f64), 0.);
        assert_eq!(u(0f32), 0.);
    }

    #[test]
    fn unit_distance() {
        assert_abs_diff_eq!(u2(1f64), 0., epsilon = 1e-15);
    }

    #[test]
    fn squared_convention() {
        // r = 2: r^2 ln(r^2) = 4 ln 4, twice the textbook r^2 ln r
        let expected = 4. * 4f64.ln();
        assert_abs_diff_eq!(u(2f64), expected, epsilon = 1e-12);
        assert_abs_diff_eq!(u2(4f64), expected, epsilon = 1e-12);
        assert_abs_diff_eq!(u(2f64), 2. * 4. * 2f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn negative_between_zero_and_one() {
        assert!(u2(0.25f64) < 0.);
        assert!(u2(4f64) > 0.);
    }

    #[test]
    fn distance() {
        let a = vector![1., 2.];
        let b = vector![4., -2.];
        assert_eq!(squared_distance::<f64>(&a, &b), 25.);
        assert_eq!(squared_distance::<f64>(&b, &a), 25.);
        assert_eq!(squared_distance::<f64>(&a, &a), 0.);
    }
}
