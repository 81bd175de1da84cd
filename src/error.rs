//! Error type shared by fitting and solving.

use thiserror::Error;

/// Result type of this crate.
pub type Result<T, E = TpsError> = std::result::Result<T, E>;

/// Errors that can occur while fitting a spline or solving a linear system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TpsError {
    /// Two inputs that have to agree in length do not.
    #[error("Dimension mismatch: expected length {expected}, got {actual}.")]
    DimensionMismatch {
        /// Length required by the other input.
        expected: usize,
        /// Length actually given.
        actual: usize,
    },

    /// Fewer control points than needed to determine the affine part.
    #[error("At least {required} control points are required, got {actual}.")]
    InsufficientPoints {
        /// Minimum number of points.
        required: usize,
        /// Number of points given.
        actual: usize,
    },

    /// No usable pivot was found in a column, or the solution was not finite.
    #[error("The matrix is singular (no usable pivot at column {column}).")]
    SingularMatrix {
        /// Column (or solution index) where the failure was detected.
        column: usize,
    },

    /// The bordered TPS system could not be solved.
    #[error("TPS fit is singular/degenerate")]
    DegenerateFit {
        /// Underlying solver failure.
        #[source]
        source: Box<TpsError>,
    },

    /// A point array does not have the shape `(n_points, 2)`.
    #[error("Invalid point array shape: expected (n, {expected}), got (n, {actual}).")]
    InvalidShape {
        /// Required number of columns.
        expected: usize,
        /// Number of columns given.
        actual: usize,
    },
}
