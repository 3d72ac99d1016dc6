//! Errors raised while setting up or evaluating weak-form problems.
//!
//! Non-finite losses are *not* errors: numerical divergence is an ordinary result that the
//! optimization driver detects by monitoring the loss.
use crate::quadrature::QuadratureError;
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FemError {
    /// The requested polynomial degree of the element basis is not supported.
    UnsupportedBasisDegree(usize),
    /// The grid cannot be tiled by an integer number of elements of the given degree.
    IncompatibleGridSize { rows: usize, cols: usize, degree: usize },
    /// A grid-shaped input does not have the shape of the problem grid.
    ShapeMismatch {
        what: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// A nodal field does not have the batch size or number of components a problem expects.
    LayoutMismatch {
        expected_batch_size: usize,
        expected_components: usize,
        actual_batch_size: usize,
        actual_components: usize,
    },
    /// The number of grids does not equal batch size times number of components.
    GridCountMismatch {
        batch_size: usize,
        num_components: usize,
        num_grids: usize,
    },
    /// Two boundary conditions clamp the same node while overlaps are rejected.
    OverlappingConditions {
        first: usize,
        second: usize,
        row: usize,
        col: usize,
    },
    /// Constructing a quadrature rule failed.
    Quadrature(QuadratureError),
}

impl Display for FemError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedBasisDegree(degree) => {
                write!(f, "Unsupported basis degree {}", degree)
            }
            Self::IncompatibleGridSize { rows, cols, degree } => write!(
                f,
                "A {}x{} grid cannot be tiled by elements of degree {}: \
                 each dimension needs at least 2 nodes and (n - 1) divisible by the degree",
                rows, cols, degree
            ),
            Self::ShapeMismatch { what, expected, actual } => write!(
                f,
                "Shape mismatch for {}: expected {}x{}, got {}x{}",
                what, expected.0, expected.1, actual.0, actual.1
            ),
            Self::LayoutMismatch {
                expected_batch_size,
                expected_components,
                actual_batch_size,
                actual_components,
            } => write!(
                f,
                "Field layout mismatch: expected batch size {} with {} components, \
                 got batch size {} with {} components",
                expected_batch_size, expected_components, actual_batch_size, actual_components
            ),
            Self::GridCountMismatch {
                batch_size,
                num_components,
                num_grids,
            } => write!(
                f,
                "Expected {} grids for batch size {} with {} components, got {}",
                batch_size * num_components,
                batch_size,
                num_components,
                num_grids
            ),
            Self::OverlappingConditions { first, second, row, col } => write!(
                f,
                "Boundary conditions {} and {} both clamp node ({}, {})",
                first, second, row, col
            ),
            Self::Quadrature(err) => write!(f, "Quadrature error: {}", err),
        }
    }
}

impl std::error::Error for FemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Quadrature(err) => Some(err),
            _ => None,
        }
    }
}

impl From<QuadratureError> for FemError {
    fn from(err: QuadratureError) -> Self {
        Self::Quadrature(err)
    }
}
