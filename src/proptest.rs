use crate::grid::GridShape;
use crate::nalgebra::{DMatrix, Point2};
use crate::quadrature::SUPPORTED_BASIS_DEGREES;
use ::proptest::prelude::*;

/// A point in the reference square `[-1, 1]^2`.
pub fn reference_point() -> impl Strategy<Value = Point2<f64>> {
    [-1.0..=1.0, -1.0..=1.0].prop_map(|[x, y]| Point2::new(x, y))
}

pub fn basis_degree() -> impl Strategy<Value = usize> {
    prop::sample::select(SUPPORTED_BASIS_DEGREES.to_vec())
}

/// A grid shape tiled by between 1 and `max_elements_per_dim` elements of the given degree in
/// each direction.
pub fn compatible_grid_shape(degree: usize, max_elements_per_dim: usize) -> impl Strategy<Value = GridShape> {
    (1..=max_elements_per_dim, 1..=max_elements_per_dim)
        .prop_map(move |(element_rows, element_cols)| {
            GridShape::new(element_rows * degree + 1, element_cols * degree + 1)
        })
}

/// A supported degree together with a grid shape compatible with it.
pub fn degree_and_grid_shape(max_elements_per_dim: usize) -> impl Strategy<Value = (usize, GridShape)> {
    basis_degree().prop_flat_map(move |degree| (Just(degree), compatible_grid_shape(degree, max_elements_per_dim)))
}

/// Grid values with entries in `[-1, 1]`.
pub fn grid_values(shape: GridShape) -> impl Strategy<Value = DMatrix<f64>> {
    prop::collection::vec(-1.0..=1.0, shape.num_nodes())
        .prop_map(move |values| DMatrix::from_vec(shape.rows, shape.cols, values))
}
