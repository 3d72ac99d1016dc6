//! Geometry of a structured grid on the unit square and its element partition.
//!
//! Grid node `(row, col)` sits at `x = col * hx`, `y = row * hy` with `hx = 1 / (cols - 1)` and
//! `hy = 1 / (rows - 1)`. A degree `p` element covers `(p + 1) x (p + 1)` nodes, and
//! neighboring elements share the nodes on their common edge. Elements are numbered row-major
//! over the `(rows - 1) / p` element rows and `(cols - 1) / p` element columns.
use crate::error::FemError;
use crate::nalgebra::Point2;
use crate::quadrature::validate_basis_degree;
use crate::Real;
use serde::{Deserialize, Serialize};

/// Number of node rows and columns of a grid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    pub fn num_nodes(&self) -> usize {
        self.rows * self.cols
    }

    pub fn as_tuple(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Whether elements of the given degree tile the grid exactly.
    pub fn is_compatible_with(&self, degree: usize) -> bool {
        let fits = |n: usize| n >= 2 && (n - 1) % degree == 0;
        degree > 0 && fits(self.rows) && fits(self.cols)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry<T> {
    shape: GridShape,
    degree: usize,
    element_rows: usize,
    element_cols: usize,
    spacing_x: T,
    spacing_y: T,
}

impl<T> GridGeometry<T>
where
    T: Real,
{
    pub fn new(shape: GridShape, degree: usize) -> Result<Self, FemError> {
        validate_basis_degree(degree)?;
        if !shape.is_compatible_with(degree) {
            return Err(FemError::IncompatibleGridSize {
                rows: shape.rows,
                cols: shape.cols,
                degree,
            });
        }
        let spacing = |n: usize| T::one() / T::from_usize(n - 1).unwrap();
        Ok(Self {
            shape,
            degree,
            element_rows: (shape.rows - 1) / degree,
            element_cols: (shape.cols - 1) / degree,
            spacing_x: spacing(shape.cols),
            spacing_y: spacing(shape.rows),
        })
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn element_rows(&self) -> usize {
        self.element_rows
    }

    pub fn element_cols(&self) -> usize {
        self.element_cols
    }

    pub fn num_elements(&self) -> usize {
        self.element_rows * self.element_cols
    }

    pub fn nodes_per_element(&self) -> usize {
        (self.degree + 1) * (self.degree + 1)
    }

    /// Node spacing `(hx, hy)`.
    pub fn spacing(&self) -> (T, T) {
        (self.spacing_x, self.spacing_y)
    }

    /// Physical coordinates of the grid node `(row, col)`.
    pub fn node_position(&self, row: usize, col: usize) -> Point2<T> {
        Point2::new(
            T::from_usize(col).unwrap() * self.spacing_x,
            T::from_usize(row).unwrap() * self.spacing_y,
        )
    }

    /// Grid indices `(row, col)` of the first node of element `element_index`.
    pub fn element_origin(&self, element_index: usize) -> (usize, usize) {
        assert!(element_index < self.num_elements(), "Element index out of bounds");
        let element_row = element_index / self.element_cols;
        let element_col = element_index % self.element_cols;
        (element_row * self.degree, element_col * self.degree)
    }

    /// Grid indices of the given local node of an element.
    pub fn element_node(&self, element_index: usize, local_index: usize) -> (usize, usize) {
        let n = self.degree + 1;
        let (row, col) = self.element_origin(element_index);
        (row + local_index / n, col + local_index % n)
    }

    /// Physical position of a point given in reference coordinates of an element.
    pub fn map_reference_point(&self, element_index: usize, xi: &Point2<T>) -> Point2<T> {
        let (row, col) = self.element_origin(element_index);
        let origin = self.node_position(row, col);
        let (half_x, half_y) = self.half_extents();
        Point2::new(
            origin.x + (xi.x + T::one()) * half_x,
            origin.y + (xi.y + T::one()) * half_y,
        )
    }

    /// Half of the physical element extent in each direction, `(p hx / 2, p hy / 2)`.
    pub fn half_extents(&self) -> (T, T) {
        let half_degree = T::from_usize(self.degree).unwrap() / T::from_usize(2).unwrap();
        (half_degree * self.spacing_x, half_degree * self.spacing_y)
    }

    /// Factors `(d xi / dx, d eta / dy)` mapping reference derivatives to physical derivatives.
    pub fn derivative_scale(&self) -> (T, T) {
        let (half_x, half_y) = self.half_extents();
        (T::one() / half_x, T::one() / half_y)
    }

    /// Determinant of the (diagonal) element Jacobian. Identical for every element.
    pub fn jacobian_determinant(&self) -> T {
        let (half_x, half_y) = self.half_extents();
        half_x * half_y
    }
}
