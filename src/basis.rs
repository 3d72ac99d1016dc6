//! Basis functions and their reference derivatives tabulated at quadrature points.
use crate::element::ReferenceElement;
use crate::nalgebra::{DMatrix, Point2, Scalar};
use crate::Real;

/// Values and reference derivatives of every basis function at every quadrature point.
///
/// Each table is stored row-major by quadrature point, so all nodes for one point are
/// contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisTable<T: Scalar> {
    num_quadrature_points: usize,
    num_nodes: usize,
    values: Vec<T>,
    d_xi: Vec<T>,
    d_eta: Vec<T>,
}

impl<T> BasisTable<T>
where
    T: Real,
{
    pub fn from_element_and_points<Element>(element: &Element, points: &[Point2<T>]) -> Self
    where
        Element: ReferenceElement<T>,
    {
        let num_nodes = element.num_nodes();
        let len = num_nodes * points.len();
        let mut values = vec![T::zero(); len];
        let mut d_xi = vec![T::zero(); len];
        let mut d_eta = vec![T::zero(); len];

        for (q, xi) in points.iter().enumerate() {
            let range = q * num_nodes..(q + 1) * num_nodes;
            element.populate_basis(&mut values[range.clone()], xi);
            element.populate_basis_gradients(&mut d_xi[range.clone()], &mut d_eta[range], xi);
        }

        Self {
            num_quadrature_points: points.len(),
            num_nodes,
            values,
            d_xi,
            d_eta,
        }
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.num_quadrature_points
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Basis values at quadrature point `q`, one entry per local node.
    pub fn values_at(&self, q: usize) -> &[T] {
        &self.values[q * self.num_nodes..(q + 1) * self.num_nodes]
    }

    pub fn d_xi_at(&self, q: usize) -> &[T] {
        &self.d_xi[q * self.num_nodes..(q + 1) * self.num_nodes]
    }

    pub fn d_eta_at(&self, q: usize) -> &[T] {
        &self.d_eta[q * self.num_nodes..(q + 1) * self.num_nodes]
    }

    pub(crate) fn flat_values(&self) -> &[T] {
        &self.values
    }

    /// The value table as a `num_quadrature_points x num_nodes` matrix.
    pub fn values(&self) -> DMatrix<T> {
        DMatrix::from_row_slice(self.num_quadrature_points, self.num_nodes, &self.values)
    }

    pub fn d_xi(&self) -> DMatrix<T> {
        DMatrix::from_row_slice(self.num_quadrature_points, self.num_nodes, &self.d_xi)
    }

    pub fn d_eta(&self) -> DMatrix<T> {
        DMatrix::from_row_slice(self.num_quadrature_points, self.num_nodes, &self.d_eta)
    }

    /// Largest deviation from partition of unity over all quadrature points.
    ///
    /// At every point the values must sum to one and each derivative table must sum to zero.
    pub fn partition_of_unity_defect(&self) -> T {
        let mut defect = T::zero();
        for q in 0..self.num_quadrature_points {
            let sum = |table: &[T]| table.iter().fold(T::zero(), |acc, x| acc + *x);
            defect = defect.max((sum(self.values_at(q)) - T::one()).abs());
            defect = defect.max(sum(self.d_xi_at(q)).abs());
            defect = defect.max(sum(self.d_eta_at(q)).abs());
        }
        defect
    }
}
