//! Tensor-product Lagrange elements on the reference square `[-1, 1]^2`.
//!
//! A degree `p` element has `(p + 1)^2` nodes at the tensor product of `p + 1` equispaced
//! coordinates in `[-1, 1]`. Local nodes are numbered row-major: the `eta` index is the outer
//! (row) index and the `xi` index the inner (column) index, so local node `b * (p + 1) + a` sits
//! at `(xi_a, eta_b)`. This matches how the element's nodes are laid out in the grid, with
//! `xi` running along grid columns and `eta` along grid rows.
use crate::error::FemError;
use crate::nalgebra::{Point2, Scalar};
use crate::quadrature::validate_basis_degree;
use crate::Real;

/// A finite element on the reference square whose basis can be evaluated at arbitrary points.
pub trait ReferenceElement<T>
where
    T: Scalar,
{
    fn num_nodes(&self) -> usize;

    /// Evaluates all basis functions at the reference point `xi`.
    ///
    /// The slice must have length [`num_nodes`](Self::num_nodes).
    fn populate_basis(&self, basis_values: &mut [T], xi: &Point2<T>);

    /// Evaluates the reference gradients of all basis functions at `xi`.
    ///
    /// Derivatives with respect to the first and second reference coordinates are written to
    /// `d_xi` and `d_eta`, each of length [`num_nodes`](Self::num_nodes).
    fn populate_basis_gradients(&self, d_xi: &mut [T], d_eta: &mut [T], xi: &Point2<T>);
}

/// Lagrange element of degree 1, 2 or 3 with equispaced nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct LagrangeQuad<T> {
    degree: usize,
    nodes_1d: Vec<T>,
}

impl<T> LagrangeQuad<T>
where
    T: Real,
{
    pub fn new(degree: usize) -> Result<Self, FemError> {
        validate_basis_degree(degree)?;
        let step = T::from_usize(2).unwrap() / T::from_usize(degree).unwrap();
        let nodes_1d = (0..=degree)
            .map(|i| -T::one() + T::from_usize(i).unwrap() * step)
            .collect();
        Ok(Self { degree, nodes_1d })
    }

    pub fn bilinear() -> Self {
        Self::with_supported_degree(1)
    }

    pub fn biquadratic() -> Self {
        Self::with_supported_degree(2)
    }

    pub fn bicubic() -> Self {
        Self::with_supported_degree(3)
    }

    fn with_supported_degree(degree: usize) -> Self {
        Self::new(degree).expect("Degree is known to be supported")
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn nodes_per_dim(&self) -> usize {
        self.degree + 1
    }

    /// Reference coordinates of the given local node.
    pub fn reference_node(&self, local_index: usize) -> Point2<T> {
        let n = self.nodes_per_dim();
        assert!(local_index < n * n, "Local node index out of bounds");
        Point2::new(self.nodes_1d[local_index % n], self.nodes_1d[local_index / n])
    }

    fn lagrange_1d(&self, i: usize, x: T) -> T {
        let xi = self.nodes_1d[i];
        self.nodes_1d
            .iter()
            .enumerate()
            .filter(|(m, _)| *m != i)
            .fold(T::one(), |product, (_, &xm)| product * (x - xm) / (xi - xm))
    }

    fn lagrange_1d_derivative(&self, i: usize, x: T) -> T {
        let xi = self.nodes_1d[i];
        let mut derivative = T::zero();
        for (k, &xk) in self.nodes_1d.iter().enumerate().filter(|(k, _)| *k != i) {
            let mut term = T::one() / (xi - xk);
            for (m, &xm) in self.nodes_1d.iter().enumerate() {
                if m != i && m != k {
                    term *= (x - xm) / (xi - xm);
                }
            }
            derivative += term;
        }
        derivative
    }
}

impl<T> ReferenceElement<T> for LagrangeQuad<T>
where
    T: Real,
{
    fn num_nodes(&self) -> usize {
        self.nodes_per_dim() * self.nodes_per_dim()
    }

    fn populate_basis(&self, basis_values: &mut [T], xi: &Point2<T>) {
        assert_eq!(basis_values.len(), self.num_nodes());
        let n = self.nodes_per_dim();
        for b in 0..n {
            let phi_eta = self.lagrange_1d(b, xi.y);
            for a in 0..n {
                basis_values[b * n + a] = self.lagrange_1d(a, xi.x) * phi_eta;
            }
        }
    }

    fn populate_basis_gradients(&self, d_xi: &mut [T], d_eta: &mut [T], xi: &Point2<T>) {
        assert_eq!(d_xi.len(), self.num_nodes());
        assert_eq!(d_eta.len(), self.num_nodes());
        let n = self.nodes_per_dim();
        for b in 0..n {
            let phi_eta = self.lagrange_1d(b, xi.y);
            let dphi_eta = self.lagrange_1d_derivative(b, xi.y);
            for a in 0..n {
                d_xi[b * n + a] = self.lagrange_1d_derivative(a, xi.x) * phi_eta;
                d_eta[b * n + a] = self.lagrange_1d(a, xi.x) * dphi_eta;
            }
        }
    }
}
