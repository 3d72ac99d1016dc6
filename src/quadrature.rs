//! Quadrature rules on the reference square `[-1, 1]^2`.
use crate::error::FemError;
use crate::nalgebra::{Point2, Scalar};
use crate::Real;
use serde::{Deserialize, Serialize};
use weakgrid_quadrature::tensor::quadrilateral_gauss;
use weakgrid_quadrature::Rule2d;

/// Errors returned by the underlying quadrature crate.
pub use weakgrid_quadrature::Error as QuadratureError;

/// Polynomial degrees of the element basis for which rules and elements are available.
pub const SUPPORTED_BASIS_DEGREES: [usize; 3] = [1, 2, 3];

/// Area of the reference square.
pub const REFERENCE_AREA: f64 = 4.0;

/// Returns an error unless `degree` is in [`SUPPORTED_BASIS_DEGREES`].
pub fn validate_basis_degree(degree: usize) -> Result<(), FemError> {
    if SUPPORTED_BASIS_DEGREES.contains(&degree) {
        Ok(())
    } else {
        Err(FemError::UnsupportedBasisDegree(degree))
    }
}

/// A quadrature rule consisting of weights and points in reference coordinates.
pub trait Quadrature<T>
where
    T: Scalar,
{
    fn weights(&self) -> &[T];
    fn points(&self) -> &[Point2<T>];

    /// Approximates the integral of the given function over the reference square.
    fn integrate<Function>(&self, f: Function) -> T
    where
        T: Real,
        Function: Fn(&Point2<T>) -> T,
    {
        self.weights()
            .iter()
            .zip(self.points())
            .fold(T::zero(), |integral, (w, p)| integral + f(p) * *w)
    }
}

/// A tensor-product Gauss rule on the reference square.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadratureRule<T>
where
    T: Scalar,
{
    weights: Vec<T>,
    points: Vec<Point2<T>>,
}

impl<T> QuadratureRule<T>
where
    T: Real,
{
    /// The rule used with a basis of the given polynomial degree.
    ///
    /// A degree `p` basis uses `p + 1` Gauss points per axis: the 2x2 rule for bilinear
    /// elements, 3x3 for biquadratic and 4x4 for bicubic. Such a rule integrates polynomials of
    /// degree `2p + 1` per axis exactly, which covers products of two basis gradients (the
    /// diffusion energy). Higher-order products, such as the squared Stokes residual, are
    /// integrated approximately.
    pub fn for_basis_degree(degree: usize) -> Result<Self, FemError> {
        validate_basis_degree(degree)?;
        Self::gauss(degree + 1)
    }

    /// Tensor-product Gauss rule with `points_per_dim` points per axis.
    ///
    /// Points are ordered with the first reference coordinate as the outer index.
    pub fn gauss(points_per_dim: usize) -> Result<Self, FemError> {
        let rule = quadrilateral_gauss(points_per_dim)?;
        Ok(Self::from_f64_rule(rule))
    }

    fn from_f64_rule((weights, points): Rule2d) -> Self {
        let convert = |x: f64| T::from_f64(x).expect("Quadrature data must fit in T");
        Self {
            weights: weights.into_iter().map(convert).collect(),
            points: points
                .into_iter()
                .map(|[x, y]| Point2::new(convert(x), convert(y)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl<T> Quadrature<T> for QuadratureRule<T>
where
    T: Scalar,
{
    fn weights(&self) -> &[T] {
        &self.weights
    }

    fn points(&self) -> &[Point2<T>] {
        &self.points
    }
}

impl<'a, T, Q> Quadrature<T> for &'a Q
where
    T: Scalar,
    Q: Quadrature<T>,
{
    fn weights(&self) -> &[T] {
        Q::weights(self)
    }

    fn points(&self) -> &[Point2<T>] {
        Q::points(self)
    }
}
