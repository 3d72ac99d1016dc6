//! Gauss quadrature rules for the reference domains used by `weakgrid`.
//!
//! Rules are defined on the reference interval `[-1, 1]` and the reference square `[-1, 1]^2`.
//! They are plain `f64` data so that they can be used independently of `weakgrid`; the main
//! crate converts them to its own scalar type.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod tensor;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A rule with zero points was requested.
    InvalidPointCount,
    /// Root finding for the requested rule did not converge.
    NoConvergence { num_points: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPointCount => write!(f, "A quadrature rule needs at least one point"),
            Self::NoConvergence { num_points } => {
                write!(
                    f,
                    "Root finding for the {}-point Gauss rule failed to converge",
                    num_points
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A D-dimensional rule, stored as `(weights, points)`.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A one-dimensional rule.
pub type Rule1d = Rule<1>;

/// A two-dimensional rule.
pub type Rule2d = Rule<2>;

/// Approximates the integral of `f` over the reference domain of the rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights
        .iter()
        .zip(points)
        .map(|(w, x)| w * f(x))
        .sum()
}
