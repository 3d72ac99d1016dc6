//! Weak-form finite element residuals on structured 2D grids.
//!
//! The nodal values of a grid function are the unknowns. A [`FieldEvaluator`] interpolates
//! them and their derivatives at Gauss points of tensor-product Lagrange elements, a
//! [`WeakFormProblem`] assembles a quadrature-weighted loss from those values and returns its
//! exact gradient, and [`driver::solve`] minimizes the loss with L-BFGS.
//!
//! [`FieldEvaluator`]: evaluate::FieldEvaluator
//! [`WeakFormProblem`]: problem::WeakFormProblem
pub mod basis;
pub mod boundary;
pub mod driver;
pub mod element;
pub mod error;
pub mod evaluate;
pub mod field;
pub mod grid;
pub mod io;
pub mod poisson;
pub mod problem;
pub mod quadrature;
pub mod scenarios;
pub mod stokes;

pub mod optimize {
    pub use weakgrid_optimize::*;
}

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;

pub use weakgrid_optimize::Real;
