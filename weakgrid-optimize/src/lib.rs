use nalgebra::RealField;

/// Objective functions and numerical differentiation
pub mod calculus;
/// Limited-memory BFGS with optional backtracking line search
pub mod lbfgs;
/// Loss monitoring for outer optimization loops
pub mod stopping;

/// Scalar types supported by the optimizers.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}
