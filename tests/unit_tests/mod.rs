use weakgrid::field::NodalField;
use weakgrid::nalgebra::DVector;
use weakgrid::optimize::calculus::approximate_gradient_fd;
use weakgrid::problem::WeakFormProblem;

mod boundary;
mod element;
mod io;
mod stokes;

/// Central finite-difference gradient of the problem loss in the flat layout of the field.
pub fn fd_gradient<P: WeakFormProblem<f64>>(problem: &P, field: &NodalField<f64>, h: f64) -> DVector<f64> {
    let mut scratch = field.clone();
    let mut x = field.to_vector();
    approximate_gradient_fd(
        |x| {
            scratch.copy_from_vector(x);
            problem.loss(&scratch).unwrap()
        },
        &mut x,
        h,
    )
}

/// Analytic gradient of the problem loss in the flat layout of the field.
pub fn analytic_gradient<P: WeakFormProblem<f64>>(problem: &P, field: &NodalField<f64>) -> (f64, DVector<f64>) {
    let mut gradient = problem.constant_field(0.0);
    let loss = problem.loss_and_gradient(field, &mut gradient).unwrap();
    (loss, gradient.to_vector())
}
