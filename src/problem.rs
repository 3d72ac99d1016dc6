//! The interface shared by all weak-form problems, and its bridge to the optimizers.
use crate::error::FemError;
use crate::evaluate::FieldEvaluator;
use crate::field::NodalField;
use crate::grid::GridShape;
use crate::nalgebra::{DVectorView, DVectorViewMut};
use crate::Real;
use rayon::prelude::*;
use weakgrid_optimize::calculus::ObjectiveFunction;

/// A PDE posed as the minimization of a quadrature-assembled loss over a nodal field.
///
/// Implementations impose their own boundary conditions on the field before evaluating it, so
/// any field of the right layout is a valid input. The gradient is zero at clamped nodes.
pub trait WeakFormProblem<T: Real>: Sync {
    fn evaluator(&self) -> &FieldEvaluator<T>;

    fn num_components(&self) -> usize;

    fn batch_size(&self) -> usize;

    fn grid_shape(&self) -> GridShape {
        self.evaluator().shape()
    }

    /// Returns an error unless `field` has the layout this problem expects.
    fn check_field(&self, field: &NodalField<T>) -> Result<(), FemError> {
        field.check_layout(self.batch_size(), self.num_components(), self.grid_shape())
    }

    /// A field of the expected layout with every entry equal to `value`.
    fn constant_field(&self, value: T) -> NodalField<T> {
        NodalField::from_element(self.batch_size(), self.num_components(), self.grid_shape(), value)
    }

    /// Returns a copy of `field` with all boundary conditions imposed.
    fn apply_boundary_conditions(&self, field: &NodalField<T>) -> Result<NodalField<T>, FemError>;

    fn loss(&self, field: &NodalField<T>) -> Result<T, FemError>;

    /// Computes the loss and overwrites `gradient` with its gradient with respect to `field`.
    fn loss_and_gradient(&self, field: &NodalField<T>, gradient: &mut NodalField<T>) -> Result<T, FemError>;
}

fn not_a_number<T: Real>() -> T {
    T::from_f64(f64::NAN).unwrap()
}

/// Exposes a [`WeakFormProblem`] as an [`ObjectiveFunction`] of the flattened nodal field.
///
/// The flat layout is that of [`NodalField::to_vector`]. Since the objective interface cannot
/// report errors, the first error raised by the problem is stored and the objective returns
/// NaN from then on; check [`take_error`](Self::take_error) after optimizing.
#[derive(Debug)]
pub struct ProblemObjective<'a, T: Real, P> {
    problem: &'a P,
    field: NodalField<T>,
    gradient: NodalField<T>,
    error: Option<FemError>,
}

impl<'a, T, P> ProblemObjective<'a, T, P>
where
    T: Real,
    P: WeakFormProblem<T>,
{
    pub fn new(problem: &'a P) -> Self {
        Self {
            problem,
            field: problem.constant_field(T::zero()),
            gradient: problem.constant_field(T::zero()),
            error: None,
        }
    }

    pub fn take_error(&mut self) -> Option<FemError> {
        self.error.take()
    }

    fn record(&mut self, result: Result<T, FemError>) -> T {
        match result {
            Ok(loss) => loss,
            Err(err) => {
                self.error.get_or_insert(err);
                not_a_number()
            }
        }
    }
}

impl<'a, T, P> ObjectiveFunction<T> for ProblemObjective<'a, T, P>
where
    T: Real,
    P: WeakFormProblem<T>,
{
    fn dimension(&self) -> usize {
        self.field.len()
    }

    fn value(&mut self, x: DVectorView<T>) -> T {
        if self.error.is_some() {
            return not_a_number();
        }
        self.field.copy_from_vector(x);
        let result = self.problem.loss(&self.field);
        self.record(result)
    }

    fn value_and_gradient_into(&mut self, mut gradient: DVectorViewMut<T>, x: DVectorView<T>) -> T {
        if self.error.is_some() {
            gradient.fill(T::zero());
            return not_a_number();
        }
        self.field.copy_from_vector(x);
        let result = self.problem.loss_and_gradient(&self.field, &mut self.gradient);
        gradient.copy_from(&self.gradient.to_vector());
        self.record(result)
    }
}

/// Sums per-element contributions in parallel and returns their mean.
///
/// The contributions are collected in element order before summation, so the result does not
/// depend on the thread schedule.
pub(crate) fn mean_over_elements<T, F>(num_elements: usize, element_contribution: F) -> T
where
    T: Real,
    F: Fn(usize) -> T + Sync + Send,
{
    let contributions: Vec<T> = (0..num_elements)
        .into_par_iter()
        .map(element_contribution)
        .collect();
    let sum = contributions
        .iter()
        .fold(T::zero(), |acc, contribution| acc + *contribution);
    sum / T::from_usize(num_elements).unwrap()
}
