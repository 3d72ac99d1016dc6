use crate::Real;
use nalgebra::{DVector, DVectorView, DVectorViewMut, Scalar};
use numeric_literals::replace_float_literals;

/// A differentiable scalar function `f: R^n -> R` to be minimized.
pub trait ObjectiveFunction<T>
where
    T: Scalar,
{
    fn dimension(&self) -> usize;

    /// Evaluates `f(x)`.
    fn value(&mut self, x: DVectorView<T>) -> T;

    /// Evaluates `f(x)` and stores `grad f(x)` in `gradient`.
    fn value_and_gradient_into(&mut self, gradient: DVectorViewMut<T>, x: DVectorView<T>) -> T;
}

impl<T, X> ObjectiveFunction<T> for &mut X
where
    T: Scalar,
    X: ObjectiveFunction<T>,
{
    fn dimension(&self) -> usize {
        X::dimension(self)
    }

    fn value(&mut self, x: DVectorView<T>) -> T {
        X::value(self, x)
    }

    fn value_and_gradient_into(&mut self, gradient: DVectorViewMut<T>, x: DVectorView<T>) -> T {
        X::value_and_gradient_into(self, gradient, x)
    }
}

#[derive(Debug, Clone)]
pub struct ObjectiveFunctionBuilder {
    dimension: usize,
}

/// An objective defined by a closure that returns the value and writes the gradient.
#[derive(Debug, Clone)]
pub struct ConcreteObjectiveFunction<F> {
    dimension: usize,
    function: F,
}

impl ObjectiveFunctionBuilder {
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn with_value_and_gradient<F, T>(self, function: F) -> ConcreteObjectiveFunction<F>
    where
        T: Scalar,
        F: FnMut(DVectorViewMut<T>, DVectorView<T>) -> T,
    {
        ConcreteObjectiveFunction {
            dimension: self.dimension,
            function,
        }
    }
}

impl<F, T> ObjectiveFunction<T> for ConcreteObjectiveFunction<F>
where
    T: Real,
    F: FnMut(DVectorViewMut<T>, DVectorView<T>) -> T,
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn value(&mut self, x: DVectorView<T>) -> T {
        let mut scratch = DVector::zeros(self.dimension);
        (self.function)(DVectorViewMut::from(&mut scratch), x)
    }

    fn value_and_gradient_into(&mut self, gradient: DVectorViewMut<T>, x: DVectorView<T>) -> T {
        (self.function)(gradient, x)
    }
}

/// Approximates the gradient of the function `f: R^n -> R` with central finite differences.
///
/// The parameter `h` determines the step size of the finite difference approximation.
///
/// The vector `x` is mutable in order to contain intermediate computations, but upon returning,
/// its content remains unchanged.
pub fn approximate_gradient_fd<'a, T>(
    f: impl FnMut(DVectorView<T>) -> T,
    x: impl Into<DVectorViewMut<'a, T>>,
    h: T,
) -> DVector<T>
where
    T: Real,
{
    let x = x.into();
    let mut df = DVector::zeros(x.len());
    approximate_gradient_fd_into(DVectorViewMut::from(&mut df), f, x, h);
    df
}

/// Same as [`approximate_gradient_fd`], but stores the result in the provided output vector.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn approximate_gradient_fd_into<'a, T>(
    mut df: DVectorViewMut<T>,
    mut f: impl FnMut(DVectorView<T>) -> T,
    x: impl Into<DVectorViewMut<'a, T>>,
    h: T,
) where
    T: Real,
{
    let mut x = x.into();
    assert_eq!(df.len(), x.len(), "Gradient and input must have the same dimension.");
    for i in 0..x.len() {
        let x_i = x[i];
        x[i] = x_i + h;
        let f_plus = f(DVectorView::from(&x));
        x[i] = x_i - h;
        let f_minus = f(DVectorView::from(&x));
        x[i] = x_i;
        df[i] = (f_plus - f_minus) / (2.0 * h);
    }
}

/// Approximates the directional derivative `grad f(x) . d` with a central difference.
///
/// Cheaper than a full finite-difference gradient when checking large analytic gradients
/// against a few random directions.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn approximate_directional_derivative_fd<T>(
    mut f: impl FnMut(DVectorView<T>) -> T,
    x: DVectorView<T>,
    direction: DVectorView<T>,
    h: T,
) -> T
where
    T: Real,
{
    let mut x_shifted = x.clone_owned();
    x_shifted.axpy(h, &direction, T::one());
    let f_plus = f(DVectorView::from(&x_shifted));
    x_shifted.axpy(-2.0 * h, &direction, T::one());
    let f_minus = f(DVectorView::from(&x_shifted));
    (f_plus - f_minus) / (2.0 * h)
}
