use matrixcompare::assert_matrix_eq;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use proptest::prelude::*;
use weakgrid_optimize::calculus::{ObjectiveFunction, ObjectiveFunctionBuilder};
use weakgrid_optimize::lbfgs::*;

/// f(x) = 1/2 x^T A x - b^T x with a fixed SPD matrix A.
struct Quadratic {
    a: DMatrix<f64>,
    b: DVector<f64>,
}

impl Quadratic {
    fn new(n: usize) -> Self {
        // Tridiagonal, diagonally dominant
        let a = DMatrix::from_fn(n, n, |i, j| match (i as isize - j as isize).abs() {
            0 => 4.0 + i as f64 * 0.1,
            1 => -1.0,
            _ => 0.0,
        });
        let b = DVector::from_fn(n, |i, _| (i as f64 + 1.0).sin());
        Self { a, b }
    }

    fn minimizer(&self) -> DVector<f64> {
        self.a.clone().cholesky().unwrap().solve(&self.b)
    }
}

impl ObjectiveFunction<f64> for Quadratic {
    fn dimension(&self) -> usize {
        self.b.len()
    }

    fn value(&mut self, x: DVectorView<f64>) -> f64 {
        0.5 * x.dot(&(&self.a * x)) - self.b.dot(&x)
    }

    fn value_and_gradient_into(&mut self, mut gradient: DVectorViewMut<f64>, x: DVectorView<f64>) -> f64 {
        gradient.copy_from(&(&self.a * x - &self.b));
        self.value(x)
    }
}

fn run_to_convergence(
    objective: &mut impl ObjectiveFunction<f64>,
    x: &mut DVector<f64>,
    settings: LbfgsSettings<f64>,
    max_steps: usize,
) -> StepStatus {
    let mut lbfgs = Lbfgs::new(settings).unwrap();
    for _ in 0..max_steps {
        let step = lbfgs.step(&mut *objective, x).unwrap();
        if step.status != StepStatus::Progress {
            return step.status;
        }
    }
    StepStatus::Progress
}

#[test]
fn lbfgs_minimizes_quadratic_with_backtracking() {
    let mut objective = Quadratic::new(30);
    let mut x = DVector::zeros(30);
    let settings = LbfgsSettings {
        tolerance_grad: 1e-10,
        tolerance_change: 1e-14,
        ..LbfgsSettings::default()
    };

    let status = run_to_convergence(&mut objective, &mut x, settings, 100);
    assert_eq!(status, StepStatus::Converged);
    assert_matrix_eq!(x, objective.minimizer(), comp = abs, tol = 1e-8);
}

#[test]
fn lbfgs_minimizes_quadratic_with_fixed_steps() {
    let mut objective = Quadratic::new(10);
    let mut x = DVector::zeros(10);
    let settings = LbfgsSettings {
        tolerance_grad: 1e-10,
        tolerance_change: 1e-14,
        line_search: LineSearchStrategy::Fixed,
        ..LbfgsSettings::default()
    };

    run_to_convergence(&mut objective, &mut x, settings, 200);
    assert_matrix_eq!(x, objective.minimizer(), comp = abs, tol = 1e-6);
}

#[test]
fn lbfgs_minimizes_rosenbrock() {
    let mut objective = ObjectiveFunctionBuilder::with_dimension(2).with_value_and_gradient(
        |mut g: DVectorViewMut<f64>, x: DVectorView<f64>| {
            let (a, b) = (x[0], x[1]);
            g[0] = -2.0 * (1.0 - a) - 400.0 * a * (b - a * a);
            g[1] = 200.0 * (b - a * a);
            (1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2)
        },
    );
    let mut x = DVector::from_column_slice(&[-1.2, 1.0]);
    let settings = LbfgsSettings {
        tolerance_grad: 1e-9,
        tolerance_change: 1e-16,
        max_iterations: 20,
        ..LbfgsSettings::default()
    };

    run_to_convergence(&mut objective, &mut x, settings, 100);
    assert_matrix_eq!(x, DVector::from_column_slice(&[1.0, 1.0]), comp = abs, tol = 1e-5);
}

#[test]
fn step_reports_initial_loss_and_respects_iteration_budget() {
    let mut objective = Quadratic::new(20);
    let mut x = DVector::from_element(20, 1.0);
    let initial = objective.value(DVectorView::from(&x));

    let mut lbfgs = Lbfgs::new(LbfgsSettings::default()).unwrap();
    let step = lbfgs.step(&mut objective, &mut x).unwrap();
    assert_eq!(step.initial_loss, initial);
    assert!(step.iterations <= 5);
    assert!(step.final_loss < initial);
    assert_eq!(lbfgs.total_iterations(), step.iterations);
}

#[test]
fn step_returns_converged_at_stationary_point() {
    let mut objective = Quadratic::new(5);
    let mut x = objective.minimizer();
    let mut lbfgs = Lbfgs::new(LbfgsSettings::default()).unwrap();
    let step = lbfgs.step(&mut objective, &mut x).unwrap();
    assert_eq!(step.status, StepStatus::Converged);
    assert_eq!(step.iterations, 0);
}

#[test]
fn dimension_mismatch_is_an_error() {
    let mut objective = Quadratic::new(5);
    let mut x = DVector::zeros(4);
    let mut lbfgs = Lbfgs::new(LbfgsSettings::default()).unwrap();
    assert!(matches!(
        lbfgs.step(&mut objective, &mut x),
        Err(LbfgsError::DimensionMismatch {
            objective: 5,
            parameters: 4
        })
    ));
}

#[test]
fn zero_inner_iterations_are_rejected() {
    let settings = LbfgsSettings::<f64> {
        max_iterations: 0,
        ..LbfgsSettings::default()
    };
    assert!(Lbfgs::new(settings).is_err());
}

proptest! {
    #[test]
    fn backtracking_steps_never_increase_the_loss(x0 in prop::collection::vec(-5.0..5.0f64, 8)) {
        let mut objective = Quadratic::new(8);
        let mut x = DVector::from_vec(x0);
        let mut lbfgs = Lbfgs::new(LbfgsSettings::default()).unwrap();
        let mut previous = objective.value(DVectorView::from(&x));
        for _ in 0..5 {
            lbfgs.step(&mut objective, &mut x).unwrap();
            let current = objective.value(DVectorView::from(&x));
            prop_assert!(current <= previous + 1e-12);
            previous = current;
        }
    }
}
