use crate::calculus::ObjectiveFunction;
use crate::Real;
use log::{debug, trace};
use nalgebra::{DVector, DVectorView, DVectorViewMut, Scalar};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// How the step length along the quasi-Newton direction is chosen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSearchStrategy {
    /// Always take the step `t = learning_rate` (after the first-iteration scaling).
    Fixed,
    /// Start from the fixed step and halve it until the Armijo condition holds.
    Backtracking,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LbfgsSettings<T> {
    /// Inner iterations performed per call to [`Lbfgs::step`].
    pub max_iterations: usize,
    /// Number of curvature pairs kept in memory.
    pub history_size: usize,
    pub learning_rate: T,
    /// Terminate when the largest gradient entry is at most this value.
    pub tolerance_grad: T,
    /// Terminate the inner loop when the step or the loss change falls below this value.
    pub tolerance_change: T,
    pub line_search: LineSearchStrategy,
}

impl<T: Real> Default for LbfgsSettings<T> {
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn default() -> Self {
        Self {
            max_iterations: 5,
            history_size: 100,
            learning_rate: 1.0,
            tolerance_grad: 1e-7,
            tolerance_change: 1e-9,
            line_search: LineSearchStrategy::Backtracking,
        }
    }
}

#[derive(Debug)]
pub enum LbfgsError {
    /// The objective and the parameter vector disagree on the problem dimension.
    DimensionMismatch { objective: usize, parameters: usize },
    /// The settings cannot be used (e.g. zero inner iterations).
    InvalidSettings(String),
}

impl Display for LbfgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            LbfgsError::DimensionMismatch { objective, parameters } => write!(
                f,
                "Objective has dimension {} but the parameter vector has length {}.",
                objective, parameters
            ),
            LbfgsError::InvalidSettings(msg) => write!(f, "Invalid L-BFGS settings: {}", msg),
        }
    }
}

impl Error for LbfgsError {}

/// Outcome of a single call to [`Lbfgs::step`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// The inner iterations ran without meeting a termination criterion of the whole problem.
    Progress,
    /// The gradient tolerance was met.
    Converged,
    /// The line search could not find a step giving sufficient decrease.
    LineSearchFailed,
}

#[derive(Debug, Clone)]
pub struct LbfgsStep<T> {
    /// Objective value at the parameters passed to `step`.
    pub initial_loss: T,
    /// Most recently evaluated objective value.
    pub final_loss: T,
    pub iterations: usize,
    pub function_evaluations: usize,
    pub status: StepStatus,
}

/// Limited-memory BFGS minimizer.
///
/// The curvature history, the previous direction and the previous gradient persist between
/// calls to [`step`](Self::step), so an outer loop calling `step` repeatedly behaves like one
/// long run of L-BFGS that is interrupted every `max_iterations` inner iterations. The first
/// iteration ever taken follows the negative gradient with step `min(1, 1 / |g|_1)` times the
/// learning rate; later iterations use the two-loop recursion with the initial Hessian
/// approximation `(y^T s / y^T y) I`.
#[derive(Debug, Clone)]
pub struct Lbfgs<T>
where
    T: Scalar,
{
    settings: LbfgsSettings<T>,
    // Curvature pairs (s, y, 1 / y^T s), oldest first
    history: VecDeque<(DVector<T>, DVector<T>, T)>,
    direction: Option<DVector<T>>,
    step_length: T,
    previous_gradient: Option<DVector<T>>,
    hessian_diagonal: T,
    total_iterations: usize,
}

#[derive(Debug, Clone)]
struct Evaluation<T: Scalar> {
    loss: T,
    gradient: DVector<T>,
}

fn evaluate<T, F>(objective: &mut F, x: &DVector<T>) -> Evaluation<T>
where
    T: Real,
    F: ObjectiveFunction<T>,
{
    let mut gradient = DVector::zeros(x.len());
    let loss = objective.value_and_gradient_into(DVectorViewMut::from(&mut gradient), DVectorView::from(x));
    Evaluation { loss, gradient }
}

impl<T> Lbfgs<T>
where
    T: Real,
{
    pub fn new(settings: LbfgsSettings<T>) -> Result<Self, LbfgsError> {
        if settings.max_iterations == 0 {
            return Err(LbfgsError::InvalidSettings("max_iterations must be positive".to_string()));
        }
        if settings.history_size == 0 {
            return Err(LbfgsError::InvalidSettings("history_size must be positive".to_string()));
        }
        Ok(Self {
            settings,
            history: VecDeque::with_capacity(settings.history_size),
            direction: None,
            step_length: T::zero(),
            previous_gradient: None,
            hessian_diagonal: T::one(),
            total_iterations: 0,
        })
    }

    pub fn settings(&self) -> &LbfgsSettings<T> {
        &self.settings
    }

    /// Total number of inner iterations over all calls to `step`.
    pub fn total_iterations(&self) -> usize {
        self.total_iterations
    }

    /// Number of curvature pairs currently stored.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Performs up to `max_iterations` inner iterations, updating `x` in place.
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn step<F>(&mut self, mut objective: F, x: &mut DVector<T>) -> Result<LbfgsStep<T>, LbfgsError>
    where
        F: ObjectiveFunction<T>,
    {
        if objective.dimension() != x.len() {
            return Err(LbfgsError::DimensionMismatch {
                objective: objective.dimension(),
                parameters: x.len(),
            });
        }
        let settings = self.settings;

        let mut current = evaluate(&mut objective, x);
        let initial_loss = current.loss;
        let mut function_evaluations = 1;
        let mut iterations = 0;
        let mut status = StepStatus::Progress;

        if current.gradient.amax() <= settings.tolerance_grad {
            return Ok(LbfgsStep {
                initial_loss,
                final_loss: current.loss,
                iterations,
                function_evaluations,
                status: StepStatus::Converged,
            });
        }

        while iterations < settings.max_iterations {
            iterations += 1;
            self.total_iterations += 1;

            let direction = if self.total_iterations == 1 {
                self.history.clear();
                self.hessian_diagonal = T::one();
                -&current.gradient
            } else {
                self.update_history(&current.gradient);
                self.two_loop_direction(&current.gradient)
            };

            self.step_length = if self.total_iterations == 1 {
                T::min(1.0, 1.0 / current.gradient.lp_norm(1)) * settings.learning_rate
            } else {
                settings.learning_rate
            };

            let directional_derivative = current.gradient.dot(&direction);
            self.previous_gradient = Some(current.gradient.clone());
            let previous_loss = current.loss;

            if directional_derivative > -settings.tolerance_change {
                debug!(
                    "L-BFGS direction is not a descent direction (g^T d = {}), ending inner loop",
                    directional_derivative
                );
                self.direction = Some(direction);
                break;
            }

            match settings.line_search {
                LineSearchStrategy::Fixed => {
                    x.axpy(self.step_length, &direction, T::one());
                    if iterations != settings.max_iterations {
                        current = evaluate(&mut objective, x);
                        function_evaluations += 1;
                    }
                }
                LineSearchStrategy::Backtracking => {
                    let (accepted, trial, evaluations) =
                        backtrack(&mut objective, x, &direction, self.step_length, &current, directional_derivative);
                    function_evaluations += evaluations;
                    match accepted {
                        Some(alpha) => {
                            self.step_length = alpha;
                            current = trial;
                        }
                        None => {
                            debug!("L-BFGS line search failed at iteration {}", self.total_iterations);
                            self.direction = Some(direction);
                            self.step_length = T::zero();
                            status = StepStatus::LineSearchFailed;
                            break;
                        }
                    }
                }
            }

            trace!(
                "L-BFGS iteration {}: loss {} -> {}, step length {}",
                self.total_iterations,
                previous_loss,
                current.loss,
                self.step_length
            );

            let step_amax = direction.amax() * self.step_length.abs();
            self.direction = Some(direction);

            if iterations == settings.max_iterations {
                break;
            }
            if current.gradient.amax() <= settings.tolerance_grad {
                status = StepStatus::Converged;
                break;
            }
            if step_amax <= settings.tolerance_change {
                break;
            }
            if (current.loss - previous_loss).abs() < settings.tolerance_change {
                break;
            }
        }

        Ok(LbfgsStep {
            initial_loss,
            final_loss: current.loss,
            iterations,
            function_evaluations,
            status,
        })
    }

    /// Adds the curvature pair from the previous iteration, if it satisfies `y^T s > 1e-10`.
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn update_history(&mut self, gradient: &DVector<T>) {
        let (Some(previous_gradient), Some(direction)) = (&self.previous_gradient, &self.direction) else {
            return;
        };
        let y = gradient - previous_gradient;
        let s = direction * self.step_length;
        let ys = y.dot(&s);
        if ys > 1e-10 {
            if self.history.len() == self.settings.history_size {
                self.history.pop_front();
            }
            self.hessian_diagonal = ys / y.dot(&y);
            self.history.push_back((s, y, 1.0 / ys));
        }
    }

    /// Computes `-H g` with the standard two-loop recursion.
    fn two_loop_direction(&self, gradient: &DVector<T>) -> DVector<T> {
        let mut q = -gradient;
        let mut alphas = Vec::with_capacity(self.history.len());
        for (s, y, rho) in self.history.iter().rev() {
            let alpha = s.dot(&q) * *rho;
            q.axpy(-alpha, y, T::one());
            alphas.push(alpha);
        }

        let mut r = q * self.hessian_diagonal;
        for ((s, y, rho), alpha) in self.history.iter().zip(alphas.iter().rev()) {
            let beta = y.dot(&r) * *rho;
            r.axpy(*alpha - beta, s, T::one());
        }
        r
    }
}

/// Armijo backtracking along `direction` starting from `initial_step`.
///
/// Updates `x` to the accepted point, or restores it if no acceptable step was found.
/// Returns the accepted step (if any), the evaluation at the final point and the number of
/// objective evaluations.
///
/// See Nocedal & Wright (2006), Numerical Optimization, Chapter 3.1.
#[replace_float_literals(T::from_f64(literal).unwrap())]
fn backtrack<T, F>(
    objective: &mut F,
    x: &mut DVector<T>,
    direction: &DVector<T>,
    initial_step: T,
    current: &Evaluation<T>,
    directional_derivative: T,
) -> (Option<T>, Evaluation<T>, usize)
where
    T: Real,
    F: ObjectiveFunction<T>,
{
    let c = 1e-4;
    let shrink = 0.5;
    let max_trials = 40;

    let mut alpha = initial_step;
    let mut applied = T::zero();
    for trial in 1..=max_trials {
        // Move from x_0 + applied * d to x_0 + alpha * d
        x.axpy(alpha - applied, direction, T::one());
        applied = alpha;

        let evaluation = evaluate(objective, x);
        let sufficient_decrease = current.loss + c * alpha * directional_derivative;
        // NaN losses compare false and cause further backtracking
        if evaluation.loss <= sufficient_decrease {
            return (Some(alpha), evaluation, trial);
        }
        alpha *= shrink;
    }

    x.axpy(-applied, direction, T::one());
    (None, current.clone(), max_trials)
}
