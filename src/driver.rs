//! Outer optimization loop: repeated L-BFGS steps on a nodal field with early stopping.
use crate::field::NodalField;
use crate::nalgebra::DVectorView;
use crate::problem::{ProblemObjective, WeakFormProblem};
use crate::Real;
use eyre::WrapErr;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use weakgrid_optimize::lbfgs::{Lbfgs, LbfgsSettings, StepStatus};
use weakgrid_optimize::stopping::{EarlyStopping, EarlyStoppingSettings};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings<T> {
    /// Maximum number of calls to the L-BFGS step ("epochs").
    pub max_outer_steps: usize,
    pub lbfgs: LbfgsSettings<T>,
    pub early_stopping: EarlyStoppingSettings<T>,
}

impl<T: Real> Default for SolverSettings<T> {
    fn default() -> Self {
        Self {
            max_outer_steps: 1000,
            lbfgs: LbfgsSettings::default(),
            early_stopping: EarlyStoppingSettings::default(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// `max_outer_steps` outer steps were taken.
    MaxSteps,
    /// The loss stopped improving for `patience` consecutive outer steps.
    EarlyStopped,
    /// The loss became NaN or infinite.
    NonFiniteLoss,
    /// The gradient norm fell below the L-BFGS gradient tolerance.
    Converged,
    /// No step along the quasi-Newton direction decreased the loss.
    LineSearchFailed,
}

/// Metrics of one outer step.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics<T> {
    pub step: usize,
    /// Loss at the start of the step. This is the value monitored by early stopping.
    pub loss: T,
    /// Loss after the last inner iteration of the step.
    pub final_loss: T,
    pub inner_iterations: usize,
    pub function_evaluations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport<T> {
    pub history: Vec<StepMetrics<T>>,
    pub stop_reason: StopReason,
    /// Loss of the returned field.
    pub final_loss: T,
    /// Best loss observed by early stopping.
    pub best_loss: Option<T>,
}

impl<T> SolveReport<T> {
    pub fn num_steps(&self) -> usize {
        self.history.len()
    }
}

/// Minimizes the loss of `problem` over `field`, starting from its current values.
///
/// On return, `field` holds the optimized free values. Clamped nodes keep whatever values the
/// field had, since the problem imposes its boundary conditions on every evaluation; use
/// [`WeakFormProblem::apply_boundary_conditions`] to obtain the conditioned solution.
pub fn solve<T, P>(problem: &P, field: &mut NodalField<T>, settings: &SolverSettings<T>) -> eyre::Result<SolveReport<T>>
where
    T: Real,
    P: WeakFormProblem<T>,
{
    problem
        .check_field(field)
        .wrap_err("Initial field does not fit the problem")?;
    let mut lbfgs = Lbfgs::new(settings.lbfgs)?;
    let mut stopping = EarlyStopping::new(settings.early_stopping);
    let mut objective = ProblemObjective::new(problem);
    let mut x = field.to_vector();

    info!(
        "Solving problem with {} unknowns ({} elements, batch size {}) for at most {} outer steps",
        x.len(),
        problem.evaluator().num_elements(),
        problem.batch_size(),
        settings.max_outer_steps
    );

    let mut history = Vec::new();
    let mut stop_reason = StopReason::MaxSteps;
    for step in 0..settings.max_outer_steps {
        let result = lbfgs.step(&mut objective, &mut x)?;
        if let Some(err) = objective.take_error() {
            return Err(err).wrap_err_with(|| format!("Evaluating the loss failed in outer step {}", step));
        }

        history.push(StepMetrics {
            step,
            loss: result.initial_loss,
            final_loss: result.final_loss,
            inner_iterations: result.iterations,
            function_evaluations: result.function_evaluations,
        });
        debug!(
            "Outer step {}: loss {} -> {} ({} iterations, {} evaluations)",
            step, result.initial_loss, result.final_loss, result.iterations, result.function_evaluations
        );

        if !result.initial_loss.is_finite() || !result.final_loss.is_finite() {
            warn!("Loss is not finite after outer step {}, stopping", step);
            stop_reason = StopReason::NonFiniteLoss;
            break;
        }
        match result.status {
            StepStatus::Converged => {
                stop_reason = StopReason::Converged;
                break;
            }
            StepStatus::LineSearchFailed => {
                warn!("Line search failed in outer step {}, stopping", step);
                stop_reason = StopReason::LineSearchFailed;
                break;
            }
            StepStatus::Progress => {}
        }
        if stopping.observe(result.initial_loss) {
            stop_reason = StopReason::EarlyStopped;
            break;
        }
    }

    field.copy_from_vector(DVectorView::from(&x));
    let final_loss = problem.loss(field)?;
    info!(
        "Stopped after {} outer steps ({:?}), final loss {}",
        history.len(),
        stop_reason,
        final_loss
    );

    Ok(SolveReport {
        history,
        stop_reason,
        final_loss,
        best_loss: stopping.best(),
    })
}
