//! Ready-made problem instances on square grids.
//!
//! Grid row 0 is the bottom edge `y = 0` and column 0 the left edge `x = 0`.
use crate::boundary::Prescribed;
use crate::error::FemError;
use crate::evaluate::FieldEvaluator;
use crate::grid::GridShape;
use crate::nalgebra::DMatrix;
use crate::poisson::{PoissonInstance, PoissonProblem};
use crate::stokes::{StokesInstance, StokesProblem};
use crate::Real;
use numeric_literals::replace_float_literals;
use rand::distributions::Uniform;
use rand::Rng;

fn indicator<T: Real>(shape: GridShape, selected: impl Fn(usize, usize) -> bool) -> DMatrix<T> {
    DMatrix::from_fn(shape.rows, shape.cols, |i, j| if selected(i, j) { T::one() } else { T::zero() })
}

/// Masks `(source, sink)` selecting the bottom row and the top row.
pub fn rectangle_masks<T: Real>(shape: GridShape) -> (DMatrix<T>, DMatrix<T>) {
    let last_row = shape.rows - 1;
    (indicator(shape, |i, _| i == 0), indicator(shape, |i, _| i == last_row))
}

/// Masks `(source, sink)` selecting the left column and the right column.
pub fn transversal_masks<T: Real>(shape: GridShape) -> (DMatrix<T>, DMatrix<T>) {
    let last_col = shape.cols - 1;
    (indicator(shape, |_, j| j == 0), indicator(shape, |_, j| j == last_col))
}

/// Poisson problem with unit diffusivity and no forcing, `u = 1` on the bottom row and `u = 0`
/// on the top row.
///
/// The exact solution is the linear ramp `u = 1 - y`.
pub fn poisson_rectangle<T: Real>(domain_size: usize, degree: usize) -> Result<PoissonProblem<T>, FemError> {
    let evaluator = FieldEvaluator::square(domain_size, degree)?;
    let shape = evaluator.shape();
    let (source, sink) = rectangle_masks(shape);
    let instance = PoissonInstance::with_source_and_sink(
        DMatrix::from_element(shape.rows, shape.cols, T::one()),
        DMatrix::zeros(shape.rows, shape.cols),
        source,
        sink,
    )?;
    PoissonProblem::builder(evaluator).with_instance(instance).build()
}

/// Poisson problems with `u = 1` on the left column and `u = 0` on the right column, one batch
/// instance per diffusivity field.
pub fn poisson_transversal<T: Real>(
    diffusivities: Vec<DMatrix<T>>,
    degree: usize,
) -> Result<PoissonProblem<T>, FemError> {
    let shape = diffusivities
        .first()
        .map(|nu| GridShape::new(nu.nrows(), nu.ncols()))
        .ok_or(FemError::LayoutMismatch {
            expected_batch_size: 1,
            expected_components: 1,
            actual_batch_size: 0,
            actual_components: 1,
        })?;
    let evaluator = FieldEvaluator::new(shape, degree)?;
    let (source, sink) = transversal_masks(shape);
    let instances = diffusivities
        .into_iter()
        .map(|nu| {
            PoissonInstance::with_source_and_sink(
                nu,
                DMatrix::zeros(shape.rows, shape.cols),
                source.clone(),
                sink.clone(),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    PoissonProblem::builder(evaluator)
        .with_instances(instances)
        .build()
}

/// Mode numbers `(i, j)` of the Karhunen-Loève sum, ordered by decreasing eigenvalue.
pub const KL_MODES: [(usize, usize); 6] = [(1, 1), (1, 2), (2, 1), (2, 2), (1, 3), (3, 1)];

/// Diffusivity `ν = exp(Σ_k c_k λ_k sin(i_k π x) sin(j_k π y))` with `λ_k = 1 / (i_k² + j_k²)`.
///
/// Coefficient `k` weights mode `KL_MODES[k]`; missing trailing coefficients are zero. The
/// field is strictly positive for any coefficients.
///
/// # Panics
///
/// Panics if more coefficients than [`KL_MODES`] are given.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn kl_sum_diffusivity<T: Real>(shape: GridShape, coefficients: &[T]) -> DMatrix<T> {
    assert!(coefficients.len() <= KL_MODES.len(), "Too many KL coefficients");
    let pi = T::pi();
    let hx = T::one() / T::from_usize(shape.cols - 1).unwrap();
    let hy = T::one() / T::from_usize(shape.rows - 1).unwrap();
    DMatrix::from_fn(shape.rows, shape.cols, |row, col| {
        let x = T::from_usize(col).unwrap() * hx;
        let y = T::from_usize(row).unwrap() * hy;
        let exponent = coefficients
            .iter()
            .zip(KL_MODES.iter())
            .fold(0.0, |acc, (&c, &(i, j))| {
                let (i, j) = (T::from_usize(i).unwrap(), T::from_usize(j).unwrap());
                let eigenvalue = 1.0 / (i * i + j * j);
                acc + c * eigenvalue * (i * pi * x).sin() * (j * pi * y).sin()
            });
        exponent.exp()
    })
}

/// Draws `num_samples` coefficient vectors with entries uniform in `[-1, 1)`, one per
/// [`KL_MODES`] entry.
pub fn sample_kl_coefficients<R: Rng + ?Sized>(num_samples: usize, rng: &mut R) -> Vec<[f64; 6]> {
    let distribution = Uniform::new(-1.0, 1.0);
    (0..num_samples)
        .map(|_| {
            let mut coefficients = [0.0; 6];
            coefficients
                .iter_mut()
                .for_each(|c| *c = rng.sample(distribution));
            coefficients
        })
        .collect()
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LidProfile<T> {
    /// The same horizontal velocity at every lid node.
    Uniform(T),
    /// `u = 4 x (1 - x)`, vanishing at the corners.
    Parabolic,
}

/// Masks `(walls, lid, pin)` of the lid-driven cavity.
///
/// The walls are the left column, the right column and the bottom row, the lid is the top row
/// and the pressure is pinned at node `(0, 0)`.
pub fn cavity_masks<T: Real>(shape: GridShape) -> (DMatrix<T>, DMatrix<T>, DMatrix<T>) {
    let (last_row, last_col) = (shape.rows - 1, shape.cols - 1);
    (
        indicator(shape, |i, j| j == 0 || j == last_col || i == 0),
        indicator(shape, |i, _| i == last_row),
        indicator(shape, |i, j| i == 0 && j == 0),
    )
}

/// Lid-driven cavity at the given Reynolds number, with forcing `1 / Re` everywhere.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn lid_driven_cavity<T: Real>(
    domain_size: usize,
    reynolds: T,
    degree: usize,
    lid: LidProfile<T>,
) -> Result<StokesProblem<T>, FemError> {
    let evaluator = FieldEvaluator::square(domain_size, degree)?;
    let shape = evaluator.shape();
    let (walls, lid_mask, pin) = cavity_masks(shape);
    let lid_velocity = match lid {
        LidProfile::Uniform(velocity) => Prescribed::Constant(velocity),
        LidProfile::Parabolic => {
            let geometry = evaluator.geometry();
            Prescribed::Field(DMatrix::from_fn(shape.rows, shape.cols, |i, j| {
                let x = geometry.node_position(i, j).x;
                4.0 * x * (1.0 - x)
            }))
        }
    };
    let forcing = DMatrix::from_element(shape.rows, shape.cols, 1.0 / reynolds);
    let instance = StokesInstance::with_wall_lid_and_pin(forcing, walls, lid_mask, pin, lid_velocity)?;
    StokesProblem::builder(evaluator).with_instance(instance).build()
}
