//! Steady diffusion `-div(nu grad u) = f` posed through its energy functional.
//!
//! For each element the loss contribution is
//!
//! ```text
//! r_e = sum_q gpw_q (nu_q (u_x^2 + u_y^2) - u_q f_q)
//! ```
//!
//! and the loss is the mean of `r_e` over all elements and batch instances. The boundary
//! conditions are imposed on the field before it is evaluated.
use crate::boundary::{BoundaryConditions, DirichletCondition};
use crate::error::FemError;
use crate::evaluate::{FieldEvaluator, QuadratureField, QuadratureValues};
use crate::field::NodalField;
use crate::grid::GridShape;
use crate::nalgebra::{DMatrix, Scalar};
use crate::problem::{mean_over_elements, WeakFormProblem};
use crate::Real;
use itertools::izip;
use numeric_literals::replace_float_literals;

/// Coefficients and boundary conditions of one Poisson problem in a batch.
#[derive(Debug, Clone)]
pub struct PoissonInstance<T: Scalar> {
    diffusivity: DMatrix<T>,
    forcing: DMatrix<T>,
    boundary: BoundaryConditions<T>,
}

impl<T: Real> PoissonInstance<T> {
    pub fn new(diffusivity: DMatrix<T>, forcing: DMatrix<T>, boundary: BoundaryConditions<T>) -> Self {
        Self {
            diffusivity,
            forcing,
            boundary,
        }
    }

    /// Clamps `u = 1` where `source_mask > 0.5` and then `u = 0` where `sink_mask > 0.5`.
    ///
    /// Nodes selected by both masks end up with the sink value.
    pub fn with_source_and_sink(
        diffusivity: DMatrix<T>,
        forcing: DMatrix<T>,
        source_mask: DMatrix<T>,
        sink_mask: DMatrix<T>,
    ) -> Result<Self, FemError> {
        let shape = GridShape::new(source_mask.nrows(), source_mask.ncols());
        let boundary = BoundaryConditions::builder(shape)
            .with_condition(DirichletCondition::above_half(source_mask, T::one()))
            .with_condition(DirichletCondition::above_half(sink_mask, T::zero()))
            .build()?;
        Ok(Self::new(diffusivity, forcing, boundary))
    }

    pub fn diffusivity(&self) -> &DMatrix<T> {
        &self.diffusivity
    }

    pub fn forcing(&self) -> &DMatrix<T> {
        &self.forcing
    }

    pub fn boundary_conditions(&self) -> &BoundaryConditions<T> {
        &self.boundary
    }
}

#[derive(Debug, Clone)]
pub struct PoissonProblem<T: Scalar> {
    evaluator: FieldEvaluator<T>,
    instances: Vec<PoissonInstance<T>>,
    // Coefficients interpolated at quadrature points, one pair per instance
    diffusivity_at_qp: Vec<QuadratureField<T>>,
    forcing_at_qp: Vec<QuadratureField<T>>,
}

#[derive(Debug, Clone)]
pub struct PoissonProblemBuilder<T: Scalar> {
    evaluator: FieldEvaluator<T>,
    instances: Vec<PoissonInstance<T>>,
}

impl<T: Real> PoissonProblemBuilder<T> {
    pub fn with_instance(mut self, instance: PoissonInstance<T>) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn with_instances(mut self, instances: impl IntoIterator<Item = PoissonInstance<T>>) -> Self {
        self.instances.extend(instances);
        self
    }

    /// Validates all coefficient and mask shapes and interpolates the coefficients.
    pub fn build(self) -> Result<PoissonProblem<T>, FemError> {
        if self.instances.is_empty() {
            return Err(FemError::LayoutMismatch {
                expected_batch_size: 1,
                expected_components: 1,
                actual_batch_size: 0,
                actual_components: 1,
            });
        }

        let evaluator = self.evaluator;
        let mut diffusivity_at_qp = Vec::with_capacity(self.instances.len());
        let mut forcing_at_qp = Vec::with_capacity(self.instances.len());
        for instance in &self.instances {
            evaluator.check_shape("diffusivity", &instance.diffusivity)?;
            evaluator.check_shape("forcing", &instance.forcing)?;
            if instance.boundary.shape() != evaluator.shape() {
                return Err(FemError::ShapeMismatch {
                    what: "boundary conditions".to_string(),
                    expected: evaluator.shape().as_tuple(),
                    actual: instance.boundary.shape().as_tuple(),
                });
            }
            diffusivity_at_qp.push(evaluator.evaluate_value(&instance.diffusivity)?);
            forcing_at_qp.push(evaluator.evaluate_value(&instance.forcing)?);
        }

        Ok(PoissonProblem {
            evaluator,
            instances: self.instances,
            diffusivity_at_qp,
            forcing_at_qp,
        })
    }
}

impl<T: Real> PoissonProblem<T> {
    pub fn builder(evaluator: FieldEvaluator<T>) -> PoissonProblemBuilder<T> {
        PoissonProblemBuilder {
            evaluator,
            instances: Vec::new(),
        }
    }

    pub fn instances(&self) -> &[PoissonInstance<T>] {
        &self.instances
    }

    /// Loss of one instance. If `gradient` is given, it is overwritten with the gradient of
    /// the batch-mean loss with respect to that instance's nodal values.
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn evaluate_instance(
        &self,
        batch: usize,
        u: &DMatrix<T>,
        gradient: Option<&mut DMatrix<T>>,
    ) -> Result<T, FemError> {
        let instance = &self.instances[batch];
        let u = instance.boundary.apply(u)?;
        let u_qp = self.evaluator.evaluate(&u)?;
        let nu = &self.diffusivity_at_qp[batch];
        let f = &self.forcing_at_qp[batch];
        let gpw = self.evaluator.gpw();

        let loss = mean_over_elements(self.evaluator.num_elements(), |e| {
            izip!(
                gpw,
                nu.element(e),
                f.element(e),
                u_qp.value.element(e),
                u_qp.dx.element(e),
                u_qp.dy.element(e)
            )
            .fold(0.0, |r, (&w, &nu_q, &f_q, &u_q, &ux, &uy)| {
                r + w * (nu_q * (ux * ux + uy * uy) - u_q * f_q)
            })
        });

        if let Some(gradient) = gradient {
            let ne = self.evaluator.num_elements();
            let nq = self.evaluator.num_quadrature_points();
            let scale = 1.0 / T::from_usize(ne * self.instances.len()).unwrap();
            let seeds = QuadratureValues {
                value: QuadratureField::from_fn(ne, nq, |e, q| -scale * gpw[q] * f.get(e, q)),
                dx: QuadratureField::from_fn(ne, nq, |e, q| scale * gpw[q] * 2.0 * nu.get(e, q) * u_qp.dx.get(e, q)),
                dy: QuadratureField::from_fn(ne, nq, |e, q| scale * gpw[q] * 2.0 * nu.get(e, q) * u_qp.dy.get(e, q)),
            };
            gradient.fill(0.0);
            self.evaluator.accumulate_adjoint(&seeds, gradient)?;
            instance.boundary.project_gradient(gradient)?;
        }

        Ok(loss)
    }
}

impl<T: Real> WeakFormProblem<T> for PoissonProblem<T> {
    fn evaluator(&self) -> &FieldEvaluator<T> {
        &self.evaluator
    }

    fn num_components(&self) -> usize {
        1
    }

    fn batch_size(&self) -> usize {
        self.instances.len()
    }

    fn apply_boundary_conditions(&self, field: &NodalField<T>) -> Result<NodalField<T>, FemError> {
        self.check_field(field)?;
        let mut result = field.clone();
        for (b, instance) in self.instances.iter().enumerate() {
            instance.boundary.apply_in_place(result.component_mut(b, 0))?;
        }
        Ok(result)
    }

    fn loss(&self, field: &NodalField<T>) -> Result<T, FemError> {
        self.check_field(field)?;
        let mut total = T::zero();
        for b in 0..self.batch_size() {
            total += self.evaluate_instance(b, field.component(b, 0), None)?;
        }
        Ok(total / T::from_usize(self.batch_size()).unwrap())
    }

    fn loss_and_gradient(&self, field: &NodalField<T>, gradient: &mut NodalField<T>) -> Result<T, FemError> {
        self.check_field(field)?;
        self.check_field(gradient)?;
        let mut total = T::zero();
        for b in 0..self.batch_size() {
            total += self.evaluate_instance(b, field.component(b, 0), Some(gradient.component_mut(b, 0)))?;
        }
        Ok(total / T::from_usize(self.batch_size()).unwrap())
    }
}
