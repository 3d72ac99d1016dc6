//! Incompressible Stokes flow in velocity-pressure form.
//!
//! The field has three components `(u, v, p)`. With forcing `f = 1 / Re`, divergence
//! `d = u_x + v_y` and integration weights `gpw_q`, each quadrature point contributes
//!
//! ```text
//! R1 = gpw_q ((u_x^2 + u_y^2 + v_x^2 + v_y^2) f - p d)^2
//! R2 = gpw_q ((p d)^2 + beta p_x^2)
//! ```
//!
//! and the element loss is `sum_q R1 + gamma sum_q R2`. The loss is the mean over elements and
//! batch instances.
//!
//! The residuals are polynomials of higher degree than the Gauss rule integrates exactly, so
//! the quadrature is an approximation for this problem.
use crate::boundary::{BoundaryConditions, DirichletCondition, Prescribed, Threshold};
use crate::error::FemError;
use crate::evaluate::{FieldEvaluator, QuadratureField, QuadratureValues};
use crate::field::NodalField;
use crate::grid::GridShape;
use crate::nalgebra::{DMatrix, Scalar};
use crate::problem::{mean_over_elements, WeakFormProblem};
use crate::Real;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

pub const VELOCITY_X: usize = 0;
pub const VELOCITY_Y: usize = 1;
pub const PRESSURE: usize = 2;

/// Relative weights of the continuity residual and the pressure stabilization.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct StokesWeights<T> {
    /// Weight `gamma` of the continuity and stabilization terms relative to the momentum term.
    pub continuity: T,
    /// Weight `beta` of the pressure gradient penalty `p_x^2`.
    pub pressure_stabilization: T,
}

impl<T: Real> Default for StokesWeights<T> {
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn default() -> Self {
        Self {
            continuity: 100.0,
            pressure_stabilization: 0.01,
        }
    }
}

/// Forcing and per-component boundary conditions of one Stokes problem in a batch.
#[derive(Debug, Clone)]
pub struct StokesInstance<T: Scalar> {
    forcing: DMatrix<T>,
    boundary: [BoundaryConditions<T>; 3],
}

impl<T: Real> StokesInstance<T> {
    pub fn new(
        forcing: DMatrix<T>,
        boundary_u: BoundaryConditions<T>,
        boundary_v: BoundaryConditions<T>,
        boundary_p: BoundaryConditions<T>,
    ) -> Self {
        Self {
            forcing,
            boundary: [boundary_u, boundary_v, boundary_p],
        }
    }

    /// The standard wall/lid/pressure-pin conditions.
    ///
    /// With masks compared against `>= 0.5`:
    ///
    /// - `u` is zero on the walls and then equal to `lid_velocity` on the lid, so the lid wins
    ///   at nodes shared with the walls,
    /// - `v` is zero on the walls and on the lid,
    /// - `p` is zero at the pin.
    pub fn with_wall_lid_and_pin(
        forcing: DMatrix<T>,
        wall_mask: DMatrix<T>,
        lid_mask: DMatrix<T>,
        pin_mask: DMatrix<T>,
        lid_velocity: Prescribed<T>,
    ) -> Result<Self, FemError> {
        let shape = GridShape::new(wall_mask.nrows(), wall_mask.ncols());
        let half = Threshold::AtLeast(T::from_f64(0.5).unwrap());
        let boundary_u = BoundaryConditions::builder(shape)
            .with_condition(DirichletCondition::new(wall_mask.clone(), half, Prescribed::Constant(T::zero())))
            .with_condition(DirichletCondition::new(lid_mask.clone(), half, lid_velocity))
            .build()?;
        let boundary_v = BoundaryConditions::builder(shape)
            .with_condition(DirichletCondition::at_least_half(wall_mask, T::zero()))
            .with_condition(DirichletCondition::at_least_half(lid_mask, T::zero()))
            .build()?;
        let boundary_p = BoundaryConditions::builder(shape)
            .with_condition(DirichletCondition::at_least_half(pin_mask, T::zero()))
            .build()?;
        Ok(Self::new(forcing, boundary_u, boundary_v, boundary_p))
    }

    pub fn forcing(&self) -> &DMatrix<T> {
        &self.forcing
    }

    /// Boundary conditions of the given component (`VELOCITY_X`, `VELOCITY_Y` or `PRESSURE`).
    pub fn boundary_conditions(&self, component: usize) -> &BoundaryConditions<T> {
        &self.boundary[component]
    }
}

#[derive(Debug, Clone)]
pub struct StokesProblem<T: Scalar> {
    evaluator: FieldEvaluator<T>,
    weights: StokesWeights<T>,
    instances: Vec<StokesInstance<T>>,
    forcing_at_qp: Vec<QuadratureField<T>>,
}

#[derive(Debug, Clone)]
pub struct StokesProblemBuilder<T: Scalar> {
    evaluator: FieldEvaluator<T>,
    weights: StokesWeights<T>,
    instances: Vec<StokesInstance<T>>,
}

impl<T: Real> StokesProblemBuilder<T> {
    pub fn with_weights(self, weights: StokesWeights<T>) -> Self {
        Self { weights, ..self }
    }

    pub fn with_instance(mut self, instance: StokesInstance<T>) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn build(self) -> Result<StokesProblem<T>, FemError> {
        if self.instances.is_empty() {
            return Err(FemError::LayoutMismatch {
                expected_batch_size: 1,
                expected_components: 3,
                actual_batch_size: 0,
                actual_components: 3,
            });
        }

        let evaluator = self.evaluator;
        let mut forcing_at_qp = Vec::with_capacity(self.instances.len());
        for instance in &self.instances {
            evaluator.check_shape("forcing", &instance.forcing)?;
            for boundary in &instance.boundary {
                if boundary.shape() != evaluator.shape() {
                    return Err(FemError::ShapeMismatch {
                        what: "boundary conditions".to_string(),
                        expected: evaluator.shape().as_tuple(),
                        actual: boundary.shape().as_tuple(),
                    });
                }
            }
            forcing_at_qp.push(evaluator.evaluate_value(&instance.forcing)?);
        }

        Ok(StokesProblem {
            evaluator,
            weights: self.weights,
            instances: self.instances,
            forcing_at_qp,
        })
    }
}

/// Field quantities entering the residuals at one quadrature point.
#[derive(Debug, Copy, Clone)]
struct PointState<T> {
    ux: T,
    uy: T,
    vx: T,
    vy: T,
    p: T,
    px: T,
    f: T,
    gpw: T,
}

/// Partial derivatives of the point residual with respect to the entries of `PointState`.
#[derive(Debug, Copy, Clone)]
struct PointSensitivity<T> {
    ux: T,
    uy: T,
    vx: T,
    vy: T,
    p: T,
    px: T,
}

impl<T: Real> StokesProblem<T> {
    pub fn builder(evaluator: FieldEvaluator<T>) -> StokesProblemBuilder<T> {
        StokesProblemBuilder {
            evaluator,
            weights: StokesWeights::default(),
            instances: Vec::new(),
        }
    }

    pub fn weights(&self) -> &StokesWeights<T> {
        &self.weights
    }

    pub fn instances(&self) -> &[StokesInstance<T>] {
        &self.instances
    }

    fn point_residual(&self, s: &PointState<T>) -> T {
        let StokesWeights {
            continuity: gamma,
            pressure_stabilization: beta,
        } = self.weights;
        let divergence = s.ux + s.vy;
        let r1 = (s.ux * s.ux + s.uy * s.uy + s.vx * s.vx + s.vy * s.vy) * s.f - s.p * divergence;
        let r2 = (s.p * divergence) * (s.p * divergence) + beta * s.px * s.px;
        s.gpw * (r1 * r1 + gamma * r2)
    }

    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn point_sensitivity(&self, s: &PointState<T>) -> PointSensitivity<T> {
        let StokesWeights {
            continuity: gamma,
            pressure_stabilization: beta,
        } = self.weights;
        let divergence = s.ux + s.vy;
        let r1 = (s.ux * s.ux + s.uy * s.uy + s.vx * s.vx + s.vy * s.vy) * s.f - s.p * divergence;
        let w = s.gpw;
        let continuity_velocity = gamma * 2.0 * s.p * s.p * divergence;
        PointSensitivity {
            ux: w * (2.0 * r1 * (2.0 * s.ux * s.f - s.p) + continuity_velocity),
            uy: w * 2.0 * r1 * 2.0 * s.uy * s.f,
            vx: w * 2.0 * r1 * 2.0 * s.vx * s.f,
            vy: w * (2.0 * r1 * (2.0 * s.vy * s.f - s.p) + continuity_velocity),
            p: w * (-2.0 * r1 * divergence + gamma * 2.0 * s.p * divergence * divergence),
            px: w * gamma * 2.0 * beta * s.px,
        }
    }

    /// Applies the boundary conditions of one instance and evaluates `(u, v, p)`.
    fn evaluate_components(&self, batch: usize, field: &NodalField<T>) -> Result<[QuadratureValues<T>; 3], FemError> {
        let instance = &self.instances[batch];
        let evaluate = |component: usize| -> Result<QuadratureValues<T>, FemError> {
            let grid = instance.boundary[component].apply(field.component(batch, component))?;
            self.evaluator.evaluate(&grid)
        };
        Ok([evaluate(VELOCITY_X)?, evaluate(VELOCITY_Y)?, evaluate(PRESSURE)?])
    }

    fn point_state(&self, batch: usize, qp: &[QuadratureValues<T>; 3], e: usize, q: usize) -> PointState<T> {
        let [u, v, p] = qp;
        PointState {
            ux: u.dx.get(e, q),
            uy: u.dy.get(e, q),
            vx: v.dx.get(e, q),
            vy: v.dy.get(e, q),
            p: p.value.get(e, q),
            px: p.dx.get(e, q),
            f: self.forcing_at_qp[batch].get(e, q),
            gpw: self.evaluator.gpw()[q],
        }
    }

    fn instance_loss(&self, batch: usize, qp: &[QuadratureValues<T>; 3]) -> T {
        let nq = self.evaluator.num_quadrature_points();
        mean_over_elements(self.evaluator.num_elements(), |e| {
            (0..nq).fold(T::zero(), |r, q| r + self.point_residual(&self.point_state(batch, qp, e, q)))
        })
    }

    fn instance_gradient(
        &self,
        batch: usize,
        qp: &[QuadratureValues<T>; 3],
        gradient: &mut NodalField<T>,
    ) -> Result<(), FemError> {
        let ne = self.evaluator.num_elements();
        let nq = self.evaluator.num_quadrature_points();
        let scale = T::one() / T::from_usize(ne * self.instances.len()).unwrap();

        let mut seeds = [
            QuadratureValues::zeros(ne, nq),
            QuadratureValues::zeros(ne, nq),
            QuadratureValues::zeros(ne, nq),
        ];
        for e in 0..ne {
            for q in 0..nq {
                let sensitivity = self.point_sensitivity(&self.point_state(batch, qp, e, q));
                let [u, v, p] = &mut seeds;
                u.dx.element_mut(e)[q] = scale * sensitivity.ux;
                u.dy.element_mut(e)[q] = scale * sensitivity.uy;
                v.dx.element_mut(e)[q] = scale * sensitivity.vx;
                v.dy.element_mut(e)[q] = scale * sensitivity.vy;
                p.value.element_mut(e)[q] = scale * sensitivity.p;
                p.dx.element_mut(e)[q] = scale * sensitivity.px;
            }
        }

        for (component, seed) in seeds.iter().enumerate() {
            let grid = gradient.component_mut(batch, component);
            grid.fill(T::zero());
            self.evaluator.accumulate_adjoint(seed, grid)?;
            self.instances[batch].boundary[component].project_gradient(grid)?;
        }
        Ok(())
    }
}

impl<T: Real> WeakFormProblem<T> for StokesProblem<T> {
    fn evaluator(&self) -> &FieldEvaluator<T> {
        &self.evaluator
    }

    fn num_components(&self) -> usize {
        3
    }

    fn batch_size(&self) -> usize {
        self.instances.len()
    }

    fn apply_boundary_conditions(&self, field: &NodalField<T>) -> Result<NodalField<T>, FemError> {
        self.check_field(field)?;
        let mut result = field.clone();
        for (b, instance) in self.instances.iter().enumerate() {
            for (component, boundary) in instance.boundary.iter().enumerate() {
                boundary.apply_in_place(result.component_mut(b, component))?;
            }
        }
        Ok(result)
    }

    fn loss(&self, field: &NodalField<T>) -> Result<T, FemError> {
        self.check_field(field)?;
        let mut total = T::zero();
        for b in 0..self.batch_size() {
            let qp = self.evaluate_components(b, field)?;
            total += self.instance_loss(b, &qp);
        }
        Ok(total / T::from_usize(self.batch_size()).unwrap())
    }

    fn loss_and_gradient(&self, field: &NodalField<T>, gradient: &mut NodalField<T>) -> Result<T, FemError> {
        self.check_field(field)?;
        self.check_field(gradient)?;
        let mut total = T::zero();
        for b in 0..self.batch_size() {
            let qp = self.evaluate_components(b, field)?;
            total += self.instance_loss(b, &qp);
            self.instance_gradient(b, &qp, gradient)?;
        }
        Ok(total / T::from_usize(self.batch_size()).unwrap())
    }
}
