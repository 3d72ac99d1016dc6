//! Interpolation and differentiation of nodal grids at element quadrature points.
//!
//! For each element the evaluator gathers the `(p + 1)^2` nodal values of its block and
//! contracts them with the basis table, producing values and physical x/y derivatives at every
//! quadrature point. The adjoint contracts quadrature-point sensitivities with the same tables
//! and scatters the result back to the nodes.
use crate::basis::BasisTable;
use crate::element::LagrangeQuad;
use crate::error::FemError;
use crate::grid::{GridGeometry, GridShape};
use crate::nalgebra::{DMatrix, Scalar};
use crate::quadrature::{Quadrature, QuadratureRule};
use crate::Real;
use itertools::izip;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A scalar quantity at every quadrature point of every element.
///
/// Storage is element-major: the values for one element are contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadratureField<T: Scalar> {
    num_elements: usize,
    num_quadrature_points: usize,
    values: Vec<T>,
}

impl<T> QuadratureField<T>
where
    T: Real,
{
    pub fn zeros(num_elements: usize, num_quadrature_points: usize) -> Self {
        Self {
            num_elements,
            num_quadrature_points,
            values: vec![T::zero(); num_elements * num_quadrature_points],
        }
    }

    pub fn from_fn(
        num_elements: usize,
        num_quadrature_points: usize,
        mut f: impl FnMut(usize, usize) -> T,
    ) -> Self {
        let mut values = Vec::with_capacity(num_elements * num_quadrature_points);
        for e in 0..num_elements {
            for q in 0..num_quadrature_points {
                values.push(f(e, q));
            }
        }
        Self {
            num_elements,
            num_quadrature_points,
            values,
        }
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.num_quadrature_points
    }

    pub fn get(&self, element_index: usize, q: usize) -> T {
        self.values[element_index * self.num_quadrature_points + q]
    }

    pub fn element(&self, element_index: usize) -> &[T] {
        let nq = self.num_quadrature_points;
        &self.values[element_index * nq..(element_index + 1) * nq]
    }

    pub fn element_mut(&mut self, element_index: usize) -> &mut [T] {
        let nq = self.num_quadrature_points;
        &mut self.values[element_index * nq..(element_index + 1) * nq]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    pub fn fill(&mut self, value: T) {
        self.values.iter_mut().for_each(|x| *x = value);
    }
}

/// Values and physical derivatives of a field at quadrature points.
///
/// The same structure carries sensitivities `d loss / d value`, `d loss / d (dx)` and
/// `d loss / d (dy)` into [`FieldEvaluator::accumulate_adjoint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadratureValues<T: Scalar> {
    pub value: QuadratureField<T>,
    pub dx: QuadratureField<T>,
    pub dy: QuadratureField<T>,
}

impl<T> QuadratureValues<T>
where
    T: Real,
{
    pub fn zeros(num_elements: usize, num_quadrature_points: usize) -> Self {
        Self {
            value: QuadratureField::zeros(num_elements, num_quadrature_points),
            dx: QuadratureField::zeros(num_elements, num_quadrature_points),
            dy: QuadratureField::zeros(num_elements, num_quadrature_points),
        }
    }
}

/// Evaluates grid functions at the quadrature points of a structured grid.
///
/// All tables are built once at construction and shared read-only, so a single evaluator can
/// serve every batch instance and every component of a problem.
#[derive(Debug, Clone)]
pub struct FieldEvaluator<T: Scalar> {
    geometry: GridGeometry<T>,
    quadrature: QuadratureRule<T>,
    basis: BasisTable<T>,
    gpw: Vec<T>,
    // Basis derivative tables already scaled to physical coordinates
    dx_table: Vec<T>,
    dy_table: Vec<T>,
}

impl<T> FieldEvaluator<T>
where
    T: Real,
{
    pub fn new(shape: GridShape, degree: usize) -> Result<Self, FemError> {
        let geometry = GridGeometry::new(shape, degree)?;
        let quadrature = QuadratureRule::for_basis_degree(degree)?;
        let element = LagrangeQuad::new(degree)?;
        let basis = BasisTable::from_element_and_points(&element, quadrature.points());

        let det_j = geometry.jacobian_determinant();
        let gpw = quadrature.weights().iter().map(|w| *w * det_j).collect();

        let (scale_x, scale_y) = geometry.derivative_scale();
        let num_qp = quadrature.len();
        let mut dx_table = Vec::with_capacity(num_qp * basis.num_nodes());
        let mut dy_table = Vec::with_capacity(num_qp * basis.num_nodes());
        for q in 0..num_qp {
            dx_table.extend(basis.d_xi_at(q).iter().map(|d| *d * scale_x));
            dy_table.extend(basis.d_eta_at(q).iter().map(|d| *d * scale_y));
        }

        Ok(Self {
            geometry,
            quadrature,
            basis,
            gpw,
            dx_table,
            dy_table,
        })
    }

    /// Evaluator for a square grid with `domain_size` nodes per side.
    pub fn square(domain_size: usize, degree: usize) -> Result<Self, FemError> {
        Self::new(GridShape::square(domain_size), degree)
    }

    pub fn geometry(&self) -> &GridGeometry<T> {
        &self.geometry
    }

    pub fn quadrature(&self) -> &QuadratureRule<T> {
        &self.quadrature
    }

    pub fn basis(&self) -> &BasisTable<T> {
        &self.basis
    }

    pub fn shape(&self) -> GridShape {
        self.geometry.shape()
    }

    pub fn degree(&self) -> usize {
        self.geometry.degree()
    }

    pub fn num_elements(&self) -> usize {
        self.geometry.num_elements()
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.quadrature.len()
    }

    /// Integration weights `w_q * det(J)` for each quadrature point, identical for all elements.
    pub fn gpw(&self) -> &[T] {
        &self.gpw
    }

    /// Returns an error unless `grid` has the evaluator's grid shape.
    pub fn check_shape(&self, what: &str, grid: &DMatrix<T>) -> Result<(), FemError> {
        let expected = self.shape().as_tuple();
        if grid.shape() != expected {
            return Err(FemError::ShapeMismatch {
                what: what.to_string(),
                expected,
                actual: grid.shape(),
            });
        }
        Ok(())
    }

    fn gather(&self, element_index: usize, grid: &DMatrix<T>, local_values: &mut [T]) {
        let n = self.geometry.degree() + 1;
        let (row, col) = self.geometry.element_origin(element_index);
        for b in 0..n {
            for a in 0..n {
                local_values[b * n + a] = grid[(row + b, col + a)];
            }
        }
    }

    fn contract_into(&self, table: &[T], local_values: &[T], output: &mut [T]) {
        let num_nodes = self.basis.num_nodes();
        for (q, out) in output.iter_mut().enumerate() {
            let row = &table[q * num_nodes..(q + 1) * num_nodes];
            *out = row
                .iter()
                .zip(local_values)
                .fold(T::zero(), |acc, (phi, u)| acc + *phi * *u);
        }
    }

    fn evaluate_table(&self, table: &[T], grid: &DMatrix<T>, what: &str) -> Result<QuadratureField<T>, FemError> {
        self.check_shape(what, grid)?;
        let nq = self.num_quadrature_points();
        let mut result = QuadratureField::zeros(self.num_elements(), nq);
        result
            .as_mut_slice()
            .par_chunks_mut(nq)
            .enumerate()
            .for_each_init(
                || vec![T::zero(); self.basis.num_nodes()],
                |local_values, (e, output)| {
                    self.gather(e, grid, local_values);
                    self.contract_into(table, local_values, output);
                },
            );
        Ok(result)
    }

    /// Values of the interpolated grid function at every quadrature point.
    pub fn evaluate_value(&self, grid: &DMatrix<T>) -> Result<QuadratureField<T>, FemError> {
        self.evaluate_table(self.basis.flat_values(), grid, "evaluated grid")
    }

    pub fn evaluate_derivative_x(&self, grid: &DMatrix<T>) -> Result<QuadratureField<T>, FemError> {
        self.evaluate_table(&self.dx_table, grid, "evaluated grid")
    }

    pub fn evaluate_derivative_y(&self, grid: &DMatrix<T>) -> Result<QuadratureField<T>, FemError> {
        self.evaluate_table(&self.dy_table, grid, "evaluated grid")
    }

    /// Value, x derivative and y derivative at every quadrature point in a single pass.
    pub fn evaluate(&self, grid: &DMatrix<T>) -> Result<QuadratureValues<T>, FemError> {
        self.check_shape("evaluated grid", grid)?;
        let nq = self.num_quadrature_points();
        let mut result = QuadratureValues::zeros(self.num_elements(), nq);
        let values = self.basis.flat_values();

        let QuadratureValues { value, dx, dy } = &mut result;
        value
            .as_mut_slice()
            .par_chunks_mut(nq)
            .zip(dx.as_mut_slice().par_chunks_mut(nq))
            .zip(dy.as_mut_slice().par_chunks_mut(nq))
            .enumerate()
            .for_each_init(
                || vec![T::zero(); self.basis.num_nodes()],
                |local_values, (e, ((value, dx), dy))| {
                    self.gather(e, grid, local_values);
                    self.contract_into(values, local_values, value);
                    self.contract_into(&self.dx_table, local_values, dx);
                    self.contract_into(&self.dy_table, local_values, dy);
                },
            );
        Ok(result)
    }

    /// Evaluates each grid of a batch.
    pub fn evaluate_batch(&self, grids: &[DMatrix<T>]) -> Result<Vec<QuadratureValues<T>>, FemError> {
        grids.iter().map(|grid| self.evaluate(grid)).collect()
    }

    /// Adds the transpose of [`evaluate`](Self::evaluate) applied to `seeds` into `gradient`.
    ///
    /// For every node this adds `sum_e sum_q (s_v N + s_x dN/dx + s_y dN/dy)` over all elements
    /// containing the node. Element contributions are computed in parallel and scattered
    /// sequentially in element order, so the result is deterministic.
    pub fn accumulate_adjoint(&self, seeds: &QuadratureValues<T>, gradient: &mut DMatrix<T>) -> Result<(), FemError> {
        self.check_shape("adjoint gradient", gradient)?;
        let num_elements = self.num_elements();
        let nq = self.num_quadrature_points();
        for seed in [&seeds.value, &seeds.dx, &seeds.dy] {
            if seed.num_elements() != num_elements || seed.num_quadrature_points() != nq {
                return Err(FemError::ShapeMismatch {
                    what: "quadrature sensitivities".to_string(),
                    expected: (num_elements, nq),
                    actual: (seed.num_elements(), seed.num_quadrature_points()),
                });
            }
        }

        let num_nodes = self.basis.num_nodes();
        let mut local_contributions = vec![T::zero(); num_elements * num_nodes];
        local_contributions
            .par_chunks_mut(num_nodes)
            .enumerate()
            .for_each(|(e, local)| {
                for (q, s_v, s_x, s_y) in izip!(
                    0..nq,
                    seeds.value.element(e),
                    seeds.dx.element(e),
                    seeds.dy.element(e)
                ) {
                    let range = q * num_nodes..(q + 1) * num_nodes;
                    for (out, phi, dphi_dx, dphi_dy) in izip!(
                        local.iter_mut(),
                        self.basis.values_at(q),
                        &self.dx_table[range.clone()],
                        &self.dy_table[range]
                    ) {
                        *out += *s_v * *phi + *s_x * *dphi_dx + *s_y * *dphi_dy;
                    }
                }
            });

        for (e, local) in local_contributions.chunks(num_nodes).enumerate() {
            for (i, contribution) in local.iter().enumerate() {
                let (row, col) = self.geometry.element_node(e, i);
                gradient[(row, col)] += *contribution;
            }
        }
        Ok(())
    }

    /// Integrates a quadrature-point density over each element with the weights [`gpw`](Self::gpw).
    pub fn integrate_elementwise(&self, density: &QuadratureField<T>) -> Vec<T> {
        (0..density.num_elements())
            .map(|e| {
                density
                    .element(e)
                    .iter()
                    .zip(&self.gpw)
                    .fold(T::zero(), |acc, (f, w)| acc + *f * *w)
            })
            .collect()
    }
}
