//! Dirichlet boundary conditions imposed by masked selection.
//!
//! A condition clamps every node whose mask entry passes its threshold to a prescribed value.
//! Conditions are resolved in order when the set is built: with [`OverlapPolicy::LastWins`] a
//! later condition overrides an earlier one at shared nodes, with [`OverlapPolicy::Reject`]
//! shared nodes are an error. Clamped nodes do not depend on the free field, so the gradient
//! of any loss with respect to them is zero.
use crate::error::FemError;
use crate::grid::GridShape;
use crate::nalgebra::{DMatrix, Scalar};
use crate::Real;
use serde::{Deserialize, Serialize};

/// Comparison that decides whether a mask entry selects its node.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum Threshold<T> {
    /// Select when `mask > t`.
    Above(T),
    /// Select when `mask >= t`.
    AtLeast(T),
}

impl<T: Real> Threshold<T> {
    pub fn selects(&self, mask_value: T) -> bool {
        match *self {
            Threshold::Above(t) => mask_value > t,
            Threshold::AtLeast(t) => mask_value >= t,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Prescribed<T: Scalar> {
    Constant(T),
    /// Node-wise prescribed values on the full grid. Only entries at selected nodes are used.
    Field(DMatrix<T>),
}

impl<T: Real> Prescribed<T> {
    pub fn at(&self, row: usize, col: usize) -> T {
        match self {
            Prescribed::Constant(value) => *value,
            Prescribed::Field(values) => values[(row, col)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirichletCondition<T: Scalar> {
    mask: DMatrix<T>,
    threshold: Threshold<T>,
    value: Prescribed<T>,
}

impl<T: Real> DirichletCondition<T> {
    pub fn new(mask: DMatrix<T>, threshold: Threshold<T>, value: Prescribed<T>) -> Self {
        Self { mask, threshold, value }
    }

    /// Clamps nodes with `mask > 0.5` to a constant.
    pub fn above_half(mask: DMatrix<T>, value: T) -> Self {
        Self::new(mask, Threshold::Above(half()), Prescribed::Constant(value))
    }

    /// Clamps nodes with `mask >= 0.5` to a constant.
    pub fn at_least_half(mask: DMatrix<T>, value: T) -> Self {
        Self::new(mask, Threshold::AtLeast(half()), Prescribed::Constant(value))
    }

    pub fn mask(&self) -> &DMatrix<T> {
        &self.mask
    }

    pub fn threshold(&self) -> Threshold<T> {
        self.threshold
    }

    pub fn value(&self) -> &Prescribed<T> {
        &self.value
    }

    pub fn selects(&self, row: usize, col: usize) -> bool {
        self.threshold.selects(self.mask[(row, col)])
    }
}

fn half<T: Real>() -> T {
    T::from_f64(0.5).unwrap()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlapPolicy {
    /// Later conditions take precedence at nodes selected by several conditions.
    #[default]
    LastWins,
    /// Nodes selected by several conditions are an error.
    Reject,
}

/// An ordered set of Dirichlet conditions on one grid component, resolved node by node.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryConditions<T: Scalar> {
    shape: GridShape,
    policy: OverlapPolicy,
    conditions: Vec<DirichletCondition<T>>,
    // Column-major, like the grids: index of the condition clamping each node
    owner: Vec<Option<usize>>,
    prescribed: DMatrix<T>,
}

impl<T: Real> BoundaryConditions<T> {
    /// A set without conditions: every node is free.
    pub fn none(shape: GridShape) -> Self {
        Self {
            shape,
            policy: OverlapPolicy::default(),
            conditions: Vec::new(),
            owner: vec![None; shape.num_nodes()],
            prescribed: DMatrix::zeros(shape.rows, shape.cols),
        }
    }

    pub fn builder(shape: GridShape) -> BoundaryConditionsBuilder<T> {
        BoundaryConditionsBuilder {
            shape,
            policy: OverlapPolicy::default(),
            conditions: Vec::new(),
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn conditions(&self) -> &[DirichletCondition<T>] {
        &self.conditions
    }

    fn linear_index(&self, row: usize, col: usize) -> usize {
        col * self.shape.rows + row
    }

    pub fn is_clamped(&self, row: usize, col: usize) -> bool {
        self.owner[self.linear_index(row, col)].is_some()
    }

    /// Index of the condition that determines the value at a node, if any.
    pub fn owner(&self, row: usize, col: usize) -> Option<usize> {
        self.owner[self.linear_index(row, col)]
    }

    pub fn num_clamped(&self) -> usize {
        self.owner.iter().filter(|owner| owner.is_some()).count()
    }

    /// Indicator grid with one at clamped nodes and zero elsewhere.
    pub fn clamped(&self) -> DMatrix<T> {
        DMatrix::from_fn(self.shape.rows, self.shape.cols, |i, j| {
            if self.is_clamped(i, j) {
                T::one()
            } else {
                T::zero()
            }
        })
    }

    fn check_grid(&self, what: &str, grid: &DMatrix<T>) -> Result<(), FemError> {
        if grid.shape() != self.shape.as_tuple() {
            return Err(FemError::ShapeMismatch {
                what: what.to_string(),
                expected: self.shape.as_tuple(),
                actual: grid.shape(),
            });
        }
        Ok(())
    }

    /// Overwrites clamped nodes of `field` with their prescribed values.
    pub fn apply_in_place(&self, field: &mut DMatrix<T>) -> Result<(), FemError> {
        self.check_grid("boundary-conditioned field", field)?;
        for ((entry, owner), prescribed) in field
            .as_mut_slice()
            .iter_mut()
            .zip(&self.owner)
            .zip(self.prescribed.as_slice())
        {
            if owner.is_some() {
                *entry = *prescribed;
            }
        }
        Ok(())
    }

    /// Returns a copy of `field` with clamped nodes set to their prescribed values.
    ///
    /// Applying the conditions to an already conditioned field leaves it unchanged.
    pub fn apply(&self, field: &DMatrix<T>) -> Result<DMatrix<T>, FemError> {
        let mut result = field.clone();
        self.apply_in_place(&mut result)?;
        Ok(result)
    }

    /// Zeroes the gradient at clamped nodes.
    pub fn project_gradient(&self, gradient: &mut DMatrix<T>) -> Result<(), FemError> {
        self.check_grid("boundary-conditioned gradient", gradient)?;
        for (entry, owner) in gradient.as_mut_slice().iter_mut().zip(&self.owner) {
            if owner.is_some() {
                *entry = T::zero();
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BoundaryConditionsBuilder<T: Scalar> {
    shape: GridShape,
    policy: OverlapPolicy,
    conditions: Vec<DirichletCondition<T>>,
}

impl<T: Real> BoundaryConditionsBuilder<T> {
    pub fn with_policy(self, policy: OverlapPolicy) -> Self {
        Self { policy, ..self }
    }

    /// Appends a condition. Conditions added later come later in the resolution order.
    pub fn with_condition(mut self, condition: DirichletCondition<T>) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn build(self) -> Result<BoundaryConditions<T>, FemError> {
        let mut result = BoundaryConditions::none(self.shape);
        result.policy = self.policy;

        for (k, condition) in self.conditions.iter().enumerate() {
            result.check_grid(&format!("mask of boundary condition {}", k), &condition.mask)?;
            if let Prescribed::Field(values) = &condition.value {
                result.check_grid(&format!("prescribed values of boundary condition {}", k), values)?;
            }

            for col in 0..self.shape.cols {
                for row in 0..self.shape.rows {
                    if !condition.selects(row, col) {
                        continue;
                    }
                    let index = result.linear_index(row, col);
                    if let (Some(first), OverlapPolicy::Reject) = (result.owner[index], self.policy) {
                        return Err(FemError::OverlappingConditions {
                            first,
                            second: k,
                            row,
                            col,
                        });
                    }
                    result.owner[index] = Some(k);
                    result.prescribed[(row, col)] = condition.value.at(row, col);
                }
            }
        }

        result.conditions = self.conditions;
        Ok(result)
    }
}
