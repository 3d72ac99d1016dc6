//! Nodal fields: the free parameters of a weak-form problem.
use crate::error::FemError;
use crate::grid::GridShape;
use crate::nalgebra::{DMatrix, DVector, DVectorView, Scalar};
use crate::Real;
use rand::distributions::Uniform;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A batch of multi-component grid functions.
///
/// Every `(batch, component)` pair owns one grid of the common shape, with grid rows along
/// the y axis and grid columns along the x axis.
///
/// # Flat layout
///
/// [`to_vector`](Self::to_vector) and [`copy_from_vector`](Self::copy_from_vector) use a
/// batch-major layout: all components of the first batch instance come first, and within a
/// component the entries follow nalgebra's column-major storage of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodalField<T: Scalar> {
    shape: GridShape,
    batch_size: usize,
    num_components: usize,
    grids: Vec<DMatrix<T>>,
}

impl<T> NodalField<T>
where
    T: Real,
{
    pub fn from_element(batch_size: usize, num_components: usize, shape: GridShape, value: T) -> Self {
        let grids = (0..batch_size * num_components)
            .map(|_| DMatrix::from_element(shape.rows, shape.cols, value))
            .collect();
        Self {
            shape,
            batch_size,
            num_components,
            grids,
        }
    }

    pub fn zeros(batch_size: usize, num_components: usize, shape: GridShape) -> Self {
        Self::from_element(batch_size, num_components, shape, T::zero())
    }

    /// Builds a field from grids ordered batch-major (`index = batch * num_components + component`).
    pub fn from_grids(batch_size: usize, num_components: usize, grids: Vec<DMatrix<T>>) -> Result<Self, FemError> {
        let shape = match grids.first() {
            Some(first) if grids.len() == batch_size * num_components => GridShape::new(first.nrows(), first.ncols()),
            _ => {
                return Err(FemError::GridCountMismatch {
                    batch_size,
                    num_components,
                    num_grids: grids.len(),
                })
            }
        };
        Self::validated(shape, batch_size, num_components, grids)
    }

    /// Checks that `grids` holds `batch_size * num_components` grids of the given shape.
    pub(crate) fn validated(
        shape: GridShape,
        batch_size: usize,
        num_components: usize,
        grids: Vec<DMatrix<T>>,
    ) -> Result<Self, FemError> {
        if grids.len() != batch_size * num_components {
            return Err(FemError::GridCountMismatch {
                batch_size,
                num_components,
                num_grids: grids.len(),
            });
        }
        for (i, grid) in grids.iter().enumerate() {
            if grid.shape() != shape.as_tuple() {
                return Err(FemError::ShapeMismatch {
                    what: format!("grid {} of nodal field", i),
                    expected: shape.as_tuple(),
                    actual: grid.shape(),
                });
            }
        }
        Ok(Self {
            shape,
            batch_size,
            num_components,
            grids,
        })
    }

    /// A field with entries drawn independently and uniformly from `[low, high)`.
    ///
    /// # Panics
    ///
    /// Panics if `low >= high`.
    pub fn random_uniform<R: Rng + ?Sized>(
        batch_size: usize,
        num_components: usize,
        shape: GridShape,
        low: f64,
        high: f64,
        rng: &mut R,
    ) -> Self {
        let distribution = Uniform::new(low, high);
        let grids = (0..batch_size * num_components)
            .map(|_| {
                DMatrix::from_fn(shape.rows, shape.cols, |_, _| {
                    T::from_f64(rng.sample(distribution)).expect("Sample must be representable in T")
                })
            })
            .collect();
        Self {
            shape,
            batch_size,
            num_components,
            grids,
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    /// Total number of scalar entries across all grids.
    pub fn len(&self) -> usize {
        self.grids.len() * self.shape.num_nodes()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn component(&self, batch: usize, component: usize) -> &DMatrix<T> {
        &self.grids[self.grid_index(batch, component)]
    }

    pub fn component_mut(&mut self, batch: usize, component: usize) -> &mut DMatrix<T> {
        let index = self.grid_index(batch, component);
        &mut self.grids[index]
    }

    pub(crate) fn into_grids(self) -> Vec<DMatrix<T>> {
        self.grids
    }

    /// All grids in batch-major order.
    pub fn grids(&self) -> &[DMatrix<T>] {
        &self.grids
    }

    fn grid_index(&self, batch: usize, component: usize) -> usize {
        assert!(batch < self.batch_size, "Batch index out of bounds");
        assert!(component < self.num_components, "Component index out of bounds");
        batch * self.num_components + component
    }

    pub fn fill(&mut self, value: T) {
        for grid in &mut self.grids {
            grid.fill(value);
        }
    }

    /// Returns an error unless the field has the given layout and grid shape.
    pub fn check_layout(&self, batch_size: usize, num_components: usize, shape: GridShape) -> Result<(), FemError> {
        if self.batch_size != batch_size || self.num_components != num_components {
            return Err(FemError::LayoutMismatch {
                expected_batch_size: batch_size,
                expected_components: num_components,
                actual_batch_size: self.batch_size,
                actual_components: self.num_components,
            });
        }
        if self.shape != shape {
            return Err(FemError::ShapeMismatch {
                what: "nodal field".to_string(),
                expected: shape.as_tuple(),
                actual: self.shape.as_tuple(),
            });
        }
        Ok(())
    }

    pub fn to_vector(&self) -> DVector<T> {
        let mut vector = DVector::zeros(self.len());
        let chunk_size = self.shape.num_nodes();
        for (chunk, grid) in vector.as_mut_slice().chunks_mut(chunk_size).zip(&self.grids) {
            chunk.copy_from_slice(grid.as_slice());
        }
        vector
    }

    /// Overwrites the field with the entries of a flat vector in the layout of `to_vector`.
    ///
    /// # Panics
    ///
    /// Panics if the vector length differs from [`len`](Self::len).
    pub fn copy_from_vector(&mut self, vector: DVectorView<T>) {
        assert_eq!(vector.len(), self.len(), "Vector length must match the field size");
        let chunk_size = self.shape.num_nodes();
        for (i, grid) in self.grids.iter_mut().enumerate() {
            let chunk = vector.rows(i * chunk_size, chunk_size);
            grid.as_mut_slice()
                .iter_mut()
                .zip(chunk.iter())
                .for_each(|(dst, src)| *dst = *src);
        }
    }

    /// Largest absolute entry over all grids, or zero for an empty field.
    pub fn amax(&self) -> T {
        self.grids
            .iter()
            .fold(T::zero(), |acc, grid| acc.max(grid.amax()))
    }
}
