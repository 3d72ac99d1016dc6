use weakgrid::boundary::{BoundaryConditions, DirichletCondition, OverlapPolicy, Prescribed, Threshold};
use weakgrid::error::FemError;
use weakgrid::grid::GridShape;
use weakgrid::nalgebra::DMatrix;

fn row_mask(shape: GridShape, row: usize) -> DMatrix<f64> {
    DMatrix::from_fn(shape.rows, shape.cols, |i, _| if i == row { 1.0 } else { 0.0 })
}

fn col_mask(shape: GridShape, col: usize) -> DMatrix<f64> {
    DMatrix::from_fn(shape.rows, shape.cols, |_, j| if j == col { 1.0 } else { 0.0 })
}

fn test_field(shape: GridShape) -> DMatrix<f64> {
    DMatrix::from_fn(shape.rows, shape.cols, |i, j| 10.0 * i as f64 + j as f64 + 0.25)
}

#[test]
fn apply_clamps_selected_nodes_only() {
    let shape = GridShape::new(4, 5);
    let conditions = BoundaryConditions::builder(shape)
        .with_condition(DirichletCondition::above_half(row_mask(shape, 0), 1.0))
        .build()
        .unwrap();
    let field = test_field(shape);
    let result = conditions.apply(&field).unwrap();
    for i in 0..shape.rows {
        for j in 0..shape.cols {
            let expected = if i == 0 { 1.0 } else { field[(i, j)] };
            assert_eq!(result[(i, j)], expected);
            assert_eq!(conditions.is_clamped(i, j), i == 0);
        }
    }
    assert_eq!(conditions.num_clamped(), 5);
    assert_eq!(conditions.clamped(), row_mask(shape, 0));
}

#[test]
fn apply_is_idempotent() {
    let shape = GridShape::new(5, 5);
    let conditions = BoundaryConditions::builder(shape)
        .with_condition(DirichletCondition::above_half(col_mask(shape, 0), 1.0))
        .with_condition(DirichletCondition::above_half(row_mask(shape, 4), -2.0))
        .build()
        .unwrap();
    let once = conditions.apply(&test_field(shape)).unwrap();
    let twice = conditions.apply(&once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn later_conditions_win_at_overlaps() {
    let shape = GridShape::new(4, 4);
    // The left column and the bottom row share node (0, 0)
    let left_then_bottom = BoundaryConditions::builder(shape)
        .with_condition(DirichletCondition::above_half(col_mask(shape, 0), 1.0))
        .with_condition(DirichletCondition::above_half(row_mask(shape, 0), 0.0))
        .build()
        .unwrap();
    let bottom_then_left = BoundaryConditions::builder(shape)
        .with_condition(DirichletCondition::above_half(row_mask(shape, 0), 0.0))
        .with_condition(DirichletCondition::above_half(col_mask(shape, 0), 1.0))
        .build()
        .unwrap();

    let field = DMatrix::from_element(4, 4, 0.5);
    assert_eq!(left_then_bottom.apply(&field).unwrap()[(0, 0)], 0.0);
    assert_eq!(bottom_then_left.apply(&field).unwrap()[(0, 0)], 1.0);
    assert_eq!(left_then_bottom.owner(0, 0), Some(1));
    assert_eq!(left_then_bottom.owner(2, 0), Some(0));
    assert_eq!(left_then_bottom.owner(2, 2), None);
}

#[test]
fn overlaps_are_rejected_when_requested() {
    let shape = GridShape::new(4, 4);
    let result = BoundaryConditions::builder(shape)
        .with_policy(OverlapPolicy::Reject)
        .with_condition(DirichletCondition::above_half(col_mask(shape, 3), 1.0))
        .with_condition(DirichletCondition::above_half(row_mask(shape, 0), 0.0))
        .build();
    assert_eq!(
        result.unwrap_err(),
        FemError::OverlappingConditions {
            first: 0,
            second: 1,
            row: 0,
            col: 3
        }
    );

    let disjoint = BoundaryConditions::builder(shape)
        .with_policy(OverlapPolicy::Reject)
        .with_condition(DirichletCondition::above_half(col_mask(shape, 0), 1.0))
        .with_condition(DirichletCondition::above_half(col_mask(shape, 3), 0.0))
        .build()
        .unwrap();
    assert_eq!(disjoint.policy(), OverlapPolicy::Reject);
    assert_eq!(disjoint.num_clamped(), 8);
}

#[test]
fn thresholds_differ_at_the_boundary_value() {
    assert!(!Threshold::Above(0.5).selects(0.5));
    assert!(Threshold::AtLeast(0.5).selects(0.5));
    assert!(Threshold::Above(0.5).selects(0.51));
    assert!(!Threshold::AtLeast(0.5).selects(0.49));

    let shape = GridShape::new(2, 2);
    let mask = DMatrix::from_element(2, 2, 0.5);
    let above = BoundaryConditions::builder(shape)
        .with_condition(DirichletCondition::above_half(mask.clone(), 1.0))
        .build()
        .unwrap();
    let at_least = BoundaryConditions::builder(shape)
        .with_condition(DirichletCondition::at_least_half(mask, 1.0))
        .build()
        .unwrap();
    assert_eq!(above.num_clamped(), 0);
    assert_eq!(at_least.num_clamped(), 4);
}

#[test]
fn prescribed_fields_are_taken_node_wise() {
    let shape = GridShape::new(3, 4);
    let values = DMatrix::from_fn(3, 4, |i, j| (i * 4 + j) as f64);
    let conditions = BoundaryConditions::builder(shape)
        .with_condition(DirichletCondition::new(
            row_mask(shape, 2),
            Threshold::AtLeast(0.5),
            Prescribed::Field(values.clone()),
        ))
        .build()
        .unwrap();
    let result = conditions.apply(&DMatrix::zeros(3, 4)).unwrap();
    for j in 0..4 {
        assert_eq!(result[(2, j)], values[(2, j)]);
        assert_eq!(result[(1, j)], 0.0);
    }
}

#[test]
fn gradient_projection_zeroes_clamped_nodes() {
    let shape = GridShape::new(4, 4);
    let conditions = BoundaryConditions::builder(shape)
        .with_condition(DirichletCondition::above_half(row_mask(shape, 3), 0.0))
        .build()
        .unwrap();
    let mut gradient = DMatrix::from_element(4, 4, 1.0);
    conditions.project_gradient(&mut gradient).unwrap();
    for j in 0..4 {
        assert_eq!(gradient[(3, j)], 0.0);
        assert_eq!(gradient[(2, j)], 1.0);
    }
}

#[test]
fn shape_mismatches_are_rejected() {
    let shape = GridShape::new(4, 4);
    let result = BoundaryConditions::builder(shape)
        .with_condition(DirichletCondition::above_half(DMatrix::zeros(4, 5), 0.0))
        .build();
    assert_eq!(
        result.unwrap_err(),
        FemError::ShapeMismatch {
            what: "mask of boundary condition 0".to_string(),
            expected: (4, 4),
            actual: (4, 5),
        }
    );

    let conditions = BoundaryConditions::<f64>::none(shape);
    assert!(conditions.apply(&DMatrix::zeros(3, 4)).is_err());
    assert!(conditions.project_gradient(&mut DMatrix::zeros(4, 3)).is_err());
}
