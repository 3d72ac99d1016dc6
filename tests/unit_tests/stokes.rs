use super::{analytic_gradient, fd_gradient};
use matrixcompare::assert_scalar_eq;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use weakgrid::error::FemError;
use weakgrid::field::NodalField;
use weakgrid::grid::GridShape;
use weakgrid::nalgebra::DMatrix;
use weakgrid::problem::WeakFormProblem;
use weakgrid::scenarios::{lid_driven_cavity, LidProfile};
use weakgrid::stokes::{StokesWeights, PRESSURE, VELOCITY_X, VELOCITY_Y};

#[test]
fn default_weights() {
    let weights = StokesWeights::<f64>::default();
    assert_eq!(weights.continuity, 100.0);
    assert_eq!(weights.pressure_stabilization, 0.01);
}

#[test]
fn cavity_boundary_conditions() {
    let problem = lid_driven_cavity::<f64>(5, 10.0, 1, LidProfile::Uniform(1.0)).unwrap();
    assert_eq!(problem.num_components(), 3);
    let conditioned = problem
        .apply_boundary_conditions(&problem.constant_field(0.5))
        .unwrap();
    let u = conditioned.component(0, VELOCITY_X);
    let v = conditioned.component(0, VELOCITY_Y);
    let p = conditioned.component(0, PRESSURE);

    for j in 0..5 {
        // The lid wins over the walls at the top corners
        assert_eq!(u[(4, j)], 1.0);
        assert_eq!(v[(4, j)], 0.0);
        assert_eq!(u[(0, j)], 0.0);
        assert_eq!(v[(0, j)], 0.0);
    }
    for i in 0..4 {
        assert_eq!(u[(i, 0)], 0.0);
        assert_eq!(u[(i, 4)], 0.0);
        assert_eq!(v[(i, 0)], 0.0);
        assert_eq!(v[(i, 4)], 0.0);
    }
    assert_eq!(u[(2, 2)], 0.5);
    assert_eq!(p[(0, 0)], 0.0);
    assert_eq!(p[(0, 1)], 0.5);
    assert_eq!(p[(2, 2)], 0.5);
}

#[test]
fn parabolic_lid_profile() {
    let problem = lid_driven_cavity::<f64>(9, 10.0, 2, LidProfile::Parabolic).unwrap();
    let conditioned = problem
        .apply_boundary_conditions(&problem.constant_field(0.0))
        .unwrap();
    let u = conditioned.component(0, VELOCITY_X);
    assert_eq!(u[(8, 0)], 0.0);
    assert_eq!(u[(8, 8)], 0.0);
    assert_scalar_eq!(u[(8, 4)], 1.0, comp = abs, tol = 1e-15);
    assert_scalar_eq!(u[(8, 2)], 0.75, comp = abs, tol = 1e-15);
}

#[test]
fn quiescent_interior_loss() {
    // With zero interior velocity and pressure only the lid shear contributes to R1, and p = 0
    // removes the continuity terms
    let problem = lid_driven_cavity::<f64>(5, 10.0, 1, LidProfile::Uniform(1.0)).unwrap();
    let loss = problem.loss(&problem.constant_field(0.0)).unwrap();
    assert!(loss.is_finite());
    assert!(loss > 0.0);
}

#[test]
fn gradient_matches_finite_differences() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for (domain_size, degree) in [(5, 1), (5, 2), (7, 3)] {
        let problem = lid_driven_cavity::<f64>(domain_size, 5.0, degree, LidProfile::Uniform(1.0)).unwrap();
        let field = NodalField::random_uniform(1, 3, problem.grid_shape(), -1.0, 1.0, &mut rng);
        let (loss, analytic) = analytic_gradient(&problem, &field);
        assert_eq!(loss, problem.loss(&field).unwrap());
        let numeric = fd_gradient(&problem, &field, 1e-6);
        let error = util::relative_max_error(analytic.as_slice(), numeric.as_slice());
        assert!(error <= 1e-5, "relative gradient error {:e}", error);
    }
}

#[test]
fn gradient_with_custom_weights_matches_finite_differences() {
    use weakgrid::evaluate::FieldEvaluator;
    use weakgrid::stokes::{StokesInstance, StokesProblem};

    let reference = lid_driven_cavity::<f64>(5, 2.0, 2, LidProfile::Parabolic).unwrap();
    let instance: StokesInstance<f64> = reference.instances()[0].clone();
    let problem = StokesProblem::builder(FieldEvaluator::square(5, 2).unwrap())
        .with_weights(StokesWeights {
            continuity: 3.0,
            pressure_stabilization: 0.5,
        })
        .with_instance(instance)
        .build()
        .unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let field = NodalField::random_uniform(1, 3, problem.grid_shape(), -1.0, 1.0, &mut rng);
    let (_, analytic) = analytic_gradient(&problem, &field);
    let numeric = fd_gradient(&problem, &field, 1e-6);
    assert!(util::relative_max_error(analytic.as_slice(), numeric.as_slice()) <= 1e-5);
}

#[test]
fn gradient_vanishes_at_clamped_nodes() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let problem = lid_driven_cavity::<f64>(7, 10.0, 3, LidProfile::Uniform(1.0)).unwrap();
    let field = NodalField::random_uniform(1, 3, problem.grid_shape(), -1.0, 1.0, &mut rng);
    let mut gradient = problem.constant_field(1.0);
    problem.loss_and_gradient(&field, &mut gradient).unwrap();

    let instance = &problem.instances()[0];
    for component in [VELOCITY_X, VELOCITY_Y, PRESSURE] {
        let boundary = instance.boundary_conditions(component);
        let grid = gradient.component(0, component);
        for i in 0..7 {
            for j in 0..7 {
                if boundary.is_clamped(i, j) {
                    assert_eq!(grid[(i, j)], 0.0);
                }
            }
        }
    }
    assert_eq!(gradient.component(0, PRESSURE)[(0, 0)], 0.0);
}

#[test]
fn mismatched_coefficients_are_rejected() {
    use weakgrid::boundary::{BoundaryConditions, Prescribed};
    use weakgrid::evaluate::FieldEvaluator;
    use weakgrid::scenarios::cavity_masks;
    use weakgrid::stokes::{StokesInstance, StokesProblem};

    let shape = GridShape::square(5);
    let (walls, lid, pin) = cavity_masks::<f64>(shape);

    let wrong_forcing = StokesInstance::with_wall_lid_and_pin(
        DMatrix::from_element(4, 5, 0.1),
        walls.clone(),
        lid.clone(),
        pin.clone(),
        Prescribed::Constant(1.0),
    )
    .unwrap();
    let result = StokesProblem::builder(FieldEvaluator::square(5, 1).unwrap())
        .with_instance(wrong_forcing)
        .build();
    assert_eq!(
        result.unwrap_err(),
        FemError::ShapeMismatch {
            what: "forcing".to_string(),
            expected: (5, 5),
            actual: (4, 5),
        }
    );

    let wrong_lid = StokesInstance::with_wall_lid_and_pin(
        DMatrix::from_element(5, 5, 0.1),
        walls,
        DMatrix::zeros(5, 4),
        pin,
        Prescribed::Constant(1.0),
    );
    assert!(matches!(wrong_lid, Err(FemError::ShapeMismatch { actual: (5, 4), .. })));

    let wrong_boundary = StokesInstance::new(
        DMatrix::from_element(5, 5, 0.1),
        BoundaryConditions::none(shape),
        BoundaryConditions::none(GridShape::square(9)),
        BoundaryConditions::none(shape),
    );
    let result = StokesProblem::builder(FieldEvaluator::square(5, 1).unwrap())
        .with_instance(wrong_boundary)
        .build();
    assert!(matches!(result, Err(FemError::ShapeMismatch { actual: (9, 9), .. })));
}

#[test]
fn mismatched_field_is_rejected_before_evaluation() {
    let problem = lid_driven_cavity::<f64>(5, 10.0, 1, LidProfile::Uniform(1.0)).unwrap();
    let wrong_shape = NodalField::zeros(1, 3, GridShape::square(9));
    assert!(matches!(problem.loss(&wrong_shape), Err(FemError::ShapeMismatch { .. })));

    let mut gradient = problem.constant_field(0.0);
    assert!(matches!(
        problem.loss_and_gradient(&wrong_shape, &mut gradient),
        Err(FemError::ShapeMismatch { .. })
    ));

    let wrong_components = NodalField::zeros(1, 1, GridShape::square(5));
    assert!(matches!(problem.loss(&wrong_components), Err(FemError::LayoutMismatch { .. })));
}
