use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;
use weakgrid::element::{LagrangeQuad, ReferenceElement};
use weakgrid::error::FemError;
use weakgrid::nalgebra::Point2;
use weakgrid::proptest::{basis_degree, reference_point};
use weakgrid::quadrature::SUPPORTED_BASIS_DEGREES;

fn basis(element: &LagrangeQuad<f64>, xi: &Point2<f64>) -> Vec<f64> {
    let mut values = vec![0.0; element.num_nodes()];
    element.populate_basis(&mut values, xi);
    values
}

fn gradients(element: &LagrangeQuad<f64>, xi: &Point2<f64>) -> (Vec<f64>, Vec<f64>) {
    let mut d_xi = vec![0.0; element.num_nodes()];
    let mut d_eta = vec![0.0; element.num_nodes()];
    element.populate_basis_gradients(&mut d_xi, &mut d_eta, xi);
    (d_xi, d_eta)
}

#[test]
fn lagrange_property() {
    // N_i(x_j) = delta_ij for every node x_j of the element
    for degree in SUPPORTED_BASIS_DEGREES {
        let element = LagrangeQuad::<f64>::new(degree).unwrap();
        assert_eq!(element.num_nodes(), (degree + 1) * (degree + 1));
        for j in 0..element.num_nodes() {
            let values = basis(&element, &element.reference_node(j));
            for (i, value) in values.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_scalar_eq!(*value, expected, comp = abs, tol = 1e-14);
            }
        }
    }
}

#[test]
fn local_nodes_are_row_major() {
    let element = LagrangeQuad::<f64>::biquadratic();
    assert_eq!(element.reference_node(0), Point2::new(-1.0, -1.0));
    assert_eq!(element.reference_node(1), Point2::new(0.0, -1.0));
    assert_eq!(element.reference_node(2), Point2::new(1.0, -1.0));
    assert_eq!(element.reference_node(3), Point2::new(-1.0, 0.0));
    assert_eq!(element.reference_node(8), Point2::new(1.0, 1.0));
}

#[test]
fn bilinear_basis_matches_closed_form() {
    let element = LagrangeQuad::<f64>::bilinear();
    let signs = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)];
    let xi = Point2::new(0.3, -0.7);
    let values = basis(&element, &xi);
    let (d_xi, d_eta) = gradients(&element, &xi);
    for (i, (a, b)) in signs.iter().enumerate() {
        assert_scalar_eq!(values[i], (1.0 + a * xi.x) * (1.0 + b * xi.y) / 4.0, comp = abs, tol = 1e-14);
        assert_scalar_eq!(d_xi[i], a * (1.0 + b * xi.y) / 4.0, comp = abs, tol = 1e-14);
        assert_scalar_eq!(d_eta[i], (1.0 + a * xi.x) * b / 4.0, comp = abs, tol = 1e-14);
    }
}

#[test]
fn unsupported_degree_is_rejected() {
    assert_eq!(LagrangeQuad::<f64>::new(0), Err(FemError::UnsupportedBasisDegree(0)));
    assert_eq!(LagrangeQuad::<f64>::new(4), Err(FemError::UnsupportedBasisDegree(4)));
}

proptest! {
    #[test]
    fn partition_of_unity(degree in basis_degree(), xi in reference_point()) {
        let element = LagrangeQuad::<f64>::new(degree).unwrap();
        let sum: f64 = basis(&element, &xi).iter().sum();
        let (d_xi, d_eta) = gradients(&element, &xi);
        prop_assert!((sum - 1.0).abs() <= 1e-12);
        prop_assert!(d_xi.iter().sum::<f64>().abs() <= 1e-11);
        prop_assert!(d_eta.iter().sum::<f64>().abs() <= 1e-11);
    }

    #[test]
    fn gradients_match_finite_differences(degree in basis_degree(), xi in reference_point()) {
        let element = LagrangeQuad::<f64>::new(degree).unwrap();
        let h = 1e-6;
        let (d_xi, d_eta) = gradients(&element, &xi);
        let plus_x = basis(&element, &Point2::new(xi.x + h, xi.y));
        let minus_x = basis(&element, &Point2::new(xi.x - h, xi.y));
        let plus_y = basis(&element, &Point2::new(xi.x, xi.y + h));
        let minus_y = basis(&element, &Point2::new(xi.x, xi.y - h));
        for i in 0..element.num_nodes() {
            let fd_xi = (plus_x[i] - minus_x[i]) / (2.0 * h);
            let fd_eta = (plus_y[i] - minus_y[i]) / (2.0 * h);
            prop_assert!((d_xi[i] - fd_xi).abs() <= 1e-7);
            prop_assert!((d_eta[i] - fd_eta).abs() <= 1e-7);
        }
    }
}
