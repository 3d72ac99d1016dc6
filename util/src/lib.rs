//! Helpers shared by the test suites of the workspace.
use nalgebra::DMatrix;

/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("max absdiff: {:e}", max_absdiff);
            println!("left: {}", $x);
            println!("right: {}", $y);
        }
        assert!(approx_eq);
    }};
}

/// A grid whose entry `(i, j)` is `f(x, y)` with `x = j / (cols - 1)` and `y = i / (rows - 1)`.
pub fn grid_from_fn(rows: usize, cols: usize, f: impl Fn(f64, f64) -> f64) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |i, j| {
        let x = j as f64 / (cols - 1) as f64;
        let y = i as f64 / (rows - 1) as f64;
        f(x, y)
    })
}

/// Mean absolute difference between the entries of two grids of equal shape.
pub fn mean_abs_difference(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    assert_eq!(a.shape(), b.shape(), "Grids must have the same shape");
    let total: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum();
    total / a.len() as f64
}

/// Max-norm of `a - b` relative to the max-norm of `b`.
pub fn relative_max_error(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    let diff = a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max);
    let scale = b.iter().map(|y| y.abs()).fold(0.0, f64::max);
    diff / scale
}
