//! Rules for the reference square built as tensor products of 1D Gauss rules.

use crate::univariate::gauss;
use crate::{Error, Rule2d};

/// Tensor-product Gauss rule on `[-1, 1]^2` with `num_points_per_dim` points per axis.
///
/// Points are ordered with the first coordinate as the outer index and the second coordinate
/// as the inner index, so point `i * n + j` is `[x_i, y_j]`.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Result<Rule2d, Error> {
    let (weights_1d, points_1d) = gauss(num_points_per_dim)?;
    let n = weights_1d.len();

    let mut weights = Vec::with_capacity(n * n);
    let mut points = Vec::with_capacity(n * n);
    for (wx, [x]) in weights_1d.iter().zip(&points_1d) {
        for (wy, [y]) in weights_1d.iter().zip(&points_1d) {
            weights.push(wx * wy);
            points.push([*x, *y]);
        }
    }

    Ok((weights, points))
}
