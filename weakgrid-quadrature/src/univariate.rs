//! Gauss–Legendre rules for the reference interval `[-1, 1]`.

use crate::{Error, Rule1d};
use std::f64::consts::PI;

/// Root updates smaller than this terminate the Newton iteration.
const ROOT_TOLERANCE: f64 = 1e-15;

/// Upper bound on Newton iterations per root. Convergence from the Chebyshev-like initial
/// guess takes a handful of iterations in practice.
const MAX_NEWTON_ITERATIONS: usize = 100;

/// The Legendre polynomial `P_n` and its predecessor `P_{n-1}`, evaluated at a point.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Legendre {
    degree: usize,
    x: f64,
    current: f64,
    previous: f64,
}

impl Legendre {
    /// Evaluates `P_n(x)` through the three-term (Bonnet) recurrence
    ///
    /// ```text
    /// k P_k(x) = (2k - 1) x P_{k-1}(x) - (k - 1) P_{k-2}(x)
    /// ```
    pub(crate) fn at(degree: usize, x: f64) -> Self {
        let (mut current, mut previous) = (1.0, 0.0);
        for k in 1..=degree {
            let k = k as f64;
            let next = ((2.0 * k - 1.0) * x * current - (k - 1.0) * previous) / k;
            previous = current;
            current = next;
        }
        Self {
            degree,
            x,
            current,
            previous,
        }
    }

    pub(crate) fn value(&self) -> f64 {
        self.current
    }

    /// The derivative `P_n'(x)`.
    ///
    /// Only valid in the open interval `(-1, 1)`, where `x^2 - 1` does not vanish.
    pub(crate) fn derivative(&self) -> f64 {
        let n = self.degree as f64;
        n * (self.x * self.current - self.previous) / (self.x * self.x - 1.0)
    }
}

/// The `num_points`-point Gauss–Legendre rule on `[-1, 1]`.
///
/// The rule integrates polynomials of degree up to `2 num_points - 1` exactly. Points are
/// returned in ascending order.
///
/// Roots in the left half of the interval are located with Newton's method and the right half
/// is recovered by symmetry.
pub fn gauss(num_points: usize) -> Result<Rule1d, Error> {
    let n = num_points;
    if n == 0 {
        return Err(Error::InvalidPointCount);
    }

    let mut left_points = Vec::with_capacity((n + 1) / 2);
    let mut left_weights = Vec::with_capacity((n + 1) / 2);

    for i in 0..(n + 1) / 2 {
        // Initial guess from the asymptotic root location, mirrored into [-1, 0]
        let mut x = -(PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut iterations = 0;
        let p = loop {
            let p = Legendre::at(n, x);
            let dx = p.value() / p.derivative();
            x -= dx;
            iterations += 1;
            if dx.abs() <= ROOT_TOLERANCE {
                break Legendre::at(n, x);
            }
            if iterations == MAX_NEWTON_ITERATIONS {
                return Err(Error::NoConvergence { num_points: n });
            }
        };

        let dp = p.derivative();
        left_points.push(x);
        left_weights.push(2.0 / ((1.0 - x * x) * dp * dp));
    }

    // For odd n the middle root is exactly zero; snap it to avoid a tiny asymmetry
    if n % 2 == 1 {
        if let Some(middle) = left_points.last_mut() {
            *middle = 0.0;
        }
    }

    let mirrored = n / 2;
    let points = left_points
        .iter()
        .copied()
        .chain(left_points[..mirrored].iter().rev().map(|x| -x))
        .map(|x| [x])
        .collect();
    let weights = left_weights
        .iter()
        .copied()
        .chain(left_weights[..mirrored].iter().rev().copied())
        .collect();

    Ok((weights, points))
}
