//! Quadrature rules for the one-dimensional domain `[-1, 1]`.
use crate::nalgebra::Point1;
use crate::quadrature::QuadraturePair1d;
use crate::Real;
use std::f64::consts::PI;

const MAX_ROOT_ITERATIONS: usize = 100;

/// Evaluates the Legendre polynomial $p_n$ and its derivative at `x` in the open interval `(-1, 1)`.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    // m p_m(x) = (2m - 1) x p_{m - 1}(x) - (m - 1) p_{m - 2}(x)
    let (mut p, mut p_prev) = (1.0, 0.0);
    for m in 1..=n {
        let m = m as f64;
        let p_next = ((2.0 * m - 1.0) * x * p - (m - 1.0) * p_prev) / m;
        p_prev = p;
        p = p_next;
    }
    // p_n'(x) = n (x p_n(x) - p_{n - 1}(x)) / (x^2 - 1)
    let dp = n as f64 * (x * p - p_prev) / (x * x - 1.0);
    (p, dp)
}

/// Gauss-Legendre nodes and weights in double precision, ordered by increasing coordinate.
fn gauss_f64(num_points: usize) -> Vec<(f64, f64)> {
    let n = num_points;
    let mut rule = vec![(0.0, 0.0); n];

    // Roots come in symmetric pairs, so only the positive half is computed
    for i in 0..(n + 1) / 2 {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        for _ in 0..MAX_ROOT_ITERATIONS {
            let (p, dp) = legendre(n, x);
            let dx = -p / dp;
            x += dx;
            if dx.abs() <= 1e-15 {
                break;
            }
        }
        let (_, dp) = legendre(n, x);
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        rule[n - 1 - i] = (x, w);
        rule[i] = (-x, w);
    }
    rule
}

/// Gauss quadrature for the reference interval [-1, 1].
///
/// Given `n` points, the rule integrates polynomials of degree up to `2 n - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss<T: Real>(num_points: usize) -> QuadraturePair1d<T> {
    assert!(num_points > 0, "number of points must be positive");
    let convert = |v: f64| T::from_f64(v).expect("Quadrature data must fit in T");
    gauss_f64(num_points)
        .into_iter()
        .map(|(x, w)| (convert(w), Point1::new(convert(x))))
        .unzip()
}
