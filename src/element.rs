//! Isoparametric Q1 elements: the trilinear hexahedron and its bilinear boundary faces.
use crate::Real;
use numeric_literals::replace_float_literals;

mod hexahedron;
mod quadrilateral;

pub use hexahedron::*;
pub use quadrilateral::*;

/// Linear Lagrange basis function on `[-1, 1]` associated with the node `alpha`, which is
/// either `-1` or `1`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn phi_linear_1d<T: Real>(alpha: T, xi: T) -> T {
    (1.0 + alpha * xi) / 2.0
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn phi_linear_1d_grad<T: Real>(alpha: T) -> T {
    alpha / 2.0
}
