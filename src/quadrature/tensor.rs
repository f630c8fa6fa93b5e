//! Tensor-product Gauss rules for the reference quadrilateral and hexahedron.
use crate::nalgebra::{Point2, Point3};
use crate::quadrature::univariate::gauss;
use crate::quadrature::{QuadraturePair2d, QuadraturePair3d};
use crate::Real;
use itertools::iproduct;

pub fn quadrilateral_gauss<T: Real>(num_points_per_dim: usize) -> QuadraturePair2d<T> {
    let (weights, points) = gauss::<T>(num_points_per_dim);
    let rule = weights.iter().zip(&points);
    iproduct!(rule.clone(), rule)
        .map(|((w_j, y), (w_i, x))| (*w_i * *w_j, Point2::new(x.x, y.x)))
        .unzip()
}

pub fn hexahedron_gauss<T: Real>(num_points_per_dim: usize) -> QuadraturePair3d<T> {
    let (weights, points) = gauss::<T>(num_points_per_dim);
    let rule = weights.iter().zip(&points);
    iproduct!(rule.clone(), rule.clone(), rule)
        .map(|((w_k, z), (w_j, y), (w_i, x))| (*w_i * *w_j * *w_k, Point3::new(x.x, y.x, z.x)))
        .unzip()
}
