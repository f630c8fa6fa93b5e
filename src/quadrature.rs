//! Gauss quadrature rules for the reference domains of the elements.
//!
//! Rules are stored as pairs `(weights, points)` over the reference domain $[-1, 1]^d$.
use crate::nalgebra::{Point1, Point2, Point3};

pub mod tensor;
pub mod univariate;

pub type QuadraturePair<T, P> = (Vec<T>, Vec<P>);
pub type QuadraturePair1d<T> = QuadraturePair<T, Point1<T>>;
pub type QuadraturePair2d<T> = QuadraturePair<T, Point2<T>>;
pub type QuadraturePair3d<T> = QuadraturePair<T, Point3<T>>;

/// Number of Gauss points per direction used for volume and surface integrals unless configured
/// otherwise. Integrates the trilinear mass-like terms of Q1 elements exactly.
pub const DEFAULT_POINTS_PER_DIM: usize = 2;
