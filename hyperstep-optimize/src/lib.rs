//! Nonlinear solvers and numerical differentiation for `hyperstep`.
use nalgebra::RealField;

pub use nalgebra;

/// Scalar type used throughout `hyperstep`.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

/// Calculus helper traits and numerical differentiation
pub mod calculus;
/// Implementations of the Newton method with different line search strategies
pub mod newton;
