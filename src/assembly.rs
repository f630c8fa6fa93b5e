//! Finite element assembly of the hyperelastic residual, tangent and energy.
//!
//! Element-level computations live in [`local`], while [`global`] scatters element contributions
//! into global vectors and sparse matrices.
pub mod global;
pub mod local;
