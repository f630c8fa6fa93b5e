//! Load stepping Newton continuation for finite strain hyperelasticity on hexahedral meshes.
//!
//! A [`problem::HyperelasticProblem`] describes the discrete boundary value problem, with
//! named boundary conditions acting as load parameters. The [`continuation::LoadStepping`]
//! driver walks one of these parameters from zero to a target value in equal increments,
//! solving each step with Newton's method started from the previous solution, and records a
//! measured quantity after every step.
pub mod assembly;
pub mod boundary;
pub mod config;
pub mod continuation;
pub mod element;
pub mod io;
pub mod linear_solver;
pub mod mesh;
pub mod problem;
pub mod quadrature;
pub mod sampling;
pub mod simulation;

pub use hyperstep_optimize::Real;

pub mod optimize {
    pub use hyperstep_optimize::*;
}

pub mod solid {
    pub use hyperstep_solid::*;
}

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
pub extern crate vtkio;
