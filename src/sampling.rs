//! Point evaluation of displacement and stress fields.
use crate::assembly::local::{element_deformation_gradient, gather_element_displacement};
use crate::mesh::HexMesh;
use crate::nalgebra::{DVectorView, Matrix3, Point3, Vector3};
use crate::solid::kinematics::{cauchy_stress, second_piola_kirchhoff_stress};
use crate::solid::HyperelasticMaterial;
use crate::Real;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressMeasure {
    FirstPiolaKirchhoff,
    SecondPiolaKirchhoff,
    Cauchy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SamplingError<T: Real> {
    /// The point is not contained in any cell of the reference configuration.
    PointOutsideMesh(Point3<T>),
    /// The deformation is inverted at the point, so the requested stress measure is undefined.
    InvertedDeformation(Point3<T>),
}

impl<T: Real> Display for SamplingError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingError::PointOutsideMesh(x) => {
                write!(f, "Point ({}, {}, {}) is outside of the mesh.", x.x, x.y, x.z)
            }
            SamplingError::InvertedDeformation(x) => {
                write!(f, "Deformation is inverted at point ({}, {}, {}).", x.x, x.y, x.z)
            }
        }
    }
}

impl<T: Real> Error for SamplingError<T> {}

/// Interpolates the displacement at the reference point `x`.
pub fn sample_displacement<T: Real>(
    mesh: &HexMesh<T>,
    u: &DVectorView<T>,
    x: &Point3<T>,
) -> Result<Vector3<T>, SamplingError<T>> {
    let (cell, xi) = mesh
        .locate_point(x)
        .ok_or(SamplingError::PointOutsideMesh(*x))?;
    let nodes = &mesh.connectivity()[cell];
    let element = mesh
        .element(cell)
        .ok_or(SamplingError::PointOutsideMesh(*x))?;
    let u_element = gather_element_displacement(u, nodes);
    Ok(u_element * element.evaluate_basis(&xi).transpose())
}

/// Evaluates the requested stress measure at the reference point `x`.
///
/// Stresses are computed from the deformation gradient of the first cell containing `x`, so
/// they are discontinuous across cell faces.
#[allow(non_snake_case)]
pub fn sample_stress<T, M>(
    mesh: &HexMesh<T>,
    material: &M,
    parameters: &M::Parameters,
    u: &DVectorView<T>,
    x: &Point3<T>,
    measure: StressMeasure,
) -> Result<Matrix3<T>, SamplingError<T>>
where
    T: Real,
    M: HyperelasticMaterial<T>,
{
    let (cell, xi) = mesh
        .locate_point(x)
        .ok_or(SamplingError::PointOutsideMesh(*x))?;
    let (gradients, _) = mesh
        .element(cell)
        .and_then(|element| element.physical_gradients(&xi))
        .ok_or(SamplingError::PointOutsideMesh(*x))?;
    let u_element = gather_element_displacement(u, &mesh.connectivity()[cell]);
    let F = element_deformation_gradient(&u_element, &gradients);
    let P = material.compute_stress_tensor(&F, parameters);
    match measure {
        StressMeasure::FirstPiolaKirchhoff => Ok(P),
        StressMeasure::SecondPiolaKirchhoff => {
            second_piola_kirchhoff_stress(&F, &P).ok_or(SamplingError::InvertedDeformation(*x))
        }
        StressMeasure::Cauchy => cauchy_stress(&F, &P).ok_or(SamplingError::InvertedDeformation(*x)),
    }
}
