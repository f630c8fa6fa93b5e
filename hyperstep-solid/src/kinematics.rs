//! Finite strain kinematics and stress conversions.
use hyperstep_optimize::nalgebra::{Matrix3, Vector3};
use hyperstep_optimize::Real;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// The deformation gradient $\vec F = \vec I + \nabla \vec u$.
pub fn deformation_gradient<T: Real>(displacement_gradient: &Matrix3<T>) -> Matrix3<T> {
    Matrix3::identity() + displacement_gradient
}

/// The right Cauchy-Green tensor $\vec C = \vec F^T \vec F$.
pub fn right_cauchy_green<T: Real>(deformation_gradient: &Matrix3<T>) -> Matrix3<T> {
    deformation_gradient.transpose() * deformation_gradient
}

/// The Green strain tensor $\vec E = \frac{1}{2} (\vec C - \vec I)$.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn green_strain<T: Real>(deformation_gradient: &Matrix3<T>) -> Matrix3<T> {
    (right_cauchy_green(deformation_gradient) - Matrix3::identity()) * 0.5
}

/// Returns $\vec F^{-T}$, or a matrix of NaNs if $\vec F$ is singular.
pub fn inverse_transpose<T: Real>(deformation_gradient: &Matrix3<T>) -> Matrix3<T> {
    deformation_gradient
        .try_inverse()
        .map(|f_inv| f_inv.transpose())
        .unwrap_or_else(nan_matrix)
}

/// Converts a first Piola-Kirchhoff stress into the Cauchy stress $\sigma = J^{-1} \vec P \vec F^T$.
///
/// Returns `None` if $J = \det \vec F$ is not positive.
pub fn cauchy_stress<T: Real>(deformation_gradient: &Matrix3<T>, first_piola: &Matrix3<T>) -> Option<Matrix3<T>> {
    let j = deformation_gradient.determinant();
    if j > T::zero() {
        Some(first_piola * deformation_gradient.transpose() / j)
    } else {
        None
    }
}

/// Converts a first Piola-Kirchhoff stress into the second Piola-Kirchhoff stress $\vec S = \vec F^{-1} \vec P$.
///
/// Returns `None` if $\vec F$ is singular.
pub fn second_piola_kirchhoff_stress<T: Real>(
    deformation_gradient: &Matrix3<T>,
    first_piola: &Matrix3<T>,
) -> Option<Matrix3<T>> {
    deformation_gradient
        .try_inverse()
        .map(|f_inv| f_inv * first_piola)
}

pub(crate) fn nan_matrix<T: Real>() -> Matrix3<T> {
    Matrix3::repeat(T::from_f64(f64::NAN).expect("NaN must be representable in T"))
}

/// Local material coordinate system of fiber, sheet and sheet-normal directions.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FiberFrame<T: Real> {
    pub fiber: Vector3<T>,
    pub sheet: Vector3<T>,
    pub normal: Vector3<T>,
}

impl<T: Real> Default for FiberFrame<T> {
    /// Fibers along the x-axis, sheets along y and sheet normals along z.
    fn default() -> Self {
        Self {
            fiber: Vector3::x(),
            sheet: Vector3::y(),
            normal: Vector3::z(),
        }
    }
}

impl<T: Real> FiberFrame<T> {
    /// Builds an orthonormal frame from fiber and sheet directions.
    ///
    /// The sheet direction is orthogonalized against the fiber direction. Returns `None` if
    /// the directions are (nearly) parallel or zero.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn from_fiber_and_sheet(fiber: Vector3<T>, sheet: Vector3<T>) -> Option<Self> {
        let fiber = fiber.try_normalize(1e-12)?;
        let sheet = (sheet - &fiber * fiber.dot(&sheet)).try_normalize(1e-12)?;
        let normal = fiber.cross(&sheet);
        Some(Self { fiber, sheet, normal })
    }

    /// The rotation matrix whose columns are the fiber, sheet and normal directions.
    pub fn rotation(&self) -> Matrix3<T> {
        Matrix3::from_columns(&[self.fiber, self.sheet, self.normal])
    }
}
