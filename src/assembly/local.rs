use crate::element::{Hex8Element, Quad4Surface};
use crate::nalgebra::{DVector, DVectorView, Matrix3, Point3, SMatrix, SVector};
use crate::optimize::calculus::approximate_jacobian_fd;
use crate::quadrature::{QuadraturePair2d, QuadraturePair3d};
use crate::solid::kinematics::deformation_gradient;
use crate::solid::HyperelasticMaterial;
use crate::Real;
use itertools::izip;
use numeric_literals::replace_float_literals;

/// Element displacements, one column per node.
pub type ElementDisplacement<T> = SMatrix<T, 3, 8>;
pub type ElementVector<T> = SVector<T, 24>;
pub type ElementMatrix<T> = SMatrix<T, 24, 24>;
pub type FaceVector<T> = SVector<T, 12>;
pub type FaceMatrix<T> = SMatrix<T, 12, 12>;

/// Physical basis gradients and the scaled quadrature weight at a quadrature point.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraturePointData<T: Real> {
    /// Quadrature weight multiplied by the determinant of the reference Jacobian.
    pub weight: T,
    /// Gradients of the basis functions with respect to the reference configuration,
    /// one column per node.
    pub gradients: SMatrix<T, 3, 8>,
}

/// Precomputed quadrature data of an element in its reference (undeformed) configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementGeometry<T: Real> {
    points: Vec<QuadraturePointData<T>>,
}

impl<T: Real> ElementGeometry<T> {
    /// Returns `None` if the element is singular at one of the quadrature points.
    pub fn from_element(element: &Hex8Element<T>, quadrature: &QuadraturePair3d<T>) -> Option<Self> {
        let (weights, points) = quadrature;
        let points = izip!(weights, points)
            .map(|(w, xi)| {
                let (gradients, det_j) = element.physical_gradients(xi)?;
                Some(QuadraturePointData {
                    weight: *w * det_j,
                    gradients,
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { points })
    }

    pub fn quadrature_points(&self) -> &[QuadraturePointData<T>] {
        &self.points
    }
}

/// Gathers the displacements of the element nodes from the global displacement vector.
pub fn gather_element_displacement<T: Real>(u: &DVectorView<T>, nodes: &[usize; 8]) -> ElementDisplacement<T> {
    ElementDisplacement::from_fn(|i, a| u[3 * nodes[a] + i])
}

/// The deformation gradient $\vec F = \vec I + \vec U \vec G^T$ at a quadrature point.
pub fn element_deformation_gradient<T: Real>(
    u_element: &ElementDisplacement<T>,
    gradients: &SMatrix<T, 3, 8>,
) -> Matrix3<T> {
    deformation_gradient(&(u_element * gradients.transpose()))
}

/// The strain energy $\int_{\Omega_e} \psi(\vec F) \, dV$ of the element.
pub fn compute_element_energy<T, M>(
    geometry: &ElementGeometry<T>,
    u_element: &ElementDisplacement<T>,
    material: &M,
    parameters: &M::Parameters,
) -> T
where
    T: Real,
    M: HyperelasticMaterial<T>,
{
    geometry
        .quadrature_points()
        .iter()
        .map(|qp| {
            let f = element_deformation_gradient(u_element, &qp.gradients);
            qp.weight * material.compute_energy_density(&f, parameters)
        })
        .fold(T::zero(), |acc, e| acc + e)
}

/// The internal force vector $\int_{\Omega_e} \vec P(\vec F) \nabla N_a \, dV$ of the element.
///
/// Entry `3 a + i` holds component `i` of the force acting on local node `a`.
pub fn assemble_element_residual<T, M>(
    geometry: &ElementGeometry<T>,
    u_element: &ElementDisplacement<T>,
    material: &M,
    parameters: &M::Parameters,
) -> ElementVector<T>
where
    T: Real,
    M: HyperelasticMaterial<T>,
{
    let mut forces = SMatrix::<T, 3, 8>::zeros();
    for qp in geometry.quadrature_points() {
        let f = element_deformation_gradient(u_element, &qp.gradients);
        let p = material.compute_stress_tensor(&f, parameters);
        forces += p * qp.gradients * qp.weight;
    }
    ElementVector::from_column_slice(forces.as_slice())
}

/// The element tangent stiffness matrix $\vec B^T \pd{\vec P}{\vec F} \vec B$ integrated over the element.
#[allow(non_snake_case)]
pub fn assemble_element_tangent<T, M>(
    geometry: &ElementGeometry<T>,
    u_element: &ElementDisplacement<T>,
    material: &M,
    parameters: &M::Parameters,
) -> ElementMatrix<T>
where
    T: Real,
    M: HyperelasticMaterial<T>,
{
    let mut K = ElementMatrix::zeros();
    for qp in geometry.quadrature_points() {
        let F = element_deformation_gradient(u_element, &qp.gradients);
        let A = material.compute_stress_derivative(&F, parameters);
        let B = strain_displacement_matrix(&qp.gradients);
        K += B.transpose() * A * B * qp.weight;
    }
    K
}

/// Maps element displacements to the column-major vectorization of the displacement gradient,
/// $\operatorname{vec}(\nabla \vec u) = \vec B \vec u_e$.
#[allow(non_snake_case)]
fn strain_displacement_matrix<T: Real>(gradients: &SMatrix<T, 3, 8>) -> SMatrix<T, 9, 24> {
    let mut B = SMatrix::<T, 9, 24>::zeros();
    for a in 0..8 {
        for J in 0..3 {
            for i in 0..3 {
                B[(i + 3 * J, 3 * a + i)] = gradients[(J, a)];
            }
        }
    }
    B
}

/// The nodal forces $p \int N_a (\vec x_\xi \times \vec x_\eta) \, d\xi d\eta$ of a follower pressure
/// on a face with the given deformed vertex positions.
pub fn assemble_face_pressure<T: Real>(
    deformed_vertices: &[Point3<T>; 4],
    pressure: T,
    quadrature: &QuadraturePair2d<T>,
) -> FaceVector<T> {
    let surface = Quad4Surface::from_vertices(*deformed_vertices);
    let mut forces = SMatrix::<T, 3, 4>::zeros();
    let (weights, points) = quadrature;
    for (w, xi) in izip!(weights, points) {
        let n = surface.scaled_normal(xi);
        let phi = surface.evaluate_basis(xi);
        forces += n * phi * (*w * pressure);
    }
    FaceVector::from_column_slice(forces.as_slice())
}

/// Derivative of [`assemble_face_pressure`] with respect to the face vertex positions.
///
/// The pressure forces are quadratic in the vertex positions, so central differences are exact
/// up to round-off.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn assemble_face_pressure_tangent<T: Real>(
    deformed_vertices: &[Point3<T>; 4],
    pressure: T,
    quadrature: &QuadraturePair2d<T>,
) -> FaceMatrix<T> {
    let scale = deformed_vertices
        .iter()
        .map(|x| x.coords.amax())
        .fold(1.0, |a, b| a.max(b));
    let mut x = DVector::from_fn(12, |k, _| deformed_vertices[k / 3][k % 3]);
    let jacobian = approximate_jacobian_fd(
        12,
        |x, mut f| {
            let vertices = [0, 1, 2, 3].map(|a| Point3::new(x[3 * a], x[3 * a + 1], x[3 * a + 2]));
            f.copy_from(&assemble_face_pressure(&vertices, pressure, quadrature));
        },
        &mut x,
        1e-6 * scale,
    );
    FaceMatrix::from_fn(|i, j| jacobian[(i, j)])
}
