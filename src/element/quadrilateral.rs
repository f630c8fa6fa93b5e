use crate::element::{phi_linear_1d, phi_linear_1d_grad};
use crate::nalgebra::{Point2, Point3, SMatrix, Vector2, Vector3};
use crate::Real;

/// Reference coordinates of the Quad4 nodes, counter-clockwise.
#[rustfmt::skip]
const QUAD4_REFERENCE_NODES: [[f64; 2]; 4] = [
    [-1.0, -1.0],
    [ 1.0, -1.0],
    [ 1.0,  1.0],
    [-1.0,  1.0],
];

/// Bilinear quadrilateral embedded in three dimensions, used for surface integrals.
///
/// The orientation of the surface follows the node ordering: the normal
/// $\pd{\vec x}{\xi} \times \pd{\vec x}{\eta}$ points towards the side from which the nodes appear
/// counter-clockwise.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Quad4Surface<T: Real> {
    vertices: [Point3<T>; 4],
}

impl<T: Real> Quad4Surface<T> {
    pub fn from_vertices(vertices: [Point3<T>; 4]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point3<T>; 4] {
        &self.vertices
    }

    pub fn evaluate_basis(&self, xi: &Point2<T>) -> SMatrix<T, 1, 4> {
        SMatrix::from_fn(|_, a| {
            let [alpha, beta] = QUAD4_REFERENCE_NODES[a];
            phi_linear_1d(T::from_f64(alpha).expect("Literal must fit in T"), xi.x)
                * phi_linear_1d(T::from_f64(beta).expect("Literal must fit in T"), xi.y)
        })
    }

    pub fn gradients(&self, xi: &Point2<T>) -> SMatrix<T, 2, 4> {
        let columns = QUAD4_REFERENCE_NODES.map(|[alpha, beta]| {
            let alpha = T::from_f64(alpha).expect("Literal must fit in T");
            let beta = T::from_f64(beta).expect("Literal must fit in T");
            Vector2::new(
                phi_linear_1d_grad(alpha) * phi_linear_1d(beta, xi.y),
                phi_linear_1d(alpha, xi.x) * phi_linear_1d_grad(beta),
            )
        });
        SMatrix::from_columns(&columns)
    }

    pub fn map_reference_coords(&self, xi: &Point2<T>) -> Point3<T> {
        let x = SMatrix::<T, 3, 4>::from_fn(|i, a| self.vertices[a][i]);
        Point3::from(x * self.evaluate_basis(xi).transpose())
    }

    /// The area-weighted normal $\pd{\vec x}{\xi} \times \pd{\vec x}{\eta}$.
    ///
    /// Its length is the ratio between physical and reference area at `xi`.
    pub fn scaled_normal(&self, xi: &Point2<T>) -> Vector3<T> {
        let x = SMatrix::<T, 3, 4>::from_fn(|i, a| self.vertices[a][i]);
        let tangents = x * self.gradients(xi).transpose();
        tangents.column(0).cross(&tangents.column(1))
    }
}
