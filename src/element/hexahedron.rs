use crate::element::{phi_linear_1d, phi_linear_1d_grad};
use crate::nalgebra::{distance, DVector, DVectorView, DVectorViewMut, Matrix3, Point3, SMatrix, Vector3};
use crate::optimize::calculus::VectorFunctionBuilder;
use crate::optimize::newton::{newton, NewtonSettings};
use crate::Real;
use itertools::Itertools;
use numeric_literals::replace_float_literals;
use std::error::Error;

/// Reference coordinates of the Hex8 nodes, in local node order.
#[rustfmt::skip]
const HEX8_REFERENCE_NODES: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0],
    [ 1.0,  1.0, -1.0],
    [-1.0,  1.0, -1.0],
    [-1.0, -1.0,  1.0],
    [ 1.0, -1.0,  1.0],
    [ 1.0,  1.0,  1.0],
    [-1.0,  1.0,  1.0],
];

/// The six faces of a Hex8 element as local node indices, ordered counter-clockwise when viewed
/// from outside the element so that the face normals point outwards.
#[rustfmt::skip]
pub const HEX8_FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [2, 3, 7, 6],
    [0, 4, 7, 3],
    [1, 2, 6, 5],
];

/// Trilinear hexahedral element.
///
/// Nodes are numbered counter-clockwise on the bottom face $\xi_3 = -1$ followed by the top face
/// $\xi_3 = 1$, see [`HEX8_FACES`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Hex8Element<T: Real> {
    vertices: [Point3<T>; 8],
}

impl<T: Real> Hex8Element<T> {
    pub fn from_vertices(vertices: [Point3<T>; 8]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point3<T>; 8] {
        &self.vertices
    }

    pub fn reference() -> Self {
        Self::from_vertices(HEX8_REFERENCE_NODES.map(|[x, y, z]| Point3::new(convert(x), convert(y), convert(z))))
    }

    /// Evaluates the eight basis functions at the given reference coordinates.
    pub fn evaluate_basis(&self, xi: &Point3<T>) -> SMatrix<T, 1, 8> {
        SMatrix::from_fn(|_, a| {
            let [alpha, beta, gamma] = HEX8_REFERENCE_NODES[a].map(convert);
            phi_linear_1d(alpha, xi.x) * phi_linear_1d(beta, xi.y) * phi_linear_1d(gamma, xi.z)
        })
    }

    /// Reference gradients of the basis functions, one column per node.
    pub fn gradients(&self, xi: &Point3<T>) -> SMatrix<T, 3, 8> {
        let columns = HEX8_REFERENCE_NODES.map(|node| {
            let [alpha, beta, gamma] = node.map(convert::<T>);
            Vector3::new(
                phi_linear_1d_grad(alpha) * phi_linear_1d(beta, xi.y) * phi_linear_1d(gamma, xi.z),
                phi_linear_1d(alpha, xi.x) * phi_linear_1d_grad(beta) * phi_linear_1d(gamma, xi.z),
                phi_linear_1d(alpha, xi.x) * phi_linear_1d(beta, xi.y) * phi_linear_1d_grad(gamma),
            )
        });
        SMatrix::from_columns(&columns)
    }

    fn vertex_matrix(&self) -> SMatrix<T, 3, 8> {
        SMatrix::from_fn(|i, a| self.vertices[a][i])
    }

    #[allow(non_snake_case)]
    pub fn map_reference_coords(&self, xi: &Point3<T>) -> Point3<T> {
        let X = self.vertex_matrix();
        let N = self.evaluate_basis(xi);
        Point3::from(X * N.transpose())
    }

    /// The Jacobian $\pd{\vec x}{\vec \xi}$ of the map from reference to physical coordinates.
    #[allow(non_snake_case)]
    pub fn reference_jacobian(&self, xi: &Point3<T>) -> Matrix3<T> {
        let X = self.vertex_matrix();
        let G = self.gradients(xi);
        X * G.transpose()
    }

    /// Physical gradients of the basis functions (one column per node) together with the
    /// determinant of the reference Jacobian.
    ///
    /// Returns `None` if the Jacobian is singular at `xi`.
    #[allow(non_snake_case)]
    pub fn physical_gradients(&self, xi: &Point3<T>) -> Option<(SMatrix<T, 3, 8>, T)> {
        let J = self.reference_jacobian(xi);
        let J_inv_T = J.try_inverse()?.transpose();
        Some((J_inv_T * self.gradients(xi), J.determinant()))
    }

    pub fn diameter(&self) -> T {
        self.vertices
            .iter()
            .tuple_combinations()
            .map(|(x, y)| distance(x, y))
            .fold(T::zero(), |a, b| a.max(b))
    }

    /// Whether the reference coordinates lie in $[-1 - \epsilon, 1 + \epsilon]^3$.
    pub fn reference_contains(xi: &Point3<T>, tolerance: T) -> bool {
        let bound = T::one() + tolerance;
        xi.iter().all(|xi_i| xi_i.abs() <= bound)
    }

    /// Whether the reference Jacobian has a positive determinant at all nodes and at the centroid.
    pub fn is_positively_oriented(&self) -> bool {
        HEX8_REFERENCE_NODES
            .iter()
            .map(|&[x, y, z]| Point3::new(convert(x), convert(y), convert(z)))
            .chain(std::iter::once(Point3::origin()))
            .all(|xi| self.reference_jacobian(&xi).determinant() > T::zero())
    }

    /// Computes the reference coordinates of the physical point `x` by inverting the
    /// isoparametric map with Newton's method.
    ///
    /// The returned coordinates may lie outside the reference domain if `x` is not contained in
    /// the element.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn map_physical_coordinates(&self, x: &Point3<T>) -> Result<Point3<T>, Box<dyn Error + Send + Sync>> {
        let to_point = |xi: &DVectorView<T>| Point3::new(xi[0], xi[1], xi[2]);
        let function = VectorFunctionBuilder::with_dimension(3)
            .with_function(|f: &mut DVectorViewMut<T>, xi: &DVectorView<T>| {
                f.copy_from(&(self.map_reference_coords(&to_point(xi)) - x));
            })
            .with_jacobian_solver(
                |sol: &mut DVectorViewMut<T>, xi: &DVectorView<T>, rhs: &DVectorView<T>| {
                    let j = self.reference_jacobian(&to_point(xi));
                    sol.copy_from(rhs);
                    if j.lu().solve_mut(sol) {
                        Ok(())
                    } else {
                        Err(Box::<dyn Error + Send + Sync>::from("Reference Jacobian is singular"))
                    }
                },
            );

        // Converged when |x(xi) - x| is small relative to the size of the element
        let settings = NewtonSettings {
            max_iterations: Some(20),
            tolerance: 1e-12 * self.diameter(),
            relative_tolerance: None,
        };

        let mut xi = DVector::zeros(3);
        let mut f = DVector::zeros(3);
        let mut dx = DVector::zeros(3);
        newton(function, &mut xi, &mut f, &mut dx, settings)?;
        Ok(Point3::new(xi[0], xi[1], xi[2]))
    }
}

fn convert<T: Real>(value: f64) -> T {
    T::from_f64(value).expect("Literal must fit in T")
}
