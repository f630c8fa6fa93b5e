//! The discrete hyperelastic boundary value problem.
use crate::assembly::global::{apply_dirichlet_rows_csr, scatter_add_element_vector, CsrAssembler};
use crate::assembly::local::{
    assemble_element_residual, assemble_element_tangent, assemble_face_pressure, assemble_face_pressure_tangent,
    compute_element_energy, gather_element_displacement, ElementGeometry,
};
use crate::boundary::{DirichletBoundary, Load, LoadKind, ParameterError, PressureBoundary};
use crate::linear_solver::{DenseLuSolver, LinearSolver};
use crate::mesh::{HexMesh, MeshError};
use crate::nalgebra::{DVector, DVectorView, DVectorViewMut, Matrix3, Point3, Vector3};
use crate::optimize::calculus::{DifferentiableVectorFunction, VectorFunction};
use crate::quadrature::tensor::{hexahedron_gauss, quadrilateral_gauss};
use crate::quadrature::{QuadraturePair2d, DEFAULT_POINTS_PER_DIM};
use crate::sampling::{sample_displacement, sample_stress, SamplingError, StressMeasure};
use crate::solid::HyperelasticMaterial;
use crate::Real;
use log::debug;
use nalgebra_sparse::CsrMatrix;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// A problem whose boundary data depends on named load parameters.
pub trait LoadParametrized<T: Real> {
    /// Updates the named parameter without rebuilding the rest of the problem.
    fn set_parameter(&mut self, name: &str, load: &Load<T>) -> Result<(), ParameterError>;

    /// The current value of the named parameter, if it exists.
    fn parameter(&self, name: &str) -> Option<Load<T>>;
}

impl<T: Real, P: LoadParametrized<T>> LoadParametrized<T> for &mut P {
    fn set_parameter(&mut self, name: &str, load: &Load<T>) -> Result<(), ParameterError> {
        P::set_parameter(self, name, load)
    }

    fn parameter(&self, name: &str) -> Option<Load<T>> {
        P::parameter(self, name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProblemError {
    Mesh(MeshError),
    /// A boundary condition references a node that is not in the mesh.
    InvalidNode { boundary: String, node: usize },
    /// A pressure boundary references a face that is not a boundary face of the mesh.
    InvalidFace { boundary: String, face: [usize; 4] },
    /// Two boundary conditions share the same parameter name.
    DuplicateParameter(String),
    InvalidQuadratureOrder(usize),
}

impl Display for ProblemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemError::Mesh(err) => write!(f, "Invalid mesh: {}", err),
            ProblemError::InvalidNode { boundary, node } => {
                write!(f, "Boundary \"{}\" references non-existent node {}.", boundary, node)
            }
            ProblemError::InvalidFace { boundary, face } => {
                write!(f, "Boundary \"{}\" references {:?}, which is not a boundary face.", boundary, face)
            }
            ProblemError::DuplicateParameter(name) => {
                write!(f, "Load parameter \"{}\" is used by more than one boundary condition.", name)
            }
            ProblemError::InvalidQuadratureOrder(order) => {
                write!(f, "Quadrature needs at least one point per direction, got {}.", order)
            }
        }
    }
}

impl Error for ProblemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProblemError::Mesh(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MeshError> for ProblemError {
    fn from(err: MeshError) -> Self {
        ProblemError::Mesh(err)
    }
}

/// Static equilibrium of a hyperelastic body discretized with trilinear hexahedra.
///
/// The unknown is the nodal displacement vector, with the three components of node `i` stored
/// at indices `3 i`, `3 i + 1` and `3 i + 2`. The residual is the internal force minus the
/// external (pressure) force on free degrees of freedom, while constrained degrees of freedom
/// hold the residual $u_i - g_i$. Newton's method started from any displacement therefore
/// satisfies the current boundary values after its first step.
pub struct HyperelasticProblem<T: Real, M: HyperelasticMaterial<T>> {
    mesh: HexMesh<T>,
    material: M,
    parameters: M::Parameters,
    geometry: Vec<ElementGeometry<T>>,
    surface_quadrature: QuadraturePair2d<T>,
    dirichlet: Vec<DirichletBoundary<T>>,
    pressure: Vec<PressureBoundary<T>>,
    linear_solver: Box<dyn LinearSolver<T>>,
}

impl<T, M> HyperelasticProblem<T, M>
where
    T: Real,
    M: HyperelasticMaterial<T>,
{
    /// Creates a problem without boundary conditions.
    ///
    /// The mesh is validated, so that malformed meshes are reported here rather than as solver
    /// failures later on.
    pub fn new(mesh: HexMesh<T>, material: M, parameters: M::Parameters) -> Result<Self, ProblemError> {
        mesh.validate()?;
        let mut problem = Self {
            mesh,
            material,
            parameters,
            geometry: Vec::new(),
            surface_quadrature: quadrilateral_gauss(DEFAULT_POINTS_PER_DIM),
            dirichlet: Vec::new(),
            pressure: Vec::new(),
            linear_solver: Box::new(DenseLuSolver),
        };
        problem.update_geometry(DEFAULT_POINTS_PER_DIM)?;
        Ok(problem)
    }

    fn update_geometry(&mut self, points_per_dim: usize) -> Result<(), ProblemError> {
        let quadrature = hexahedron_gauss(points_per_dim);
        self.geometry = (0..self.mesh.num_cells())
            .map(|cell| {
                self.mesh
                    .element(cell)
                    .and_then(|element| ElementGeometry::from_element(&element, &quadrature))
                    .ok_or(ProblemError::Mesh(MeshError::InvertedElement { cell }))
            })
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    /// Uses Gauss rules with the given number of points per direction for volume and surface
    /// integrals.
    pub fn with_quadrature_order(mut self, points_per_dim: usize) -> Result<Self, ProblemError> {
        if points_per_dim == 0 {
            return Err(ProblemError::InvalidQuadratureOrder(points_per_dim));
        }
        self.update_geometry(points_per_dim)?;
        self.surface_quadrature = quadrilateral_gauss(points_per_dim);
        Ok(self)
    }

    pub fn with_linear_solver(mut self, solver: impl LinearSolver<T> + 'static) -> Self {
        self.linear_solver = Box::new(solver);
        self
    }

    pub fn with_dirichlet(mut self, boundary: DirichletBoundary<T>) -> Result<Self, ProblemError> {
        self.check_unique_name(boundary.name())?;
        let num_vertices = self.mesh.vertices().len();
        if let Some(&node) = boundary.nodes().iter().find(|&&node| node >= num_vertices) {
            return Err(ProblemError::InvalidNode {
                boundary: boundary.name().to_string(),
                node,
            });
        }
        self.dirichlet.push(boundary);
        Ok(self)
    }

    pub fn with_pressure(mut self, boundary: PressureBoundary<T>) -> Result<Self, ProblemError> {
        self.check_unique_name(boundary.name())?;
        let mut boundary_faces = self.mesh.boundary_faces();
        boundary_faces.sort_unstable();
        if let Some(face) = boundary
            .faces()
            .iter()
            .find(|face| boundary_faces.binary_search(face).is_err())
        {
            return Err(ProblemError::InvalidFace {
                boundary: boundary.name().to_string(),
                face: *face,
            });
        }
        self.pressure.push(boundary);
        Ok(self)
    }

    fn check_unique_name(&self, name: &str) -> Result<(), ProblemError> {
        let dirichlet_exists = self.dirichlet.iter().any(|bc| bc.name() == name);
        let pressure_exists = self.pressure.iter().any(|bc| bc.name() == name);
        if dirichlet_exists || pressure_exists {
            Err(ProblemError::DuplicateParameter(name.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn mesh(&self) -> &HexMesh<T> {
        &self.mesh
    }

    pub fn material(&self) -> &M {
        &self.material
    }

    pub fn material_parameters(&self) -> &M::Parameters {
        &self.parameters
    }

    pub fn dirichlet_boundaries(&self) -> &[DirichletBoundary<T>] {
        &self.dirichlet
    }

    pub fn pressure_boundaries(&self) -> &[PressureBoundary<T>] {
        &self.pressure
    }

    pub fn num_dofs(&self) -> usize {
        3 * self.mesh.vertices().len()
    }

    /// Constrained degrees of freedom with their prescribed values.
    ///
    /// When several boundaries constrain the same degree of freedom, the one added last wins.
    pub fn constrained_dofs(&self) -> Vec<(usize, T)> {
        let mut dofs: Vec<_> = self
            .dirichlet
            .iter()
            .flat_map(|bc| bc.constrained_dofs())
            .collect();
        // Stable sort keeps the order of boundaries within each dof
        dofs.sort_by_key(|(dof, _)| *dof);
        let mut unique: Vec<(usize, T)> = Vec::with_capacity(dofs.len());
        for (dof, value) in dofs {
            match unique.last_mut() {
                Some(last) if last.0 == dof => last.1 = value,
                _ => unique.push((dof, value)),
            }
        }
        unique
    }

    /// The total strain energy $\int_\Omega \psi(\vec F) \, dV$ of the displacement field.
    pub fn internal_energy(&self, u: &DVectorView<T>) -> T {
        assert_eq!(u.len(), self.num_dofs(), "Displacement vector has wrong dimension");
        self.mesh
            .connectivity()
            .iter()
            .zip(&self.geometry)
            .map(|(nodes, geometry)| {
                let u_element = gather_element_displacement(u, nodes);
                compute_element_energy(geometry, &u_element, &self.material, &self.parameters)
            })
            .fold(T::zero(), |acc, e| acc + e)
    }

    pub fn assemble_residual(&self, u: &DVectorView<T>) -> DVector<T> {
        let mut r = DVector::zeros(self.num_dofs());
        self.assemble_residual_into(&mut DVectorViewMut::from(&mut r), u);
        r
    }

    pub fn assemble_residual_into(&self, r: &mut DVectorViewMut<T>, u: &DVectorView<T>) {
        assert_eq!(u.len(), self.num_dofs(), "Displacement vector has wrong dimension");
        assert_eq!(r.len(), self.num_dofs(), "Residual vector has wrong dimension");
        r.fill(T::zero());

        for (nodes, geometry) in self.mesh.connectivity().iter().zip(&self.geometry) {
            let u_element = gather_element_displacement(u, nodes);
            let r_element = assemble_element_residual(geometry, &u_element, &self.material, &self.parameters);
            scatter_add_element_vector(r, nodes, &r_element);
        }

        for boundary in &self.pressure {
            let p = boundary.pressure();
            if p == T::zero() {
                continue;
            }
            for face in boundary.faces() {
                let x = self.deformed_face_vertices(face, u);
                let r_face = assemble_face_pressure(&x, p, &self.surface_quadrature);
                scatter_add_element_vector(r, face, &r_face);
            }
        }

        for (dof, value) in self.constrained_dofs() {
            r[dof] = u[dof] - value;
        }
    }

    /// Assembles the Jacobian of the residual with respect to the displacement.
    pub fn assemble_tangent(&self, u: &DVectorView<T>) -> CsrMatrix<T> {
        assert_eq!(u.len(), self.num_dofs(), "Displacement vector has wrong dimension");
        let mut assembler = CsrAssembler::with_num_dofs(self.num_dofs());

        for (nodes, geometry) in self.mesh.connectivity().iter().zip(&self.geometry) {
            let u_element = gather_element_displacement(u, nodes);
            let k_element = assemble_element_tangent(geometry, &u_element, &self.material, &self.parameters);
            assembler.add_element_matrix(nodes, &k_element);
        }

        for boundary in &self.pressure {
            let p = boundary.pressure();
            if p == T::zero() {
                continue;
            }
            for face in boundary.faces() {
                let x = self.deformed_face_vertices(face, u);
                let k_face = assemble_face_pressure_tangent(&x, p, &self.surface_quadrature);
                assembler.add_element_matrix(face, &k_face);
            }
        }

        let mut tangent = assembler.finish();
        apply_dirichlet_rows_csr(&mut tangent, self.constrained_dofs().into_iter().map(|(dof, _)| dof));
        tangent
    }

    fn deformed_face_vertices(&self, face: &[usize; 4], u: &DVectorView<T>) -> [Point3<T>; 4] {
        face.map(|v| {
            let u_v = Vector3::new(u[3 * v], u[3 * v + 1], u[3 * v + 2]);
            self.mesh.vertices()[v] + u_v
        })
    }

    /// Evaluates the displacement field at a point of the reference configuration.
    pub fn sample_displacement(&self, u: &DVectorView<T>, x: &Point3<T>) -> Result<Vector3<T>, SamplingError<T>> {
        sample_displacement(&self.mesh, u, x)
    }

    /// Evaluates a stress measure at a point of the reference configuration.
    pub fn sample_stress(
        &self,
        u: &DVectorView<T>,
        x: &Point3<T>,
        measure: StressMeasure,
    ) -> Result<Matrix3<T>, SamplingError<T>> {
        sample_stress(&self.mesh, &self.material, &self.parameters, u, x, measure)
    }
}

impl<T, M> LoadParametrized<T> for HyperelasticProblem<T, M>
where
    T: Real,
    M: HyperelasticMaterial<T>,
{
    fn set_parameter(&mut self, name: &str, load: &Load<T>) -> Result<(), ParameterError> {
        let mismatch = |expected: LoadKind| ParameterError::KindMismatch {
            name: name.to_string(),
            expected,
            found: load.kind(),
        };
        if let Some(bc) = self.dirichlet.iter_mut().find(|bc| bc.name() == name) {
            let value = load.as_vector().ok_or_else(|| mismatch(LoadKind::Vector))?;
            bc.set_value(value);
        } else if let Some(bc) = self.pressure.iter_mut().find(|bc| bc.name() == name) {
            let pressure = load.as_scalar().ok_or_else(|| mismatch(LoadKind::Scalar))?;
            bc.set_pressure(pressure);
        } else {
            return Err(ParameterError::Unknown(name.to_string()));
        }
        debug!("Set load parameter \"{}\" to {}", name, load);
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<Load<T>> {
        self.dirichlet
            .iter()
            .find(|bc| bc.name() == name)
            .map(|bc| Load::Vector(*bc.value()))
            .or_else(|| {
                self.pressure
                    .iter()
                    .find(|bc| bc.name() == name)
                    .map(|bc| Load::Scalar(bc.pressure()))
            })
    }
}

impl<T, M> VectorFunction<T> for HyperelasticProblem<T, M>
where
    T: Real,
    M: HyperelasticMaterial<T>,
{
    fn dimension(&self) -> usize {
        self.num_dofs()
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>) {
        self.assemble_residual_into(f, x);
    }
}

impl<T, M> DifferentiableVectorFunction<T> for HyperelasticProblem<T, M>
where
    T: Real,
    M: HyperelasticMaterial<T>,
{
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let tangent = self.assemble_tangent(x);
        let solution = self.linear_solver.solve(&tangent, rhs)?;
        sol.copy_from(&solution);
        Ok(())
    }
}
