use super::{beam_mesh, smooth_displacement, unit_cube_mesh};
use hyperstep::boundary::{DirichletBoundary, Load, LoadKind, ParameterError, PressureBoundary};
use hyperstep::mesh::{HexMesh, MeshError, Region};
use hyperstep::nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, Vector3};
use hyperstep::optimize::calculus::{
    approximate_gradient_fd, approximate_jacobian_fd, DifferentiableVectorFunction, VectorFunction,
};
use hyperstep::problem::{HyperelasticProblem, LoadParametrized, ProblemError};
use hyperstep::solid::materials::{
    GuccioneMaterial, GuccioneParameters, LameParameters, NeoHookeanMaterial, YoungPoisson,
};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};

fn lame() -> LameParameters<f64> {
    LameParameters::from(YoungPoisson {
        young: 10.0,
        poisson: 0.3,
    })
}

fn neo_hookean_problem(mesh: HexMesh<f64>) -> HyperelasticProblem<f64, NeoHookeanMaterial> {
    HyperelasticProblem::new(mesh, NeoHookeanMaterial, lame()).unwrap()
}

/// Beam clamped at `x = 0` with a pressure on the bottom face and a prescribed displacement of
/// the top face in the y-direction only.
fn loaded_beam_problem() -> HyperelasticProblem<f64, GuccioneMaterial> {
    let mesh = beam_mesh([4, 1, 2]);
    let left = mesh.select_vertices(|x| Region::plane(0, 0.0).contains(x));
    let right = mesh.select_vertices(|x| Region::plane(0, 10.0).contains(x));
    let bottom = mesh.select_boundary_faces(|x| Region::plane(2, 0.0).contains(x));
    HyperelasticProblem::new(mesh, GuccioneMaterial, GuccioneParameters::default())
        .unwrap()
        .with_dirichlet(DirichletBoundary::clamped("clamp", left))
        .unwrap()
        .with_dirichlet(DirichletBoundary::new(
            "right",
            right,
            [false, true, false],
            Vector3::new(0.0, 0.2, 0.0),
        ))
        .unwrap()
        .with_pressure(PressureBoundary::new("bottom", bottom, 0.05))
        .unwrap()
}

#[test]
fn residual_vanishes_in_reference_configuration() {
    let problem = neo_hookean_problem(beam_mesh([3, 1, 1]));
    let u = DVector::zeros(problem.num_dofs());
    let r = problem.assemble_residual(&DVectorView::from(&u));
    assert_matrix_eq!(r, DVector::zeros(problem.num_dofs()), comp = abs, tol = 1e-14);
    assert_scalar_eq!(problem.internal_energy(&DVectorView::from(&u)), 0.0, comp = abs, tol = 1e-14);
}

#[test]
fn residual_is_gradient_of_internal_energy_without_boundary_conditions() {
    let mesh = unit_cube_mesh([2, 1, 2]);
    let mut u = smooth_displacement(&mesh, 0.2);
    let problem = neo_hookean_problem(mesh);
    let r = problem.assemble_residual(&DVectorView::from(&u));
    let fd = approximate_gradient_fd(|u| problem.internal_energy(&u), &mut u, 1e-6);
    assert_matrix_eq!(r, fd, comp = abs, tol = 1e-7);
}

#[test]
fn tangent_is_jacobian_of_residual() {
    let problem = loaded_beam_problem();
    let mut u = smooth_displacement(problem.mesh(), 0.02);
    let tangent = DMatrix::from(&problem.assemble_tangent(&DVectorView::from(&u)));
    let fd = approximate_jacobian_fd(
        problem.num_dofs(),
        |u, mut r| problem.assemble_residual_into(&mut r, &u),
        &mut u,
        1e-6,
    );
    assert_matrix_eq!(tangent, fd, comp = abs, tol = 1e-5 * fd.amax());
}

#[test]
fn dirichlet_rows_hold_distance_to_prescribed_value() {
    let problem = loaded_beam_problem();
    let u = smooth_displacement(problem.mesh(), 0.1);
    let r = problem.assemble_residual(&DVectorView::from(&u));
    let constrained = problem.constrained_dofs();
    assert!(!constrained.is_empty());
    for (dof, value) in constrained {
        assert_eq!(r[dof], u[dof] - value);
    }
}

#[test]
fn constrained_dofs_prefer_last_boundary() {
    let mesh = unit_cube_mesh([1, 1, 1]);
    let problem = neo_hookean_problem(mesh)
        .with_dirichlet(DirichletBoundary::new("a", vec![0], [true, true, false], Vector3::new(1.0, 1.0, 1.0)))
        .unwrap()
        .with_dirichlet(DirichletBoundary::new("b", vec![0], [false, true, true], Vector3::new(2.0, 2.0, 2.0)))
        .unwrap();
    assert_eq!(problem.constrained_dofs(), vec![(0, 1.0), (1, 2.0), (2, 2.0)]);
}

#[test]
fn set_parameter_updates_boundary_values() {
    let mut problem = loaded_beam_problem();
    let displacement = Load::Vector(Vector3::new(0.0, 0.5, 0.0));
    problem.set_parameter("right", &displacement).unwrap();
    problem.set_parameter("bottom", &Load::Scalar(0.1)).unwrap();
    assert_eq!(problem.parameter("right"), Some(displacement));
    assert_eq!(problem.parameter("bottom"), Some(Load::Scalar(0.1)));
    assert_eq!(problem.parameter("top"), None);

    assert_eq!(
        problem.set_parameter("top", &Load::Scalar(1.0)),
        Err(ParameterError::Unknown("top".to_string()))
    );
    assert_eq!(
        problem.set_parameter("bottom", &displacement),
        Err(ParameterError::KindMismatch {
            name: "bottom".to_string(),
            expected: LoadKind::Scalar,
            found: LoadKind::Vector
        })
    );
    assert_eq!(
        problem.set_parameter("clamp", &Load::Scalar(1.0)),
        Err(ParameterError::KindMismatch {
            name: "clamp".to_string(),
            expected: LoadKind::Vector,
            found: LoadKind::Scalar
        })
    );
    // Failed updates leave the parameters untouched
    assert_eq!(problem.parameter("bottom"), Some(Load::Scalar(0.1)));
}

#[test]
fn construction_rejects_invalid_input() {
    let mesh = unit_cube_mesh([1, 1, 1]);

    let invalid_node = neo_hookean_problem(mesh.clone())
        .with_dirichlet(DirichletBoundary::clamped("clamp", vec![0, 8]))
        .err();
    assert_eq!(
        invalid_node,
        Some(ProblemError::InvalidNode {
            boundary: "clamp".to_string(),
            node: 8
        })
    );

    // An interior diagonal of the cube is not a boundary face
    let invalid_face = neo_hookean_problem(mesh.clone())
        .with_pressure(PressureBoundary::new("p", vec![[0, 1, 6, 7]], 1.0))
        .err();
    assert_eq!(
        invalid_face,
        Some(ProblemError::InvalidFace {
            boundary: "p".to_string(),
            face: [0, 1, 6, 7]
        })
    );

    let duplicate = neo_hookean_problem(mesh.clone())
        .with_dirichlet(DirichletBoundary::clamped("bc", vec![0]))
        .unwrap()
        .with_pressure(PressureBoundary::new("bc", Vec::new(), 1.0))
        .err();
    assert_eq!(duplicate, Some(ProblemError::DuplicateParameter("bc".to_string())));

    let zero_order = neo_hookean_problem(mesh.clone()).with_quadrature_order(0).err();
    assert_eq!(zero_order, Some(ProblemError::InvalidQuadratureOrder(0)));

    let empty = HexMesh::from_vertices_and_connectivity(mesh.vertices().to_vec(), Vec::new());
    let result = HyperelasticProblem::new(empty, NeoHookeanMaterial, lame()).err();
    assert_eq!(result, Some(ProblemError::Mesh(MeshError::Empty)));
}

#[test]
fn higher_quadrature_order_preserves_stress_free_state() {
    let problem = neo_hookean_problem(beam_mesh([2, 1, 1]))
        .with_quadrature_order(3)
        .unwrap();
    let u = DVector::zeros(problem.num_dofs());
    assert_scalar_eq!(
        problem.assemble_residual(&DVectorView::from(&u)).amax(),
        0.0,
        comp = abs,
        tol = 1e-14
    );
}

#[test]
fn jacobian_system_solution_satisfies_tangent_system() {
    let mut problem = loaded_beam_problem();
    let u = smooth_displacement(problem.mesh(), 0.02);
    let rhs = DVector::from_fn(problem.dimension(), |i, _| ((i % 7) as f64) - 3.0);
    let mut sol = DVector::zeros(problem.dimension());
    problem
        .solve_jacobian_system(
            &mut DVectorViewMut::from(&mut sol),
            &DVectorView::from(&u),
            &DVectorView::from(&rhs),
        )
        .unwrap();
    let tangent = DMatrix::from(&problem.assemble_tangent(&DVectorView::from(&u)));
    let residual = tangent * &sol - &rhs;
    assert!(residual.amax() <= 1e-8 * rhs.amax());

    let mut f = DVector::zeros(problem.dimension());
    problem.eval_into(&mut DVectorViewMut::from(&mut f), &DVectorView::from(&u));
    assert_eq!(f, problem.assemble_residual(&DVectorView::from(&u)));
}
