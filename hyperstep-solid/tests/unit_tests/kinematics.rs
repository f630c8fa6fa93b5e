use crate::unit_tests::deformation_gradient;
use hyperstep_solid::kinematics::{
    cauchy_stress, deformation_gradient as deformation_gradient_from_displacement_gradient, green_strain,
    right_cauchy_green, second_piola_kirchhoff_stress, FiberFrame,
};
use hyperstep_solid::nalgebra;
use hyperstep_solid::nalgebra::{matrix, vector, Matrix3};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};

#[test]
#[allow(non_snake_case)]
fn green_strain_of_rigid_rotation_vanishes() {
    let angle: f64 = 0.3;
    let (s, c) = angle.sin_cos();
    let F = matrix![c, -s, 0.0;
                    s, c, 0.0;
                    0.0, 0.0, 1.0];
    assert_matrix_eq!(green_strain(&F), Matrix3::zeros(), comp = abs, tol = 1e-15);
    assert_matrix_eq!(right_cauchy_green(&F), Matrix3::identity(), comp = abs, tol = 1e-15);
}

#[test]
#[allow(non_snake_case)]
fn deformation_gradient_adds_identity() {
    let u_grad = matrix![0.1, 0.2, 0.3;
                         0.0, -0.1, 0.0;
                         0.0, 0.0, 0.5];
    let F = deformation_gradient_from_displacement_gradient(&u_grad);
    assert_matrix_eq!(F, Matrix3::identity() + u_grad);
}

#[test]
#[allow(non_snake_case)]
fn stress_conversions_round_trip_through_first_piola() {
    let F = deformation_gradient();
    let S = matrix![2.0, 0.5, 0.1;
                    0.5, 1.0, -0.3;
                    0.1, -0.3, 3.0];
    let P = F * S;

    let S_converted = second_piola_kirchhoff_stress(&F, &P).unwrap();
    assert_matrix_eq!(S_converted, S, comp = abs, tol = 1e-12);

    let sigma = cauchy_stress(&F, &P).unwrap();
    let expected_sigma = F * S * F.transpose() / F.determinant();
    assert_matrix_eq!(sigma, expected_sigma, comp = abs, tol = 1e-12);
}

#[test]
#[allow(non_snake_case)]
fn cauchy_stress_is_undefined_for_inverted_deformation() {
    let F = matrix![1.0, 0.0, 0.0;
                    0.0, -1.0, 0.0;
                    0.0, 0.0, 1.0];
    assert!(cauchy_stress(&F, &Matrix3::identity()).is_none());
    assert!(second_piola_kirchhoff_stress(&Matrix3::zeros(), &Matrix3::identity()).is_none());
}

#[test]
fn fiber_frame_is_orthonormalized() {
    let frame = FiberFrame::from_fiber_and_sheet(vector![2.0, 0.0, 0.0], vector![1.0, 1.0, 0.0]).unwrap();
    assert_matrix_eq!(frame.fiber, vector![1.0, 0.0, 0.0], comp = abs, tol = 1e-15);
    assert_matrix_eq!(frame.sheet, vector![0.0, 1.0, 0.0], comp = abs, tol = 1e-15);
    assert_matrix_eq!(frame.normal, vector![0.0, 0.0, 1.0], comp = abs, tol = 1e-15);

    let rotation = frame.rotation();
    assert_scalar_eq!(rotation.determinant(), 1.0, comp = abs, tol = 1e-15);
}

#[test]
fn fiber_frame_rejects_parallel_directions() {
    let frame = FiberFrame::<f64>::from_fiber_and_sheet(vector![1.0, 1.0, 0.0], vector![2.0, 2.0, 0.0]);
    assert!(frame.is_none());
}
