use hyperstep_solid::materials::LameParameters;
use hyperstep_solid::nalgebra;
use hyperstep_solid::nalgebra::{matrix, Matrix3};

mod kinematics;

fn lame_parameters() -> LameParameters<f64> {
    LameParameters {
        mu: 384.0,
        lambda: 577.0,
    }
}

/// A moderate, non-symmetric deformation with det(F) > 0.
fn deformation_gradient() -> Matrix3<f64> {
    matrix![1.1, 0.05, 0.02;
            -0.03, 0.95, 0.04;
            0.01, 0.02, 1.05]
}
