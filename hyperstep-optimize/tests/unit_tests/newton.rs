use hyperstep_optimize::calculus::{DifferentiableVectorFunction, VectorFunction, VectorFunctionBuilder};
use hyperstep_optimize::newton::*;
use matrixcompare::assert_scalar_eq;
use nalgebra::{DVector, DVectorView, DVectorViewMut, Matrix3, Vector3};
use numeric_literals::replace_numeric_literals;
use std::error::Error;

struct MockLinearVectorFunction;

impl VectorFunction<f64> for MockLinearVectorFunction {
    fn dimension(&self) -> usize {
        3
    }

    #[replace_numeric_literals(f64::from(literal))]
    fn eval_into(&mut self, f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>) {
        let a = Matrix3::new(5, 1, 2, 1, 4, 2, 2, 2, 4);
        let b = Vector3::new(1, 2, 3);
        let r = a * x - b;
        f.copy_from(&r);
    }
}

impl DifferentiableVectorFunction<f64> for MockLinearVectorFunction {
    #[replace_numeric_literals(f64::from(literal))]
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<f64>,
        _x: &DVectorView<f64>,
        rhs: &DVectorView<f64>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let a = Matrix3::new(5, 1, 2, 1, 4, 2, 2, 2, 4);
        let a_inv = a.try_inverse().ok_or("matrix is singular")?;
        sol.copy_from(&(a_inv * rhs));
        Ok(())
    }
}

/// F(x) = atan(x), for which Newton's method diverges when started far from the root.
fn arctan_function() -> impl DifferentiableVectorFunction<f64> {
    VectorFunctionBuilder::with_dimension(1)
        .with_function(|f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>| {
            f[0] = x[0].atan();
        })
        .with_jacobian_solver(
            |sol: &mut DVectorViewMut<f64>, x: &DVectorView<f64>, rhs: &DVectorView<f64>| {
                sol[0] = rhs[0] * (1.0 + x[0] * x[0]);
                Ok(())
            },
        )
}

#[test]
fn newton_converges_in_single_iteration_for_linear_system() {
    let expected_solution = Vector3::new(-0.125, 0.16666667, 0.72916667);

    let settings = NewtonSettings {
        max_iterations: Some(2),
        tolerance: Vector3::new(1.0, 2.0, 3.0).norm() * 1e-6,
        relative_tolerance: None,
    };

    let mut f = DVector::zeros(3);
    let mut x = DVector::zeros(3);
    let mut dx = DVector::zeros(3);

    let result =
        newton(MockLinearVectorFunction, &mut x, &mut f, &mut dx, settings).expect("Newton iterations must succeed");
    let diff = x - expected_solution;
    assert!(diff.norm() < 1e-6);
    assert_eq!(result.iterations, 1);
    assert!(result.residual_norm <= settings.tolerance);
}

#[test]
fn newton_performs_no_iterations_when_initial_guess_is_solution() {
    let mut x = DVector::from_column_slice(&[-0.125, 1.0 / 6.0, 35.0 / 48.0]);
    let x_initial = x.clone();
    let mut f = DVector::zeros(3);
    let mut dx = DVector::zeros(3);

    let result = newton(
        MockLinearVectorFunction,
        &mut x,
        &mut f,
        &mut dx,
        NewtonSettings::default(),
    )
    .unwrap();
    assert_eq!(result.iterations, 0);
    assert_eq!(x, x_initial);
}

#[test]
fn newton_reports_divergence_for_arctan_far_from_root() {
    let mut x = DVector::from_element(1, 10.0);
    let mut f = DVector::zeros(1);
    let mut dx = DVector::zeros(1);

    let err = newton(arctan_function(), &mut x, &mut f, &mut dx, NewtonSettings::default()).unwrap_err();
    assert!(err.is_convergence_failure());
    assert!(matches!(
        err,
        NewtonError::NonFiniteResidual { .. } | NewtonError::MaximumIterationsReached(_)
    ));
}

#[test]
fn newton_reports_maximum_iterations() {
    let mut x = DVector::from_element(1, 1.0);
    let mut f = DVector::zeros(1);
    let mut dx = DVector::zeros(1);

    let settings = NewtonSettings {
        max_iterations: Some(1),
        tolerance: 1e-14,
        relative_tolerance: None,
    };
    let err = newton(arctan_function(), &mut x, &mut f, &mut dx, settings).unwrap_err();
    assert!(matches!(err, NewtonError::MaximumIterationsReached(1)));
}

#[test]
fn backtracking_line_search_rescues_arctan() {
    let mut x = DVector::from_element(1, 10.0);
    let mut f = DVector::zeros(1);
    let mut dx = DVector::zeros(1);

    let settings = NewtonSettings {
        max_iterations: Some(50),
        tolerance: 1e-12,
        relative_tolerance: None,
    };
    newton_line_search(
        arctan_function(),
        &mut x,
        &mut f,
        &mut dx,
        settings,
        &mut BacktrackingLineSearch,
    )
    .expect("Line search must rescue the iteration");
    assert_scalar_eq!(x[0], 0.0, comp = abs, tol = 1e-12);
}

#[test]
fn relative_tolerance_accepts_scaled_residual() {
    let mut x = DVector::from_element(1, 1.0);
    let mut f = DVector::zeros(1);
    let mut dx = DVector::zeros(1);

    // |atan(1)| = pi / 4, so a relative tolerance of 1 is satisfied immediately
    let settings = NewtonSettings {
        max_iterations: Some(0),
        tolerance: 1e-14,
        relative_tolerance: Some(1.0),
    };
    let result = newton(arctan_function(), &mut x, &mut f, &mut dx, settings).unwrap();
    assert_eq!(result.iterations, 0);
}

#[test]
fn jacobian_failure_is_not_a_convergence_failure() {
    let function = VectorFunctionBuilder::with_dimension(1)
        .with_function(|f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>| {
            f[0] = x[0] - 1.0;
        })
        .with_jacobian_solver(
            |_sol: &mut DVectorViewMut<f64>, _x: &DVectorView<f64>, _rhs: &DVectorView<f64>| {
                Err(Box::<dyn Error + Send + Sync>::from("singular"))
            },
        );

    let mut x = DVector::zeros(1);
    let mut f = DVector::zeros(1);
    let mut dx = DVector::zeros(1);
    let err = newton(function, &mut x, &mut f, &mut dx, NewtonSettings::default()).unwrap_err();
    assert!(matches!(err, NewtonError::JacobianError(_)));
    assert!(!err.is_convergence_failure());
}
