use hyperstep::boundary::{Load, LoadKind, ParameterError};
use hyperstep::continuation::{ContinuationError, LineSearchKind, LoadStepping, LoadTarget};
use hyperstep::nalgebra::{DVector, DVectorView, DVectorViewMut};
use hyperstep::optimize::calculus::{DifferentiableVectorFunction, VectorFunction};
use hyperstep::optimize::newton::NewtonError;
use hyperstep::problem::LoadParametrized;
use matrixcompare::assert_matrix_eq;
use proptest::prelude::*;
use std::error::Error;

/// The system `atan(u_i - lambda) = 0`, for which undamped Newton diverges when the initial
/// guess is further than roughly 1.39 from the root.
#[derive(Debug, Clone)]
struct AtanSystem {
    lambda: f64,
    dim: usize,
    fail_jacobian: bool,
    record_next_guess: bool,
    initial_guesses: Vec<DVector<f64>>,
}

impl AtanSystem {
    fn new(dim: usize) -> Self {
        Self {
            lambda: 0.0,
            dim,
            fail_jacobian: false,
            record_next_guess: false,
            initial_guesses: Vec::new(),
        }
    }
}

impl VectorFunction<f64> for AtanSystem {
    fn dimension(&self) -> usize {
        self.dim
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>) {
        if self.record_next_guess {
            self.initial_guesses.push(x.clone_owned());
            self.record_next_guess = false;
        }
        for i in 0..self.dim {
            f[i] = (x[i] - self.lambda).atan();
        }
    }
}

impl DifferentiableVectorFunction<f64> for AtanSystem {
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<f64>,
        x: &DVectorView<f64>,
        rhs: &DVectorView<f64>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.fail_jacobian {
            return Err(Box::from("singular Jacobian"));
        }
        for i in 0..self.dim {
            let d = x[i] - self.lambda;
            sol[i] = rhs[i] * (1.0 + d * d);
        }
        Ok(())
    }
}

impl LoadParametrized<f64> for AtanSystem {
    fn set_parameter(&mut self, name: &str, load: &Load<f64>) -> Result<(), ParameterError> {
        if name != "lambda" {
            return Err(ParameterError::Unknown(name.to_string()));
        }
        self.lambda = load.as_scalar().ok_or_else(|| ParameterError::KindMismatch {
            name: name.to_string(),
            expected: LoadKind::Scalar,
            found: load.kind(),
        })?;
        self.record_next_guess = true;
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<Load<f64>> {
        (name == "lambda").then(|| Load::Scalar(self.lambda))
    }
}

fn lambda_target(value: f64) -> LoadTarget<f64> {
    LoadTarget::new("lambda", Load::Scalar(value))
}

fn first_component(_: &AtanSystem, state: &hyperstep::continuation::StepState<f64>) -> eyre::Result<f64> {
    Ok(state.displacement[0])
}

#[test]
fn load_steps_are_exact_multiples_of_target() {
    let stepping = LoadStepping::<f64>::new(10);
    let loads: Vec<_> = (0..=10)
        .map(|i| stepping.load_at_step(&Load::Scalar(10.0), i))
        .collect();
    let expected: Vec<_> = (0..=10).map(|i| Load::Scalar(i as f64)).collect();
    assert_eq!(loads, expected);

    let fractions: Vec<f64> = LoadStepping::new(4).load_fractions().collect();
    assert_eq!(fractions, vec![0.25, 0.5, 0.75, 1.0]);
}

#[test]
fn stepping_reaches_target_where_single_newton_solve_diverges() {
    let mut system = AtanSystem::new(2);
    let outcome = LoadStepping::new(10)
        .run(&mut system, &lambda_target(10.0), DVector::zeros(2), first_component)
        .unwrap();

    let path = outcome.path;
    assert_eq!(path.len(), 11);
    let loads: Vec<_> = path.loads().cloned().collect();
    let expected_loads: Vec<_> = (0..=10).map(|i| Load::Scalar(i as f64)).collect();
    assert_eq!(loads, expected_loads);

    let steps = path.steps();
    assert_eq!(steps[0].step, 0);
    assert_eq!(steps[0].fraction, 0.0);
    assert_eq!(steps[0].quantity, 0.0);
    assert_eq!(steps[0].newton_iterations, 0);
    for (i, step) in steps.iter().enumerate().skip(1) {
        assert_eq!(step.step, i);
        assert!(step.newton_iterations > 0);
        assert!((step.quantity - i as f64).abs() < 1e-8);
    }
    assert_eq!(steps[10].fraction, 1.0);
    assert_matrix_eq!(outcome.displacement, DVector::repeat(2, 10.0), comp = abs, tol = 1e-8);
    assert_eq!(system.parameter("lambda"), Some(Load::Scalar(10.0)));
}

#[test]
fn single_full_step_does_not_converge() {
    let mut system = AtanSystem::new(1);
    let err = LoadStepping::new(1)
        .run(&mut system, &lambda_target(10.0), DVector::zeros(1), first_component)
        .unwrap_err();
    assert!(matches!(
        err,
        ContinuationError::NonConvergence {
            step: 1,
            load: Load::Scalar(_),
            source: NewtonError::NonFiniteResidual { .. } | NewtonError::MaximumIterationsReached(_),
        }
    ));
    assert_eq!(err.step(), Some(1));
    assert!(err.source().is_some());
}

#[test]
fn backtracking_line_search_rescues_single_full_step() {
    let mut system = AtanSystem::new(1);
    let outcome = LoadStepping::new(1)
        .with_line_search(LineSearchKind::Backtracking)
        .run(&mut system, &lambda_target(10.0), DVector::zeros(1), first_component)
        .unwrap();
    assert_eq!(outcome.path.len(), 2);
    assert!((outcome.displacement[0] - 10.0).abs() < 1e-8);
}

#[test]
fn each_step_starts_from_previous_solution() {
    let mut system = AtanSystem::new(3);
    let initial = DVector::from_column_slice(&[0.1, -0.2, 0.05]);
    let mut converged = Vec::new();
    LoadStepping::new(5)
        .run(&mut system, &lambda_target(5.0), initial.clone(), |_, state| {
            converged.push(state.displacement.clone());
            Ok(())
        })
        .unwrap();

    // The measurement at zero load sees the initial displacement untouched
    assert_eq!(converged.len(), 6);
    assert_eq!(converged[0], initial);
    assert_eq!(system.initial_guesses.len(), 5);
    for (guess, previous) in system.initial_guesses.iter().zip(&converged) {
        assert_eq!(guess, previous);
    }
}

#[test]
fn repeated_runs_give_identical_paths() {
    let stepping = LoadStepping::new(7);
    let run = || {
        let mut system = AtanSystem::new(4);
        stepping
            .run(&mut system, &lambda_target(7.0), DVector::zeros(4), first_component)
            .unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn invalid_inputs_are_rejected_before_solving() {
    let mut system = AtanSystem::new(2);
    let err = LoadStepping::new(0)
        .run(&mut system, &lambda_target(1.0), DVector::zeros(2), first_component)
        .unwrap_err();
    assert!(matches!(err, ContinuationError::InvalidStepCount));
    assert_eq!(err.step(), None);

    let err = LoadStepping::new(2)
        .run(&mut system, &lambda_target(1.0), DVector::zeros(3), first_component)
        .unwrap_err();
    assert!(matches!(
        err,
        ContinuationError::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    ));

    let err = LoadStepping::new(2)
        .run(&mut system, &LoadTarget::new("mu", Load::Scalar(1.0)), DVector::zeros(2), first_component)
        .unwrap_err();
    assert!(matches!(err, ContinuationError::Parameter(ParameterError::Unknown(ref name)) if name == "mu"));

    let vector_target = LoadTarget::new("lambda", Load::Vector([1.0, 0.0, 0.0].into()));
    let err = LoadStepping::new(2)
        .run(&mut system, &vector_target, DVector::zeros(2), first_component)
        .unwrap_err();
    assert!(matches!(
        err,
        ContinuationError::Parameter(ParameterError::KindMismatch {
            expected: LoadKind::Scalar,
            found: LoadKind::Vector,
            ..
        })
    ));
    assert!(system.initial_guesses.is_empty());
}

#[test]
fn failed_measurement_aborts_the_sequence() {
    let mut system = AtanSystem::new(1);
    let mut calls = 0;
    let err = LoadStepping::new(5)
        .run(&mut system, &lambda_target(5.0), DVector::zeros(1), |_, state| {
            calls += 1;
            if state.step == 3 {
                eyre::bail!("probe failed")
            }
            Ok(())
        })
        .unwrap_err();
    assert_eq!(calls, 4);
    assert!(matches!(err, ContinuationError::Measurement { step: 3, .. }));
    assert!(err.to_string().contains("probe failed"));
}

#[test]
fn jacobian_failure_is_distinguished_from_non_convergence() {
    let mut system = AtanSystem::new(1);
    system.fail_jacobian = true;
    let err = LoadStepping::new(3)
        .run(&mut system, &lambda_target(3.0), DVector::zeros(1), first_component)
        .unwrap_err();
    match err {
        ContinuationError::JacobianFailure { step, load, source } => {
            assert_eq!(step, 1);
            assert_eq!(load, Load::Scalar(1.0));
            assert!(matches!(source, NewtonError::JacobianError(_)));
        }
        other => panic!("Unexpected error: {}", other),
    }
}

proptest! {
    #[test]
    fn load_fractions_increase_to_one(n in 1..50usize) {
        let fractions: Vec<f64> = LoadStepping::new(n).load_fractions().collect();
        prop_assert_eq!(fractions.len(), n);
        prop_assert!(fractions.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(fractions[0] > 0.0);
        prop_assert_eq!(fractions[n - 1], 1.0);
    }

    #[test]
    fn last_step_load_equals_target(n in 1..50usize, value in -100.0..100.0f64) {
        let target = Load::Vector([value, -value, 0.5 * value].into());
        prop_assert_eq!(LoadStepping::<f64>::new(n).load_at_step(&target, n), target);
    }
}
