//! Load stepping (continuation) for parametrized nonlinear problems.
//!
//! A nonlinear system $\vec G(\vec u; \lambda) = 0$ is solved for a sequence of equally spaced
//! loads $\lambda_i = \lambda \, i / n$, $i = 1, \dots, n$. The converged solution of each step is
//! the initial guess of the next, which lets Newton's method reach loads for which it would
//! diverge if the full load was applied at once.
//!
//! A failed step aborts the whole sequence. There is no retry with smaller increments.
use crate::boundary::{Load, ParameterError};
use crate::nalgebra::{DVector, DVectorViewMut};
use crate::optimize::calculus::DifferentiableVectorFunction;
use crate::optimize::newton::{
    newton_line_search, BacktrackingLineSearch, NewtonError, NewtonResult, NewtonSettings, NoLineSearch,
};
use crate::problem::LoadParametrized;
use crate::Real;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// The load parameter to drive and the value it should reach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadTarget<T: Real> {
    pub parameter: String,
    pub value: Load<T>,
}

impl<T: Real> LoadTarget<T> {
    pub fn new(parameter: impl Into<String>, value: Load<T>) -> Self {
        Self {
            parameter: parameter.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSearchKind {
    /// Full Newton steps.
    #[default]
    None,
    Backtracking,
}

/// Settings of the load stepping procedure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadStepping<T> {
    pub num_steps: usize,
    pub newton: NewtonSettings<T>,
    #[serde(default)]
    pub line_search: LineSearchKind,
}

/// The state after a converged step, passed to the measurement callback.
#[derive(Debug, Clone, Copy)]
pub struct StepState<'a, T: Real> {
    /// The step index, with step `0` being the initial state at zero load.
    pub step: usize,
    /// Fraction `i / n` of the target load.
    pub fraction: T,
    pub load: &'a Load<T>,
    pub displacement: &'a DVector<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadStep<T: Real, Q> {
    pub step: usize,
    pub fraction: T,
    pub load: Load<T>,
    pub quantity: Q,
    pub newton_iterations: usize,
}

/// Load-response curve: one record for the zero load followed by one record per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPath<T: Real, Q> {
    steps: Vec<LoadStep<T, Q>>,
}

impl<T: Real, Q> LoadPath<T, Q> {
    pub fn steps(&self) -> &[LoadStep<T, Q>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn loads(&self) -> impl Iterator<Item = &Load<T>> {
        self.steps.iter().map(|step| &step.load)
    }

    pub fn quantities(&self) -> impl Iterator<Item = &Q> {
        self.steps.iter().map(|step| &step.quantity)
    }

    pub fn into_steps(self) -> Vec<LoadStep<T, Q>> {
        self.steps
    }
}

/// Result of a successful continuation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationOutcome<T: Real, Q> {
    pub path: LoadPath<T, Q>,
    /// The converged displacement at the target load.
    pub displacement: DVector<T>,
}

#[derive(Debug)]
pub enum ContinuationError<T: Real> {
    /// The number of steps must be positive.
    InvalidStepCount,
    /// The initial displacement does not match the dimension of the problem.
    DimensionMismatch { expected: usize, actual: usize },
    /// The load parameter could not be set on the problem.
    Parameter(ParameterError),
    /// Newton's method did not converge (maximum iterations, divergence or failed line search).
    NonConvergence {
        step: usize,
        load: Load<T>,
        source: NewtonError,
    },
    /// The linear system with the Jacobian could not be solved.
    JacobianFailure {
        step: usize,
        load: Load<T>,
        source: NewtonError,
    },
    /// The measurement callback failed.
    Measurement { step: usize, source: eyre::Report },
}

impl<T: Real> ContinuationError<T> {
    /// The step at which the sequence was aborted, if it was started.
    pub fn step(&self) -> Option<usize> {
        match self {
            ContinuationError::NonConvergence { step, .. }
            | ContinuationError::JacobianFailure { step, .. }
            | ContinuationError::Measurement { step, .. } => Some(*step),
            _ => None,
        }
    }
}

impl<T: Real> Display for ContinuationError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContinuationError::InvalidStepCount => write!(f, "Number of load steps must be at least 1."),
            ContinuationError::DimensionMismatch { expected, actual } => write!(
                f,
                "Initial displacement has dimension {}, but the problem has dimension {}.",
                actual, expected
            ),
            ContinuationError::Parameter(err) => write!(f, "Failed to set load parameter: {}", err),
            ContinuationError::NonConvergence { step, load, source } => write!(
                f,
                "Newton solver did not converge in load step {} (load {}): {}",
                step, load, source
            ),
            ContinuationError::JacobianFailure { step, load, source } => write!(
                f,
                "Failed to solve Jacobian system in load step {} (load {}): {}",
                step, load, source
            ),
            ContinuationError::Measurement { step, source } => {
                write!(f, "Measurement failed after load step {}: {}", step, source)
            }
        }
    }
}

impl<T: Real> Error for ContinuationError<T> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ContinuationError::Parameter(err) => Some(err),
            ContinuationError::NonConvergence { source, .. } | ContinuationError::JacobianFailure { source, .. } => {
                Some(source)
            }
            ContinuationError::Measurement { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

impl<T: Real> From<ParameterError> for ContinuationError<T> {
    fn from(err: ParameterError) -> Self {
        ContinuationError::Parameter(err)
    }
}

impl<T: Real> LoadStepping<T> {
    pub fn new(num_steps: usize) -> Self {
        Self {
            num_steps,
            newton: NewtonSettings::default(),
            line_search: LineSearchKind::None,
        }
    }

    pub fn with_newton_settings(self, newton: NewtonSettings<T>) -> Self {
        Self { newton, ..self }
    }

    pub fn with_line_search(self, line_search: LineSearchKind) -> Self {
        Self { line_search, ..self }
    }

    /// The load fractions `i / n` for `i = 1, ..., n`.
    pub fn load_fractions(&self) -> impl Iterator<Item = T> {
        let n = self.num_steps;
        (1..=n).map(move |i| to_real::<T>(i) / to_real(n))
    }

    /// The load of step `i`, computed as `target * i / n` so that integer multiples are exact.
    ///
    /// The last step returns the target itself.
    pub fn load_at_step(&self, target: &Load<T>, step: usize) -> Load<T> {
        if step == self.num_steps {
            return *target;
        }
        let i = to_real::<T>(step);
        let n = to_real::<T>(self.num_steps);
        target.map(|value| value * i / n)
    }

    /// Walks the load parameter from zero to the target in `num_steps` equal increments.
    ///
    /// `initial` is the displacement at zero load (usually zero). At every step the parameter is
    /// set on the problem and Newton's method is started from the converged displacement of the
    /// previous step. After each converged step (and once for the initial state) `measure` is
    /// called to record a derived quantity.
    ///
    /// The driver owns the displacement for the duration of the run and returns it together with
    /// the load path. Any failure aborts the sequence.
    pub fn run<P, Q, Measure>(
        &self,
        problem: &mut P,
        target: &LoadTarget<T>,
        initial: DVector<T>,
        mut measure: Measure,
    ) -> Result<ContinuationOutcome<T, Q>, ContinuationError<T>>
    where
        P: DifferentiableVectorFunction<T> + LoadParametrized<T>,
        Measure: FnMut(&P, &StepState<T>) -> eyre::Result<Q>,
    {
        if self.num_steps == 0 {
            return Err(ContinuationError::InvalidStepCount);
        }
        let dim = problem.dimension();
        if initial.len() != dim {
            return Err(ContinuationError::DimensionMismatch {
                expected: dim,
                actual: initial.len(),
            });
        }

        let mut u = initial;
        let mut f = DVector::zeros(dim);
        let mut dx = DVector::zeros(dim);
        let mut steps = Vec::with_capacity(self.num_steps + 1);

        let zero_load = target.value.zero_like();
        problem.set_parameter(&target.parameter, &zero_load)?;
        let state = StepState {
            step: 0,
            fraction: T::zero(),
            load: &zero_load,
            displacement: &u,
        };
        let quantity = measure(&*problem, &state).map_err(|source| ContinuationError::Measurement { step: 0, source })?;
        steps.push(LoadStep {
            step: 0,
            fraction: T::zero(),
            load: zero_load,
            quantity,
            newton_iterations: 0,
        });

        for (i, fraction) in (1..=self.num_steps).zip(self.load_fractions()) {
            let load = self.load_at_step(&target.value, i);
            problem.set_parameter(&target.parameter, &load)?;

            let result = self.solve_step(problem, &mut u, &mut f, &mut dx);
            let NewtonResult {
                iterations,
                residual_norm,
            } = match result {
                Ok(result) => result,
                Err(source) => {
                    error!("Load step {}/{} (load {}) failed: {}", i, self.num_steps, load, source);
                    return Err(if source.is_convergence_failure() {
                        ContinuationError::NonConvergence { step: i, load, source }
                    } else {
                        ContinuationError::JacobianFailure { step: i, load, source }
                    });
                }
            };
            info!(
                "Load step {}/{}: load {}, {} Newton iterations, residual norm {}",
                i, self.num_steps, load, iterations, residual_norm
            );

            let state = StepState {
                step: i,
                fraction,
                load: &load,
                displacement: &u,
            };
            let quantity = measure(&*problem, &state).map_err(|source| ContinuationError::Measurement { step: i, source })?;
            steps.push(LoadStep {
                step: i,
                fraction,
                load,
                quantity,
                newton_iterations: iterations,
            });
        }

        Ok(ContinuationOutcome {
            path: LoadPath { steps },
            displacement: u,
        })
    }

    fn solve_step<P>(
        &self,
        problem: &mut P,
        u: &mut DVector<T>,
        f: &mut DVector<T>,
        dx: &mut DVector<T>,
    ) -> Result<NewtonResult<T>, NewtonError>
    where
        P: DifferentiableVectorFunction<T>,
    {
        let (u, f, dx) = (DVectorViewMut::from(u), DVectorViewMut::from(f), DVectorViewMut::from(dx));
        match self.line_search {
            LineSearchKind::None => newton_line_search(problem, u, f, dx, self.newton, &mut NoLineSearch),
            LineSearchKind::Backtracking => {
                newton_line_search(problem, u, f, dx, self.newton, &mut BacktrackingLineSearch)
            }
        }
    }
}

fn to_real<T: Real>(n: usize) -> T {
    T::from_usize(n).expect("Step count must fit in T")
}
