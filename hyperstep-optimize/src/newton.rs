use crate::calculus::{DifferentiableVectorFunction, VectorFunction};
use crate::Real;
use itertools::iterate;
use log::debug;
use nalgebra::{DVectorView, DVectorViewMut, Scalar};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Summary of a successful Newton solve.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NewtonResult<T>
where
    T: Scalar,
{
    pub iterations: usize,
    /// Euclidean norm of the residual at the returned solution.
    pub residual_norm: T,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewtonSettings<T> {
    pub max_iterations: Option<usize>,
    /// Absolute tolerance on the Euclidean norm of the residual.
    pub tolerance: T,
    /// Optional tolerance relative to the norm of the initial residual.
    pub relative_tolerance: Option<T>,
}

impl<T: Real> Default for NewtonSettings<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn default() -> Self {
        Self {
            max_iterations: Some(50),
            tolerance: 1e-10,
            relative_tolerance: Some(1e-9),
        }
    }
}

#[derive(Debug)]
pub enum NewtonError {
    /// The procedure failed because the maximum number of iterations was reached.
    MaximumIterationsReached(usize),
    /// The residual norm became NaN or infinite, i.e. the iterates diverged.
    NonFiniteResidual { iteration: usize },
    /// The procedure failed because solving the Jacobian system failed.
    JacobianError(Box<dyn Error + Send + Sync>),
    /// The line search failed to produce a valid step direction.
    LineSearchError(Box<dyn Error + Send + Sync>),
}

impl NewtonError {
    /// Whether the error means that the iteration did not converge, as opposed to
    /// a failure of the linear Jacobian solve.
    pub fn is_convergence_failure(&self) -> bool {
        !matches!(self, NewtonError::JacobianError(_))
    }
}

impl Display for NewtonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            &NewtonError::MaximumIterationsReached(maxit) => {
                write!(f, "Failed to converge within maximum number of iterations ({}).", maxit)
            }
            &NewtonError::NonFiniteResidual { iteration } => {
                write!(f, "Residual became non-finite at iteration {}. Newton iterates diverged.", iteration)
            }
            &NewtonError::JacobianError(ref err) => {
                write!(f, "Failed to solve Jacobian system. Error: {}", err)
            }
            &NewtonError::LineSearchError(ref err) => {
                write!(f, "Line search failed to produce valid step direction. Error: {}", err)
            }
        }
    }
}

impl Error for NewtonError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NewtonError::JacobianError(err) | NewtonError::LineSearchError(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Attempts to solve the non-linear equation F(u) = 0.
///
/// `x` holds the initial guess on entry and the solution on successful return. `f` and `dx` are
/// work buffers of the same dimension, so no heap allocation is performed by the iteration itself.
///
/// The solution is said to have converged if ```|F(u)|_2 <= tolerance```, or, when a relative
/// tolerance is given, if ```|F(u)|_2 <= relative_tolerance * |F(u_0)|_2```.
pub fn newton<'a, T, F>(
    function: F,
    x: impl Into<DVectorViewMut<'a, T>>,
    f: impl Into<DVectorViewMut<'a, T>>,
    dx: impl Into<DVectorViewMut<'a, T>>,
    settings: NewtonSettings<T>,
) -> Result<NewtonResult<T>, NewtonError>
where
    T: Real,
    F: DifferentiableVectorFunction<T>,
{
    newton_line_search(function, x, f, dx, settings, &mut NoLineSearch {})
}

/// Same as `newton`, but allows specifying a line search.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn newton_line_search<'a, T, F>(
    mut function: F,
    x: impl Into<DVectorViewMut<'a, T>>,
    f: impl Into<DVectorViewMut<'a, T>>,
    dx: impl Into<DVectorViewMut<'a, T>>,
    settings: NewtonSettings<T>,
    line_search: &mut impl LineSearch<T, F>,
) -> Result<NewtonResult<T>, NewtonError>
where
    T: Real,
    F: DifferentiableVectorFunction<T>,
{
    let mut x = x.into();
    let mut f = f.into();
    let mut minus_dx = dx.into();

    assert_eq!(x.nrows(), f.nrows());
    assert_eq!(minus_dx.nrows(), f.nrows());

    function.eval_into(&mut f, &DVectorView::from(&x));

    let initial_norm = f.norm();
    let tolerance = match settings.relative_tolerance {
        Some(rtol) => settings.tolerance.max(rtol * initial_norm),
        None => settings.tolerance,
    };

    let mut iter = 0;
    let mut residual_norm = initial_norm;
    debug!("Newton initial residual norm: {}", residual_norm);

    loop {
        // A NaN norm compares false against any tolerance, so check it before convergence
        if !residual_norm.is_finite() {
            return Err(NewtonError::NonFiniteResidual { iteration: iter });
        }
        if residual_norm <= tolerance {
            break;
        }
        if settings
            .max_iterations
            .map(|max_iter| iter == max_iter)
            .unwrap_or(false)
        {
            return Err(NewtonError::MaximumIterationsReached(iter));
        }

        // Solve the system J dx = -f   <=>   J (-dx) = f
        function
            .solve_jacobian_system(&mut minus_dx, &DVectorView::from(&x), &DVectorView::from(&f))
            .map_err(NewtonError::JacobianError)?;

        // Flip sign to make it consistent with line search
        minus_dx *= -1.0;
        let dx = &minus_dx;

        let step_length = line_search
            .step(
                &mut function,
                DVectorViewMut::from(&mut f),
                DVectorViewMut::from(&mut x),
                DVectorView::from(dx),
            )
            .map_err(NewtonError::LineSearchError)?;
        iter += 1;
        residual_norm = f.norm();
        debug!(
            "Newton iter {}: step length {}, residual norm {}",
            iter, step_length, residual_norm
        );
    }

    Ok(NewtonResult {
        iterations: iter,
        residual_norm,
    })
}

pub trait LineSearch<T: Scalar, F: VectorFunction<T>> {
    fn step(
        &mut self,
        function: &mut F,
        f: DVectorViewMut<T>,
        x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error + Send + Sync>>;
}

/// Trivial implementation of line search. Equivalent to a single, full Newton step.
#[derive(Clone, Debug)]
pub struct NoLineSearch;

impl<T, F> LineSearch<T, F> for NoLineSearch
where
    T: Real,
    F: VectorFunction<T>,
{
    fn step(
        &mut self,
        function: &mut F,
        mut f: DVectorViewMut<T>,
        mut x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error + Send + Sync>> {
        let p = direction;
        x.axpy(T::one(), &p, T::one());
        function.eval_into(&mut f, &DVectorView::from(&x));
        Ok(T::one())
    }
}

/// Standard backtracking line search using the Armijo condition.
///
/// See Jorge & Nocedal (2006), Numerical Optimization, Chapter 3.1.
#[derive(Clone, Debug)]
pub struct BacktrackingLineSearch;

impl<T, F> LineSearch<T, F> for BacktrackingLineSearch
where
    T: Real,
    F: VectorFunction<T>,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn step(
        &mut self,
        function: &mut F,
        mut f: DVectorViewMut<T>,
        mut x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error + Send + Sync>> {
        // We seek to solve F(x) = 0 by minimizing g(x) = (1/2) || F(x) ||^2.
        // Assuming that p_k solves the Newton step equation, we have grad F^T p_k ~= - F(x_k),
        // and the sufficient decrease condition becomes
        //  g(x_k + alpha * p_k) <= (1 - c * alpha) * g(x_k)
        let c = 1e-4;
        let alpha_min = 1e-6;

        let p = direction;
        let g_initial = 0.5 * f.magnitude_squared();

        // Start out with some alphas that don't decrease too quickly, then
        // decrease them much faster if the first few attempts fail.
        let initial_alphas = [0.0, 1.0, 0.75, 0.5];
        let mut alpha_iter = initial_alphas
            .into_iter()
            .chain(iterate(0.25, |alpha_i| 0.25 * *alpha_i));

        let mut alpha_prev = alpha_iter.next().unwrap_or(0.0);
        let mut alpha = alpha_iter.next().unwrap_or(1.0);

        loop {
            // x^{k + 1} = x^k + (alpha^k - alpha^{k - 1}) * p
            let delta_alpha = alpha - alpha_prev;
            x.axpy(delta_alpha, &p, T::one());
            function.eval_into(&mut f, &DVectorView::from(&x));

            let g = 0.5 * f.magnitude_squared();
            if g <= (1.0 - c * alpha) * g_initial {
                break;
            } else if alpha < alpha_min {
                return Err(Box::from(format!(
                    "Failed to produce valid step direction. \
                    Alpha {} is smaller than minimum allowed alpha {}.",
                    alpha, alpha_min
                )));
            } else {
                alpha_prev = alpha;
                alpha = alpha_iter.next().unwrap_or(alpha * 0.25);
            }
        }

        Ok(alpha)
    }
}
