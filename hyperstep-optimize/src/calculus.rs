//! Residual-type functions $\vec F: \mathbb{R}^n \to \mathbb{R}^n$ and finite differences.
use crate::Real;
use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut, Scalar};
use numeric_literals::replace_float_literals;
use std::error::Error;

/// Error reported when the linear system with the Jacobian cannot be solved.
pub type JacobianSolveError = Box<dyn Error + Send + Sync>;

/// A square system of equations $\vec F(\vec x)$ with $n$ unknowns and $n$ equations.
pub trait VectorFunction<T>
where
    T: Scalar,
{
    /// The number of unknowns $n$.
    fn dimension(&self) -> usize;

    /// Writes $\vec F(\vec x)$ into `f`, which has length [`dimension`](Self::dimension).
    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>);
}

impl<T, X> VectorFunction<T> for &mut X
where
    T: Scalar,
    X: VectorFunction<T>,
{
    fn dimension(&self) -> usize {
        X::dimension(self)
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>) {
        X::eval_into(self, f, x)
    }
}

/// A system that can solve linear systems with its own Jacobian $\vec J = \partial \vec F / \partial \vec x$.
///
/// Newton's method only needs solutions of $\vec J(\vec x) \, \vec y = \vec b$, so the matrix itself
/// stays with the implementor, which is free to pick its storage format and linear solver.
pub trait DifferentiableVectorFunction<T>: VectorFunction<T>
where
    T: Scalar,
{
    /// Solves $\vec J(\vec x) \, \vec y = \vec b$ for `sol` $= \vec y$ with `rhs` $= \vec b$.
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), JacobianSolveError>;
}

impl<T, X> DifferentiableVectorFunction<T> for &mut X
where
    T: Scalar,
    X: DifferentiableVectorFunction<T>,
{
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), JacobianSolveError> {
        X::solve_jacobian_system(self, sol, x, rhs)
    }
}

/// Assembles a [`ClosureVectorFunction`] from a residual closure and, optionally, a Jacobian
/// solve closure.
///
/// ```
/// # use hyperstep_optimize::calculus::{VectorFunction, VectorFunctionBuilder};
/// # use nalgebra::{DVector, DVectorView, DVectorViewMut};
/// let mut square = VectorFunctionBuilder::with_dimension(1)
///     .with_function(|f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>| f[0] = x[0] * x[0] - 2.0);
/// let mut f = DVector::zeros(1);
/// square.eval_into(&mut DVectorViewMut::from(&mut f), &DVectorView::from(&DVector::repeat(1, 3.0)));
/// assert_eq!(f[0], 7.0);
/// ```
#[derive(Debug, Clone)]
pub struct VectorFunctionBuilder {
    dimension: usize,
}

/// A [`VectorFunction`] backed by closures. It is differentiable once a Jacobian solver is attached.
#[derive(Debug, Clone)]
pub struct ClosureVectorFunction<F, J> {
    dimension: usize,
    residual: F,
    jacobian_solve: J,
}

impl VectorFunctionBuilder {
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn with_function<F, T>(self, residual: F) -> ClosureVectorFunction<F, ()>
    where
        T: Scalar,
        F: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>),
    {
        ClosureVectorFunction {
            dimension: self.dimension,
            residual,
            jacobian_solve: (),
        }
    }
}

impl<F> ClosureVectorFunction<F, ()> {
    /// Attaches a closure `(sol, x, rhs)` solving the Jacobian system at `x`.
    pub fn with_jacobian_solver<J, T>(self, jacobian_solve: J) -> ClosureVectorFunction<F, J>
    where
        T: Scalar,
        J: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>, &DVectorView<T>) -> Result<(), JacobianSolveError>,
    {
        let Self { dimension, residual, .. } = self;
        ClosureVectorFunction {
            dimension,
            residual,
            jacobian_solve,
        }
    }
}

impl<F, J, T> VectorFunction<T> for ClosureVectorFunction<F, J>
where
    T: Scalar,
    F: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>),
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>) {
        (self.residual)(f, x)
    }
}

impl<F, J, T> DifferentiableVectorFunction<T> for ClosureVectorFunction<F, J>
where
    T: Scalar,
    F: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>),
    J: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>, &DVectorView<T>) -> Result<(), JacobianSolveError>,
{
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), JacobianSolveError> {
        (self.jacobian_solve)(sol, x, rhs)
    }
}

/// Approximates the derivative of the function `f: R^n -> R` with finite differences.
///
/// The parameter `h` determines the step size of the central difference approximation.
///
/// The vector `x` is mutable in order to contain intermediate computations, but upon returning,
/// its content remains unchanged.
pub fn approximate_gradient_fd<'a, T>(
    f: impl FnMut(DVectorView<T>) -> T,
    x: impl Into<DVectorViewMut<'a, T>>,
    h: T,
) -> DVector<T>
where
    T: Real,
{
    let mut x = x.into();
    let mut f = f;
    let n = x.len();
    let mut df = DVector::zeros(n);
    let two_h = h + h;
    for i in 0..n {
        let x_i = x[i];
        x[i] = x_i + h;
        let f_plus = f(DVectorView::from(&x));
        x[i] = x_i - h;
        let f_minus = f(DVectorView::from(&x));
        x[i] = x_i;
        df[i] = (f_plus - f_minus) / two_h;
    }
    df
}

/// Approximates the Jacobian of the function $f: \mathbb{R}^n \rightarrow \mathbb{R}^m$
/// with finite differences.
///
/// The Jacobian matrix is the $m \times n$ matrix whose entries are given by
/// $$ J_{ij} := \frac{\partial f_i}{\partial x_j}.$$
///
/// The parameter `h` determines the step size of the finite difference approximation.
pub fn approximate_jacobian_fd<'a, T>(
    m: usize,
    f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    x: impl Into<DVectorViewMut<'a, T>>,
    h: T,
) -> DMatrix<T>
where
    T: Real,
{
    let x = x.into();
    let n = x.len();
    let mut jacobian = DMatrix::zeros(m, n);
    approximate_jacobian_fd_into(&mut jacobian, f, x, h);
    jacobian
}

/// Same as [`approximate_jacobian_fd`], but stores the result in the provided output matrix.
///
/// Panics if the number of columns in the output does not match the length of `x`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn approximate_jacobian_fd_into<'a, 'b, T>(
    jacobian: impl Into<DMatrixViewMut<'b, T>>,
    mut f: impl FnMut(DVectorView<T>, DVectorViewMut<T>),
    x: impl Into<DVectorViewMut<'a, T>>,
    h: T,
) where
    T: Real,
{
    let mut j = jacobian.into();
    let mut x = x.into();
    let m = j.nrows();
    let n = x.len();
    assert_eq!(n, j.ncols(), "Jacobian must have one column per input variable");

    // Buffers to hold f(x + e_i h) and f(x - e_i h)
    let mut f_plus = DVector::zeros(m);
    let mut f_minus = DVector::zeros(m);

    for i in 0..n {
        // df_dxi ~ (f(x + h e_i) - f(x - h e_i)) / (2 h)
        let xi = x[i];
        x[i] = xi + h;
        f(DVectorView::from(&x), DVectorViewMut::from(&mut f_plus));
        x[i] = xi - h;
        f(DVectorView::from(&x), DVectorViewMut::from(&mut f_minus));
        x[i] = xi;

        let mut df_dxi = j.column_mut(i);
        df_dxi.copy_from(&f_plus);
        df_dxi -= &f_minus;
        df_dxi /= 2.0 * h;
    }
}
