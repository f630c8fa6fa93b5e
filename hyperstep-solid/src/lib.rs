//! Hyperelastic material models for `hyperstep`.
//!
//! Materials are described by a strain energy density $\psi(\vec F)$ and its first derivative,
//! the first Piola-Kirchhoff stress $\vec P = \pd{\psi}{\vec F}$. The second derivative needed by
//! Newton's method is obtained numerically unless a material chooses to provide it.
use hyperstep_optimize::calculus::approximate_jacobian_fd;
use hyperstep_optimize::nalgebra::{DVector, Matrix3, SMatrix};
use hyperstep_optimize::Real;
use std::fmt::Debug;

pub use hyperstep_optimize::nalgebra;

pub mod kinematics;
pub mod materials;

/// Step size used for the finite difference approximation of $\pd{\vec P}{\vec F}$.
pub const STRESS_DERIVATIVE_STEP: f64 = 1e-6;

/// The derivative $\pd{\vec P}{\vec F}$ of the stress tensor with respect to the deformation
/// gradient, acting on column-major vectorizations.
///
/// Entry `(i + 3 J, k + 3 L)` holds $\pd{P_{iJ}}{F_{kL}}$.
pub type StressDerivative<T> = SMatrix<T, 9, 9>;

pub trait HyperelasticMaterial<T>
where
    T: Real,
{
    type Parameters: Clone + Debug + 'static;

    /// Compute the energy density $\psi = \psi(\vec F)$ associated with the material.
    fn compute_energy_density(&self, deformation_gradient: &Matrix3<T>, parameters: &Self::Parameters) -> T;

    /// Compute the First Piola-Kirchhoff stress tensor $\vec P = \vec P(\vec F)$.
    fn compute_stress_tensor(&self, deformation_gradient: &Matrix3<T>, parameters: &Self::Parameters) -> Matrix3<T>;

    /// Compute the stress derivative $\pd{\vec P}{\vec F}$.
    ///
    /// The default implementation differentiates [`compute_stress_tensor`](Self::compute_stress_tensor)
    /// with central finite differences.
    fn compute_stress_derivative(
        &self,
        deformation_gradient: &Matrix3<T>,
        parameters: &Self::Parameters,
    ) -> StressDerivative<T> {
        let h = T::from_f64(STRESS_DERIVATIVE_STEP).expect("Literal must fit in T");
        let mut f_vec = DVector::from_iterator(9, deformation_gradient.iter().copied());
        let jacobian = approximate_jacobian_fd(
            9,
            |f_vec, mut p_vec| {
                let f = Matrix3::from_fn(|i, j| f_vec[i + 3 * j]);
                let p = self.compute_stress_tensor(&f, parameters);
                for (k, p_k) in p.iter().enumerate() {
                    p_vec[k] = *p_k;
                }
            },
            &mut f_vec,
            h,
        );
        StressDerivative::from_fn(|i, j| jacobian[(i, j)])
    }
}
