use crate::kinematics::{green_strain, inverse_transpose, nan_matrix, right_cauchy_green, FiberFrame};
use crate::HyperelasticMaterial;
use hyperstep_optimize::nalgebra::{Matrix3, Vector3};
use hyperstep_optimize::Real;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LameParameters<T> {
    pub mu: T,
    pub lambda: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoungPoisson<T> {
    pub young: T,
    pub poisson: T,
}

impl<T> From<YoungPoisson<T>> for LameParameters<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn from(params: YoungPoisson<T>) -> Self {
        let YoungPoisson { young, poisson } = params;
        let mu = 0.5 * young / (1.0 + poisson);
        let lambda = 2.0 * mu * poisson / (1.0 - 2.0 * poisson);
        Self { mu, lambda }
    }
}

/// The volumetric penalty $U(J) = \kappa (J \log J - J + 1)$.
///
/// The penalty vanishes together with its derivative at $J = 1$ and is undefined (NaN)
/// for $J \leq 0$.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn volumetric_penalty_energy<T: Real>(j: T, kappa: T) -> T {
    kappa * (j * j.ln() - j + 1.0)
}

/// First Piola-Kirchhoff stress of the volumetric penalty, $\vec P = \kappa J \log J \, \vec F^{-T}$.
pub fn volumetric_penalty_stress<T: Real>(deformation_gradient: &Matrix3<T>, kappa: T) -> Matrix3<T> {
    let j = deformation_gradient.determinant();
    inverse_transpose(deformation_gradient) * (kappa * j * j.ln())
}

/// The compressible Neo-Hookean material model.
///
/// The strain energy density is given by
/// $$
/// \psi(\vec F) = \frac{\mu}{2}(I_C - 3) - \mu \log J + \frac{\lambda}{2}(\log J)^2,
/// $$
/// where $J = \det \vec F$ and $I_C = \tr{\vec C} = \tr{\vec F^T \vec F}$ is the first right Cauchy-Green invariant.
/// The associated stress tensor is
/// $$
/// \vec P(\vec F) = \mu (\vec F - \vec F^{-T}) + \lambda \log J \, \vec F^{-T}.
/// $$
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeoHookeanMaterial;

#[allow(non_snake_case)]
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
impl<T> HyperelasticMaterial<T> for NeoHookeanMaterial
where
    T: Real,
{
    type Parameters = LameParameters<T>;

    fn compute_energy_density(&self, deformation_gradient: &Matrix3<T>, parameters: &Self::Parameters) -> T {
        let &LameParameters { mu, lambda } = parameters;
        let F = deformation_gradient;
        let I_C = right_cauchy_green(F).trace();
        let log_J = F.determinant().ln();
        0.5 * mu * (I_C - 3.0) - mu * log_J + 0.5 * lambda * log_J * log_J
    }

    fn compute_stress_tensor(&self, deformation_gradient: &Matrix3<T>, parameters: &Self::Parameters) -> Matrix3<T> {
        let &LameParameters { mu, lambda } = parameters;
        let F = deformation_gradient;
        let F_inv_T = inverse_transpose(F);
        let log_J = F.determinant().ln();
        (F - &F_inv_T) * mu + F_inv_T * (lambda * log_J)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuccioneParameters<T: Real> {
    /// Overall stiffness $C$.
    pub c: T,
    /// Fiber stiffness $b_f$.
    pub b_f: T,
    /// Transverse stiffness $b_t$.
    pub b_t: T,
    /// Fiber-sheet shear stiffness $b_{fs}$.
    pub b_fs: T,
    /// Bulk modulus $\kappa$ of the volumetric penalty.
    pub kappa: T,
    pub fibers: FiberFrame<T>,
}

impl<T: Real> Default for GuccioneParameters<T> {
    /// Transversely isotropic parameters of the cardiac mechanics benchmark beam.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn default() -> Self {
        Self {
            c: 2.0,
            b_f: 8.0,
            b_t: 2.0,
            b_fs: 4.0,
            kappa: 100.0,
            fibers: FiberFrame::default(),
        }
    }
}

/// The transversely isotropic Guccione material model with a volumetric penalty.
///
/// The strain energy density is
/// $$
/// \psi(\vec F) = \frac{C}{2} \left( e^Q - 1 \right) + U(J),
/// $$
/// where, with the Green strain $\vec E$ expressed in the fiber frame $(\vec f, \vec s, \vec n)$,
/// $$
/// Q = b_f E_{ff}^2
///   + b_t \left( E_{ss}^2 + E_{nn}^2 + E_{sn}^2 + E_{ns}^2 \right)
///   + b_{fs} \left( E_{fs}^2 + E_{sf}^2 + E_{fn}^2 + E_{nf}^2 \right).
/// $$
/// Writing $Q = \sum_{ij} B_{ij} E_{ij}^2$, the second Piola-Kirchhoff stress in the fiber frame is
/// $S_{ij} = C e^Q B_{ij} E_{ij}$.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuccioneMaterial;

fn guccione_weights<T: Real>(parameters: &GuccioneParameters<T>) -> Matrix3<T> {
    let &GuccioneParameters { b_f, b_t, b_fs, .. } = parameters;
    Matrix3::new(b_f, b_fs, b_fs, b_fs, b_t, b_t, b_fs, b_t, b_t)
}

#[allow(non_snake_case)]
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
impl<T> HyperelasticMaterial<T> for GuccioneMaterial
where
    T: Real,
{
    type Parameters = GuccioneParameters<T>;

    fn compute_energy_density(&self, deformation_gradient: &Matrix3<T>, parameters: &Self::Parameters) -> T {
        let F = deformation_gradient;
        let R = parameters.fibers.rotation();
        let E_fiber = R.transpose() * green_strain(F) * R;
        let Q = guccione_weights(parameters).dot(&E_fiber.component_mul(&E_fiber));
        let J = F.determinant();
        0.5 * parameters.c * (Q.exp() - 1.0) + volumetric_penalty_energy(J, parameters.kappa)
    }

    fn compute_stress_tensor(&self, deformation_gradient: &Matrix3<T>, parameters: &Self::Parameters) -> Matrix3<T> {
        let F = deformation_gradient;
        let R = parameters.fibers.rotation();
        let E_fiber = R.transpose() * green_strain(F) * R;
        let B = guccione_weights(parameters);
        let Q = B.dot(&E_fiber.component_mul(&E_fiber));
        let S_fiber = B.component_mul(&E_fiber) * (parameters.c * Q.exp());
        let S = &R * S_fiber * R.transpose();
        F * S + volumetric_penalty_stress(F, parameters.kappa)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HolzapfelOgdenParameters<T: Real> {
    pub a: T,
    pub b: T,
    pub a_f: T,
    pub b_f: T,
    pub a_s: T,
    pub b_s: T,
    pub a_fs: T,
    pub b_fs: T,
    /// Bulk modulus $\kappa$ of the volumetric penalty.
    pub kappa: T,
    pub fibers: FiberFrame<T>,
}

impl<T: Real> Default for HolzapfelOgdenParameters<T> {
    /// Passive myocardium parameters fitted by Holzapfel and Ogden (2009).
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn default() -> Self {
        Self {
            a: 0.059,
            b: 8.023,
            a_f: 18.472,
            b_f: 16.026,
            a_s: 2.481,
            b_s: 11.120,
            a_fs: 0.216,
            b_fs: 11.436,
            kappa: 10.0,
            fibers: FiberFrame::default(),
        }
    }
}

/// The orthotropic Holzapfel-Ogden material model with a volumetric penalty.
///
/// The strain energy density is
/// $$
/// \psi(\vec F) = \frac{a}{2b} \left( e^{b (\bar I_1 - 3)} - 1 \right)
///   + \sum_{i = f, s} \frac{a_i}{2 b_i} \left( e^{b_i (I_{4i} - 1)_+^2} - 1 \right)
///   + \frac{a_{fs}}{2 b_{fs}} \left( e^{b_{fs} I_{8fs}^2} - 1 \right)
///   + U(J),
/// $$
/// where $\bar I_1 = J^{-2/3} \tr{\vec C}$, $I_{4f} = \vec f \cdot \vec C \vec f$,
/// $I_{4s} = \vec s \cdot \vec C \vec s$ and $I_{8fs} = \vec f \cdot \vec C \vec s$.
/// The fiber and sheet terms only contribute in tension, $(x)_+ = \max(x, 0)$.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolzapfelOgdenMaterial;

/// Exponential term $\frac{a}{2b}(e^{b x^2} - 1)$ for the anisotropic invariants.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn exponential_energy<T: Real>(a: T, b: T, x: T) -> T {
    a / (2.0 * b) * ((b * x * x).exp() - 1.0)
}

/// Derivative of [`exponential_energy`] with respect to `x`, divided by `x`.
fn exponential_energy_slope<T: Real>(a: T, b: T, x: T) -> T {
    a * (b * x * x).exp()
}

#[allow(non_snake_case)]
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
impl<T> HyperelasticMaterial<T> for HolzapfelOgdenMaterial
where
    T: Real,
{
    type Parameters = HolzapfelOgdenParameters<T>;

    fn compute_energy_density(&self, deformation_gradient: &Matrix3<T>, parameters: &Self::Parameters) -> T {
        let p = parameters;
        let F = deformation_gradient;
        let C = right_cauchy_green(F);
        let J = F.determinant();
        let I1_bar = J.powf(-2.0 / 3.0) * C.trace();
        let (f, s) = (&p.fibers.fiber, &p.fibers.sheet);
        let I4f = f.dot(&(&C * f));
        let I4s = s.dot(&(&C * s));
        let I8fs = f.dot(&(&C * s));

        p.a / (2.0 * p.b) * ((p.b * (I1_bar - 3.0)).exp() - 1.0)
            + exponential_energy(p.a_f, p.b_f, (I4f - 1.0).max(0.0))
            + exponential_energy(p.a_s, p.b_s, (I4s - 1.0).max(0.0))
            + exponential_energy(p.a_fs, p.b_fs, I8fs)
            + volumetric_penalty_energy(J, p.kappa)
    }

    fn compute_stress_tensor(&self, deformation_gradient: &Matrix3<T>, parameters: &Self::Parameters) -> Matrix3<T> {
        let p = parameters;
        let F = deformation_gradient;
        let C = right_cauchy_green(F);
        let C_inv = match C.try_inverse() {
            Some(C_inv) => C_inv,
            None => return nan_matrix(),
        };
        let J = F.determinant();
        let I1 = C.trace();
        let J_23 = J.powf(-2.0 / 3.0);
        let I1_bar = J_23 * I1;
        let (f, s) = (&p.fibers.fiber, &p.fibers.sheet);
        let I4f = f.dot(&(&C * f));
        let I4s = s.dot(&(&C * s));
        let I8fs = f.dot(&(&C * s));

        let I = Matrix3::identity();
        let S_iso = (I - &C_inv * (I1 / 3.0)) * (p.a * (p.b * (I1_bar - 3.0)).exp() * J_23);

        // S = 2 dpsi/dC, with dI4/dC = f (x) f and dI8/dC = sym(f (x) s)
        let fiber_term = |a: T, b: T, I4: T, d: &Vector3<T>| {
            let x = (I4 - 1.0).max(0.0);
            d * d.transpose() * (2.0 * x * exponential_energy_slope(a, b, x))
        };
        let S_f = fiber_term(p.a_f, p.b_f, I4f, f);
        let S_s = fiber_term(p.a_s, p.b_s, I4s, s);
        let S_fs = (f * s.transpose() + s * f.transpose()) * (I8fs * exponential_energy_slope(p.a_fs, p.b_fs, I8fs));
        let S_vol = C_inv * (p.kappa * J * J.ln());

        F * (S_iso + S_f + S_s + S_fs + S_vol)
    }
}
