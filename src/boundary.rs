//! Boundary conditions driven by named load parameters.
use crate::nalgebra::{try_convert, Vector3};
use crate::Real;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// The value of a load parameter: a scalar (pressure) or a vector (prescribed displacement).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Load<T: Real> {
    Scalar(T),
    Vector(Vector3<T>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadKind {
    Scalar,
    Vector,
}

impl Display for LoadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadKind::Scalar => write!(f, "scalar"),
            LoadKind::Vector => write!(f, "vector"),
        }
    }
}

impl<T: Real> Load<T> {
    pub fn kind(&self) -> LoadKind {
        match self {
            Load::Scalar(_) => LoadKind::Scalar,
            Load::Vector(_) => LoadKind::Vector,
        }
    }

    /// The load multiplied by `factor`.
    pub fn scaled(&self, factor: T) -> Self {
        match self {
            Load::Scalar(s) => Load::Scalar(*s * factor),
            Load::Vector(v) => Load::Vector(v * factor),
        }
    }

    /// Applies `f` to every component of the load.
    pub fn map(&self, f: impl Fn(T) -> T) -> Self {
        match self {
            Load::Scalar(s) => Load::Scalar(f(*s)),
            Load::Vector(v) => Load::Vector(v.map(f)),
        }
    }

    /// The zero load of the same kind.
    pub fn zero_like(&self) -> Self {
        match self {
            Load::Scalar(_) => Load::Scalar(T::zero()),
            Load::Vector(_) => Load::Vector(Vector3::zeros()),
        }
    }

    pub fn as_scalar(&self) -> Option<T> {
        match self {
            Load::Scalar(s) => Some(*s),
            Load::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<Vector3<T>> {
        match self {
            Load::Scalar(_) => None,
            Load::Vector(v) => Some(*v),
        }
    }
}

impl<T: Real> Display for Load<T> {
    /// Components are rounded to ten significant digits, so `0.0012000000000000001` prints as
    /// `0.0012`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Load::Scalar(s) => write_rounded(f, *s),
            Load::Vector(v) => {
                write!(f, "(")?;
                write_rounded(f, v.x)?;
                write!(f, ", ")?;
                write_rounded(f, v.y)?;
                write!(f, ", ")?;
                write_rounded(f, v.z)?;
                write!(f, ")")
            }
        }
    }
}

fn write_rounded<T: Real>(f: &mut fmt::Formatter<'_>, value: T) -> fmt::Result {
    match try_convert::<T, f64>(value) {
        Some(x) if x.is_finite() => {
            let rounded: f64 = format!("{:.9e}", x).parse().unwrap_or(x);
            write!(f, "{}", rounded)
        }
        _ => write!(f, "{}", value),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// No boundary condition is associated with the parameter name.
    Unknown(String),
    /// The load has the wrong kind for the boundary condition.
    KindMismatch {
        name: String,
        expected: LoadKind,
        found: LoadKind,
    },
}

impl Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::Unknown(name) => write!(f, "Unknown load parameter \"{}\".", name),
            ParameterError::KindMismatch { name, expected, found } => write!(
                f,
                "Load parameter \"{}\" expects a {} load, but a {} load was given.",
                name, expected, found
            ),
        }
    }
}

impl Error for ParameterError {}

/// Prescribes the displacement of a set of nodes.
///
/// Only the components enabled in `components` are constrained. The prescribed value is the
/// vector parameter `name`, so a clamp is a Dirichlet boundary whose value stays zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletBoundary<T: Real> {
    name: String,
    nodes: Vec<usize>,
    components: [bool; 3],
    value: Vector3<T>,
}

impl<T: Real> DirichletBoundary<T> {
    pub fn new(name: impl Into<String>, nodes: Vec<usize>, components: [bool; 3], value: Vector3<T>) -> Self {
        Self {
            name: name.into(),
            nodes,
            components,
            value,
        }
    }

    /// All components of the nodes fixed at zero displacement.
    pub fn clamped(name: impl Into<String>, nodes: Vec<usize>) -> Self {
        Self::new(name, nodes, [true; 3], Vector3::zeros())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn components(&self) -> [bool; 3] {
        self.components
    }

    pub fn value(&self) -> &Vector3<T> {
        &self.value
    }

    pub fn set_value(&mut self, value: Vector3<T>) {
        self.value = value;
    }

    /// Constrained degrees of freedom paired with their prescribed values.
    pub fn constrained_dofs(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.nodes.iter().flat_map(move |&node| {
            (0..3)
                .filter(move |&i| self.components[i])
                .map(move |i| (3 * node + i, self.value[i]))
        })
    }
}

/// A follower pressure acting on a set of boundary faces.
///
/// The traction is $-p \vec n$ on the deformed surface, where $\vec n$ is the outward normal
/// of the faces, so a positive pressure pushes against the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureBoundary<T: Real> {
    name: String,
    faces: Vec<[usize; 4]>,
    pressure: T,
}

impl<T: Real> PressureBoundary<T> {
    pub fn new(name: impl Into<String>, faces: Vec<[usize; 4]>, pressure: T) -> Self {
        Self {
            name: name.into(),
            faces,
            pressure,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn faces(&self) -> &[[usize; 4]] {
        &self.faces
    }

    pub fn pressure(&self) -> T {
        self.pressure
    }

    pub fn set_pressure(&mut self, pressure: T) {
        self.pressure = pressure;
    }
}
