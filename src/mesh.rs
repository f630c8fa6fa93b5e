//! Hexahedral meshes, boundary extraction and point location.
use crate::element::{Hex8Element, HEX8_FACES};
use crate::nalgebra::Point3;
use crate::Real;
use numeric_literals::replace_float_literals;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

pub mod procedural;

/// Relative tolerance (in reference coordinates) used when deciding whether a point lies in
/// an element.
const POINT_LOCATION_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A structured mesh was requested with zero cells in some direction.
    InvalidResolution([usize; 3]),
    /// The box has non-positive extent in some direction.
    InvalidExtent,
    /// The mesh has no cells.
    Empty,
    /// A cell references a vertex that does not exist.
    InvalidVertexIndex { cell: usize, vertex: usize },
    /// A cell is inverted or degenerate.
    InvertedElement { cell: usize },
}

impl Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::InvalidResolution(cells) => {
                write!(f, "Invalid mesh resolution {:?}. All directions need at least one cell.", cells)
            }
            MeshError::InvalidExtent => write!(f, "Box must have positive extent in every direction."),
            MeshError::Empty => write!(f, "Mesh has no cells."),
            MeshError::InvalidVertexIndex { cell, vertex } => {
                write!(f, "Cell {} references non-existent vertex {}.", cell, vertex)
            }
            MeshError::InvertedElement { cell } => write!(f, "Cell {} is inverted or degenerate.", cell),
        }
    }
}

impl Error for MeshError {}

/// A region of space, used to select the vertices and boundary faces that a boundary condition
/// applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region<T> {
    /// Points whose coordinate along `axis` is within `tolerance` of `value`.
    Plane { axis: usize, value: T, tolerance: T },
    Everywhere,
}

impl<T: Real> Region<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn plane(axis: usize, value: T) -> Self {
        Region::Plane {
            axis,
            value,
            tolerance: 1e-10,
        }
    }

    pub fn contains(&self, x: &Point3<T>) -> bool {
        match self {
            Region::Plane { axis, value, tolerance } => x
                .coords
                .get(*axis)
                .map(|x_i| (*x_i - *value).abs() <= *tolerance)
                .unwrap_or(false),
            Region::Everywhere => true,
        }
    }
}

/// A mesh of trilinear hexahedra.
#[derive(Debug, Clone, PartialEq)]
pub struct HexMesh<T: Real> {
    vertices: Vec<Point3<T>>,
    cells: Vec<[usize; 8]>,
}

impl<T: Real> HexMesh<T> {
    pub fn from_vertices_and_connectivity(vertices: Vec<Point3<T>>, cells: Vec<[usize; 8]>) -> Self {
        Self { vertices, cells }
    }

    pub fn vertices(&self) -> &[Point3<T>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[[usize; 8]] {
        &self.cells
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Returns the element associated with the given cell, or `None` if the cell does not exist
    /// or references invalid vertices.
    pub fn element(&self, cell_index: usize) -> Option<Hex8Element<T>> {
        let cell = self.cells.get(cell_index)?;
        let mut vertices = [Point3::origin(); 8];
        for (v, &idx) in vertices.iter_mut().zip(cell) {
            *v = *self.vertices.get(idx)?;
        }
        Some(Hex8Element::from_vertices(vertices))
    }

    /// Checks that the mesh is non-empty, that every cell references existing vertices and that
    /// no cell is inverted or degenerate.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.cells.is_empty() {
            return Err(MeshError::Empty);
        }
        for (cell_index, cell) in self.cells.iter().enumerate() {
            if let Some(&vertex) = cell.iter().find(|&&v| v >= self.vertices.len()) {
                return Err(MeshError::InvalidVertexIndex { cell: cell_index, vertex });
            }
            let element = self
                .element(cell_index)
                .ok_or(MeshError::InvalidVertexIndex { cell: cell_index, vertex: cell[0] })?;
            if !element.is_positively_oriented() {
                return Err(MeshError::InvertedElement { cell: cell_index });
            }
        }
        Ok(())
    }

    /// Returns the boundary faces of the mesh, i.e. the element faces not shared by two cells.
    ///
    /// Faces are oriented with outward normals. The result is sorted by vertex indices, so it
    /// does not depend on hashing order.
    pub fn boundary_faces(&self) -> Vec<[usize; 4]> {
        let mut face_count: FxHashMap<[usize; 4], (usize, [usize; 4])> = FxHashMap::default();
        for cell in &self.cells {
            for local_face in &HEX8_FACES {
                let face = local_face.map(|local| cell[local]);
                let mut key = face;
                key.sort_unstable();
                face_count
                    .entry(key)
                    .and_modify(|(count, _)| *count += 1)
                    .or_insert((1, face));
            }
        }

        let mut faces: Vec<_> = face_count
            .into_iter()
            .filter(|(_, (count, _))| *count == 1)
            .map(|(key, (_, face))| (key, face))
            .collect();
        faces.sort_unstable();
        faces.into_iter().map(|(_, face)| face).collect()
    }

    /// Indices of the vertices satisfying the predicate, in increasing order.
    pub fn select_vertices(&self, predicate: impl Fn(&Point3<T>) -> bool) -> Vec<usize> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, x)| predicate(x))
            .map(|(i, _)| i)
            .collect()
    }

    /// Boundary faces whose vertices all satisfy the predicate.
    pub fn select_boundary_faces(&self, predicate: impl Fn(&Point3<T>) -> bool) -> Vec<[usize; 4]> {
        self.boundary_faces()
            .into_iter()
            .filter(|face| face.iter().all(|&v| predicate(&self.vertices[v])))
            .collect()
    }

    /// Finds a cell containing `x` together with the reference coordinates of `x` in that cell.
    ///
    /// Cells are searched in order, so points on shared faces are attributed to the cell with the
    /// lowest index.
    pub fn locate_point(&self, x: &Point3<T>) -> Option<(usize, Point3<T>)> {
        let tolerance = T::from_f64(POINT_LOCATION_TOLERANCE).expect("Literal must fit in T");
        (0..self.cells.len()).find_map(|cell_index| {
            let element = self.element(cell_index)?;
            if !bounding_box_contains(element.vertices(), x, tolerance * element.diameter()) {
                return None;
            }
            let xi = element.map_physical_coordinates(x).ok()?;
            Hex8Element::reference_contains(&xi, tolerance).then_some((cell_index, xi))
        })
    }
}

fn bounding_box_contains<T: Real>(vertices: &[Point3<T>; 8], x: &Point3<T>, tolerance: T) -> bool {
    (0..3).all(|i| {
        let first = vertices[0][i];
        let (min, max) = vertices
            .iter()
            .map(|v| v[i])
            .fold((first, first), |(min, max), v_i| (min.min(v_i), max.max(v_i)));
        x[i] >= min - tolerance && x[i] <= max + tolerance
    })
}
