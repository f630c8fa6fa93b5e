//! Structured mesh generation.
use crate::mesh::{HexMesh, MeshError};
use crate::nalgebra::{Point3, Vector3};
use crate::Real;
use itertools::iproduct;

/// Generates an axis-aligned box `[min, max]` subdivided into `cells[0] x cells[1] x cells[2]`
/// equally sized hexahedra.
///
/// Vertex `(i, j, k)` of the lattice has global index `i + (nx + 1) (j + (ny + 1) k)`.
pub fn create_box_hex_mesh<T: Real>(
    min: Point3<T>,
    max: Point3<T>,
    cells: [usize; 3],
) -> Result<HexMesh<T>, MeshError> {
    if cells.iter().any(|&n| n == 0) {
        return Err(MeshError::InvalidResolution(cells));
    }
    let extents = max - min;
    if extents.iter().any(|&e| !(e > T::zero())) {
        return Err(MeshError::InvalidExtent);
    }

    let [nx, ny, nz] = cells;
    let to_t = |n: usize| T::from_usize(n).expect("Cell count must fit in T");
    let h = Vector3::new(extents.x / to_t(nx), extents.y / to_t(ny), extents.z / to_t(nz));

    let vertices = iproduct!(0..=nz, 0..=ny, 0..=nx)
        .map(|(k, j, i)| min + h.component_mul(&Vector3::new(to_t(i), to_t(j), to_t(k))))
        .collect();

    let idx = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);
    let connectivity = iproduct!(0..nz, 0..ny, 0..nx)
        .map(|(k, j, i)| {
            [
                idx(i, j, k),
                idx(i + 1, j, k),
                idx(i + 1, j + 1, k),
                idx(i, j + 1, k),
                idx(i, j, k + 1),
                idx(i + 1, j, k + 1),
                idx(i + 1, j + 1, k + 1),
                idx(i, j + 1, k + 1),
            ]
        })
        .collect();

    Ok(HexMesh::from_vertices_and_connectivity(vertices, connectivity))
}
