use crate::mesh::HexMesh;
use crate::nalgebra::{try_convert, DVector};
use crate::Real;
use std::convert::TryInto;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs::create_dir_all;
use std::path::Path;
use vtkio::model::{
    Attribute, Attributes, ByteOrder, CellType, Cells, DataSet, IOBuffer, UnstructuredGridPiece, Version,
    VertexNumbers, Vtk,
};

#[derive(Debug)]
pub enum VtkExportError {
    /// An index or count does not fit in the 32-bit integers of the legacy format.
    IndexOverflow(usize),
    /// A point attribute does not have three components per mesh vertex.
    AttributeLength {
        name: String,
        expected: usize,
        actual: usize,
    },
    /// A value could not be represented as `f64`.
    NonRepresentableValue,
    Io(std::io::Error),
    Write(String),
}

impl Display for VtkExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VtkExportError::IndexOverflow(idx) => write!(f, "Index {} does not fit in VTK index type.", idx),
            VtkExportError::AttributeLength { name, expected, actual } => write!(
                f,
                "Point attribute \"{}\" has length {}, expected {}.",
                name, actual, expected
            ),
            VtkExportError::NonRepresentableValue => write!(f, "Value cannot be represented as f64."),
            VtkExportError::Io(err) => write!(f, "I/O error during VTK export: {}", err),
            VtkExportError::Write(msg) => write!(f, "Failed to write VTK file: {}", msg),
        }
    }
}

impl Error for VtkExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            VtkExportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for VtkExportError {
    fn from(err: std::io::Error) -> Self {
        VtkExportError::Io(err)
    }
}

/// Builds a legacy VTK unstructured grid from a hexahedral mesh and nodal vector fields.
pub struct HexMeshDataSetBuilder<'a, T: Real> {
    mesh: &'a HexMesh<T>,
    point_vectors: Vec<(String, &'a DVector<T>)>,
    // Only used for exporting directly to file
    title: Option<String>,
}

impl<'a, T: Real> HexMeshDataSetBuilder<'a, T> {
    pub fn from_mesh(mesh: &'a HexMesh<T>) -> Self {
        Self {
            mesh,
            point_vectors: Vec::new(),
            title: None,
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }

    /// Attaches a nodal vector field stored with three consecutive entries per vertex,
    /// such as the displacement vector.
    pub fn with_point_vectors(mut self, name: impl Into<String>, values: &'a DVector<T>) -> Self {
        self.point_vectors.push((name.into(), values));
        self
    }

    pub fn try_build(&self) -> Result<DataSet, VtkExportError> {
        let points = to_f64_vec(self.mesh.vertices().iter().flat_map(|v| v.coords.iter()))?;

        // Vertices is laid out as follows: N, i_1, i_2, ... i_N,
        // so for hexahedra this becomes 8 followed by the eight vertex indices
        let mut vertices = Vec::with_capacity(9 * self.mesh.num_cells());
        for cell in self.mesh.connectivity() {
            vertices.push(8);
            for &idx in cell {
                vertices.push(idx.try_into().map_err(|_| VtkExportError::IndexOverflow(idx))?);
            }
        }
        let num_cells = self.mesh.num_cells();

        let expected_len = 3 * self.mesh.vertices().len();
        let point = self
            .point_vectors
            .iter()
            .map(|(name, values)| {
                if values.len() != expected_len {
                    return Err(VtkExportError::AttributeLength {
                        name: name.clone(),
                        expected: expected_len,
                        actual: values.len(),
                    });
                }
                Ok(Attribute::vectors(name).with_data(IOBuffer::F64(to_f64_vec(values.iter())?)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let piece = UnstructuredGridPiece {
            points: IOBuffer::F64(points),
            cells: Cells {
                cell_verts: VertexNumbers::Legacy {
                    num_cells: num_cells
                        .try_into()
                        .map_err(|_| VtkExportError::IndexOverflow(num_cells))?,
                    vertices,
                },
                types: vec![CellType::Hexahedron; num_cells],
            },
            data: Attributes {
                point,
                ..Default::default()
            },
        };

        Ok(DataSet::inline(piece))
    }

    /// Convenience function for directly exporting the dataset to an ASCII file.
    ///
    /// Missing parent directories are created.
    pub fn try_export(&self, filename: impl AsRef<Path>) -> Result<(), VtkExportError> {
        let filepath = filename.as_ref();
        let fallback_title = filepath
            .file_stem()
            .map(|os_str| os_str.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string());
        if let Some(dir) = filepath.parent() {
            create_dir_all(dir)?;
        }
        let dataset = self.try_build()?;
        Vtk {
            version: Version { major: 4, minor: 1 },
            // If we don't have a title then just make the filepath the title
            title: self.title.clone().unwrap_or(fallback_title),
            byte_order: ByteOrder::BigEndian,
            data: dataset,
            file_path: None,
        }
        .export_ascii(filepath)
        .map_err(|err| VtkExportError::Write(err.to_string()))
    }
}

fn to_f64_vec<'b, T: Real + 'b>(values: impl Iterator<Item = &'b T>) -> Result<Vec<f64>, VtkExportError> {
    values
        .map(|&x| try_convert(x).ok_or(VtkExportError::NonRepresentableValue))
        .collect()
}

/// File name of the output of the given load step, e.g. `step_007.vtk`.
pub fn step_file_name(step: usize) -> String {
    format!("step_{:03}.vtk", step)
}
