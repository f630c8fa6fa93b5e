use crate::nalgebra::{DVectorViewMut, SMatrix, SVector};
use crate::Real;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Adds the element vector of the given nodes to the global vector.
///
/// Entry `3 a + i` of the element vector is added to entry `3 nodes[a] + i` of the global vector.
pub fn scatter_add_element_vector<T: Real, const N: usize>(
    global: &mut DVectorViewMut<T>,
    nodes: &[usize],
    element_vector: &SVector<T, N>,
) {
    assert_eq!(3 * nodes.len(), N, "Element vector must have three entries per node");
    for (a, &node) in nodes.iter().enumerate() {
        for i in 0..3 {
            global[3 * node + i] += element_vector[3 * a + i];
        }
    }
}

/// Collects element matrices in coordinate format and sums them into a CSR matrix.
#[derive(Debug, Clone)]
pub struct CsrAssembler<T: Real> {
    coo: CooMatrix<T>,
}

impl<T: Real> CsrAssembler<T> {
    pub fn with_num_dofs(num_dofs: usize) -> Self {
        Self {
            coo: CooMatrix::new(num_dofs, num_dofs),
        }
    }

    pub fn add_element_matrix<const N: usize>(&mut self, nodes: &[usize], element_matrix: &SMatrix<T, N, N>) {
        assert_eq!(3 * nodes.len(), N, "Element matrix must have three rows per node");
        for (a, &node_a) in nodes.iter().enumerate() {
            for (b, &node_b) in nodes.iter().enumerate() {
                for i in 0..3 {
                    for k in 0..3 {
                        self.coo
                            .push(3 * node_a + i, 3 * node_b + k, element_matrix[(3 * a + i, 3 * b + k)]);
                    }
                }
            }
        }
    }

    /// Converts the collected entries to CSR format. Duplicate entries are summed.
    pub fn finish(self) -> CsrMatrix<T> {
        CsrMatrix::from(&self.coo)
    }
}

/// Replaces the rows of the given degrees of freedom by rows of the identity matrix.
///
/// Combined with a residual $u_i - g_i$ on the same rows, a Newton step then sets the
/// constrained degree of freedom to its prescribed value $g_i$.
///
/// Every constrained row must have a stored diagonal entry.
pub fn apply_dirichlet_rows_csr<T: Real>(matrix: &mut CsrMatrix<T>, dofs: impl IntoIterator<Item = usize>) {
    for dof in dofs {
        let mut row = matrix.row_mut(dof);
        let (cols, values) = row.cols_and_values_mut();
        for (&col, value) in cols.iter().zip(values) {
            *value = if col == dof { T::one() } else { T::zero() };
        }
    }
}
