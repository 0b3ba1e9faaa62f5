//! Size/offset table for network partial derivatives.

use indexmap::IndexMap;
use spall_core::FillMap;

/// Where each row's partial derivatives live in a flat values buffer.
///
/// Row `r` owns `vals[offsets[r]..offsets[r] + sizes[r]]`, and the
/// column of each value is the matching entry of `indices`. Columns are
/// ascending within a row, so a row splices directly into a caller's
/// compressed sparse row.
#[derive(Clone, Debug, Default)]
pub struct PartialsLayout {
    sizes: Vec<usize>,
    offsets: Vec<usize>,
    indices: Vec<usize>,
    positions: IndexMap<(usize, usize), usize>,
}

impl PartialsLayout {
    /// Lay out every marked entry of `fill`, row by row.
    pub fn from_fill(fill: &FillMap) -> Self {
        let dof = fill.dof();
        let mut layout = Self {
            sizes: Vec::with_capacity(dof),
            offsets: Vec::with_capacity(dof),
            indices: Vec::with_capacity(fill.nnz()),
            positions: IndexMap::with_capacity(fill.nnz()),
        };
        for row in 0..dof {
            layout.offsets.push(layout.indices.len());
            for col in fill.row(row).iter() {
                layout.positions.insert((row, col), layout.indices.len());
                layout.indices.push(col);
            }
            layout.sizes.push(layout.indices.len() - layout.offsets[row]);
        }
        layout
    }

    /// Number of partials per row.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Start of each row in the flat buffer.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Column of every flat position.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Columns of one row.
    pub fn row(&self, row: usize) -> &[usize] {
        let start = self.offsets[row];
        &self.indices[start..start + self.sizes[row]]
    }

    /// Flat position of `(row, col)`, if laid out.
    pub fn position(&self, row: usize, col: usize) -> Option<usize> {
        self.positions.get(&(row, col)).copied()
    }

    /// Total number of partials (required buffer length).
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if no partial is laid out.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
