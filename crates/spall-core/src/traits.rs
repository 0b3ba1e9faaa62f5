//! Traits for the external collaborators the core talks to.
//!
//! The core never owns a matrix or a communicator. Jacobian entries are
//! streamed into a [`JacobianSink`], and global aggregates are summed
//! through a [`Reduction`].

use crate::error::ReductionError;

/// One Jacobian contribution: `∂rate(row_point, row) / ∂c(col_point, col)`.
///
/// Points are global grid indices; `col_point` may be a ghost point one
/// step outside the owned range, so it is signed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JacobianEntry {
    /// Grid point of the row.
    pub row_point: isize,
    /// Slot of the row within its point.
    pub row: usize,
    /// Grid point of the column.
    pub col_point: isize,
    /// Slot of the column within its point.
    pub col: usize,
    /// Partial derivative value, added to any existing entry.
    pub value: f64,
}

/// Receiver for streamed Jacobian contributions.
///
/// Implementations add `value` into their matrix; repeated `(row, col)`
/// pairs accumulate.
pub trait JacobianSink {
    /// Accept one contribution.
    fn add(&mut self, entry: JacobianEntry);
}

impl JacobianSink for Vec<JacobianEntry> {
    fn add(&mut self, entry: JacobianEntry) {
        self.push(entry);
    }
}

/// Collective sum across every process owning part of the grid.
///
/// Called once per evaluation before any grid-point loop that consumes
/// the result. Implementations that wrap a message-passing layer return
/// [`ReductionError::Failed`] on transport failure.
pub trait Reduction {
    /// Sum `local` over all participating processes.
    fn all_reduce_sum(&self, local: f64) -> Result<f64, ReductionError>;
}

/// Single-process reduction: the global sum is the local value.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalReduction;

impl Reduction for LocalReduction {
    fn all_reduce_sum(&self, local: f64) -> Result<f64, ReductionError> {
        if local.is_finite() {
            Ok(local)
        } else {
            Err(ReductionError::NonFinite { value: local })
        }
    }
}
