//! Ghost-padded concentration buffers and point locations.

use spall_grid::{Grid1D, OwnedRange};
use spall_handler::Location;

/// Local state of one process: `(owned.len() + 2) × dof` values, ghost
/// points at both ends.
#[derive(Clone, Debug, PartialEq)]
pub struct PaddedState {
    dof: usize,
    owned: OwnedRange,
    data: Vec<f64>,
}

impl PaddedState {
    /// All-zero state.
    pub fn new(dof: usize, owned: OwnedRange) -> Self {
        Self {
            dof,
            owned,
            data: vec![0.0; (owned.len() + 2) * dof],
        }
    }

    /// Fill every value from `f(global_point, slot)`.
    ///
    /// Ghost points get signed indices `start − 1` and `end`; a left
    /// ghost of point 0 is passed as `-1`.
    pub fn fill(mut self, f: impl Fn(isize, usize) -> f64) -> Self {
        let start = self.owned.start() as isize;
        for (padded, chunk) in self.data.chunks_mut(self.dof).enumerate() {
            let point = start + padded as isize - 1;
            for (slot, v) in chunk.iter_mut().enumerate() {
                *v = f(point, slot);
            }
        }
        self
    }

    /// Set `slot` to `value` at every point, ghosts included.
    pub fn with_slot(mut self, slot: usize, value: f64) -> Self {
        for chunk in self.data.chunks_mut(self.dof) {
            chunk[slot] = value;
        }
        self
    }

    pub fn dof(&self) -> usize {
        self.dof
    }

    pub fn owned(&self) -> OwnedRange {
        self.owned
    }

    /// Values at global point `point` (ghosts included).
    ///
    /// # Panics
    ///
    /// Panics if `point` is outside the padded range.
    pub fn point(&self, point: usize) -> &[f64] {
        let p = self.owned.padded(point).expect("point in padded range");
        &self.data[p * self.dof..(p + 1) * self.dof]
    }

    /// Mutable values at global point `point`.
    pub fn point_mut(&mut self, point: usize) -> &mut [f64] {
        let p = self.owned.padded(point).expect("point in padded range");
        &mut self.data[p * self.dof..(p + 1) * self.dof]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }
}

/// Location of global point `point` for a surface at `surface`.
pub fn location(grid: &Grid1D, owned: OwnedRange, point: usize, surface: usize) -> Location {
    Location {
        point,
        local: owned.local(point).expect("owned point"),
        position: grid.position(point),
        depth: grid.depth(point, surface),
        surface,
        steps: grid.step_sizes(point),
    }
}
