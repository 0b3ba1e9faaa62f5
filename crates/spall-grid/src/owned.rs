//! Contiguous ownership ranges.

use crate::error::GridError;
use std::ops::Range;

/// The contiguous range of grid points one process owns.
///
/// Supplied by the external domain-decomposition layer. Local storage
/// for an owned range has `len + 2` points: one read-only ghost on each
/// side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnedRange {
    start: usize,
    len: usize,
}

impl OwnedRange {
    /// Create a range owning `[start, start + len)` of a grid with
    /// `points` nodes.
    pub fn new(start: usize, len: usize, points: usize) -> Result<Self, GridError> {
        if len == 0 || start.checked_add(len).is_none_or(|end| end > points) {
            return Err(GridError::OwnershipOutOfRange { start, len, points });
        }
        Ok(Self { start, len })
    }

    /// A range owning every point of a `points`-node grid.
    pub fn whole(points: usize) -> Self {
        Self {
            start: 0,
            len: points,
        }
    }

    /// First owned global index.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of owned points.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always returns `false`: construction rejects empty ranges.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last owned global index.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Owned global indices, ascending.
    pub fn iter(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Whether global index `i` is owned.
    pub fn contains(&self, i: usize) -> bool {
        i >= self.start && i < self.end()
    }

    /// Local index (0-based within the owned range) of global index `i`.
    pub fn local(&self, i: usize) -> Option<usize> {
        self.contains(i).then(|| i - self.start)
    }

    /// Index of global point `i` in ghost-padded local storage, where
    /// storage position 0 is the left ghost.
    pub fn padded(&self, i: usize) -> Option<usize> {
        if i + 1 >= self.start && i <= self.end() {
            Some(i + 1 - self.start)
        } else {
            None
        }
    }
}
