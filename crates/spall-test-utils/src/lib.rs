//! Test fixtures and mock collaborators for spall development.
//!
//! Provides synthetic catalogs ([`catalogs`]), ghost-padded state
//! buffers ([`PaddedState`]), point-context helpers ([`location`]) and
//! mock implementations of the external collaborators
//! ([`OffsetReduction`], [`FailingReduction`], [`DenseJacobian`]).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod catalogs;
pub mod state;

pub use state::{location, PaddedState};

use spall_core::{JacobianEntry, JacobianSink, Reduction, ReductionError};
use spall_grid::Grid1D;
use std::collections::HashMap;

/// `points` nodes spaced `spacing` nm apart.
///
/// # Panics
///
/// Panics on fewer than two points or a non-positive spacing.
pub fn uniform_grid(points: usize, spacing: f64) -> Grid1D {
    Grid1D::uniform(points, spacing).expect("valid uniform grid")
}

/// Reduction that adds a fixed contribution from "other processes".
#[derive(Clone, Copy, Debug, Default)]
pub struct OffsetReduction {
    pub others: f64,
}

impl OffsetReduction {
    pub fn new(others: f64) -> Self {
        Self { others }
    }
}

impl Reduction for OffsetReduction {
    fn all_reduce_sum(&self, local: f64) -> Result<f64, ReductionError> {
        Ok(local + self.others)
    }
}

/// Reduction whose transport always fails.
#[derive(Clone, Debug)]
pub struct FailingReduction {
    pub reason: String,
}

impl FailingReduction {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Reduction for FailingReduction {
    fn all_reduce_sum(&self, _local: f64) -> Result<f64, ReductionError> {
        Err(ReductionError::Failed {
            reason: self.reason.clone(),
        })
    }
}

/// Jacobian sink accumulating entries by `(row_point, row, col_point, col)`.
///
/// Inspect with [`get`](DenseJacobian::get) after an assembly pass.
#[derive(Clone, Debug, Default)]
pub struct DenseJacobian {
    entries: HashMap<(isize, usize, isize, usize), f64>,
    added: usize,
}

impl DenseJacobian {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated value of one entry (0 if never added).
    pub fn get(&self, row_point: isize, row: usize, col_point: isize, col: usize) -> f64 {
        self.entries
            .get(&(row_point, row, col_point, col))
            .copied()
            .unwrap_or(0.0)
    }

    /// Number of distinct entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of `add` calls, duplicates included.
    pub fn added(&self) -> usize {
        self.added
    }

    /// Distinct row points touched.
    pub fn row_points(&self) -> Vec<isize> {
        let mut points: Vec<isize> = self.entries.keys().map(|k| k.0).collect();
        points.sort_unstable();
        points.dedup();
        points
    }
}

impl JacobianSink for DenseJacobian {
    fn add(&mut self, entry: JacobianEntry) {
        *self
            .entries
            .entry((entry.row_point, entry.row, entry.col_point, entry.col))
            .or_insert(0.0) += entry.value;
        self.added += 1;
    }
}
