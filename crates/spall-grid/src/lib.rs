//! Spatial backends for the spall workspace.
//!
//! The core simulates a 1D depth profile below a tracked free surface.
//! This crate provides:
//!
//! - [`Grid1D`]: node positions on a (possibly non-uniform) line, with
//!   left/right step sizes for finite-difference stencils
//! - [`OwnedRange`]: the contiguous slice of the grid one process owns
//! - [`SurfaceBand`]: a point window measured from the tracked surface,
//!   used to gate boundary-localized physics

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod band;
pub mod error;
pub mod grid;
pub mod owned;

pub use band::SurfaceBand;
pub use error::GridError;
pub use grid::{Grid1D, GridSpec, StepSizes};
pub use owned::OwnedRange;
