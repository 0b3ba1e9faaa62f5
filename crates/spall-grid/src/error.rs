//! Error types for grid construction and ownership queries.

use std::fmt;

/// Errors arising from grid construction or ownership queries.
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// Fewer than two points: no step size can be derived.
    TooFewPoints {
        /// Number of points requested.
        points: usize,
    },
    /// A spacing is zero, negative, or not finite.
    InvalidSpacing {
        /// Index of the offending spacing.
        index: usize,
        /// The rejected value.
        value: f64,
    },
    /// The tracked surface lies outside the grid.
    SurfaceOutOfRange {
        /// Requested surface index.
        surface: usize,
        /// Number of grid points.
        points: usize,
    },
    /// The owned range does not fit inside the grid.
    OwnershipOutOfRange {
        /// First owned point.
        start: usize,
        /// Number of owned points.
        len: usize,
        /// Number of grid points.
        points: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewPoints { points } => {
                write!(f, "grid needs at least 2 points, got {points}")
            }
            Self::InvalidSpacing { index, value } => {
                write!(f, "grid spacing {index} must be positive and finite, got {value}")
            }
            Self::SurfaceOutOfRange { surface, points } => {
                write!(f, "surface position {surface} outside grid of {points} points")
            }
            Self::OwnershipOutOfRange { start, len, points } => write!(
                f,
                "owned range [{start}, {}) outside grid of {points} points",
                start + len
            ),
        }
    }
}

impl std::error::Error for GridError {}
