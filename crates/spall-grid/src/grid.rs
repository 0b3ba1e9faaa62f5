//! Non-uniform 1D node grid.

use crate::error::GridError;

/// How to lay out grid nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum GridSpec {
    /// `points` nodes separated by a constant `spacing` (nm).
    Uniform {
        /// Number of nodes.
        points: usize,
        /// Distance between neighbouring nodes, in nm.
        spacing: f64,
    },
    /// Nodes separated by the given spacings; `spacings.len() + 1` nodes.
    Explicit {
        /// Distance between node `i` and node `i + 1`, in nm.
        spacings: Vec<f64>,
    },
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::Uniform {
            points: 20,
            spacing: 0.5,
        }
    }
}

/// Distances from a node to its left and right neighbours.
///
/// At the ends of the grid the missing side mirrors the present one, so
/// stencils always see two positive step sizes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepSizes {
    /// Distance to the left neighbour, in nm.
    pub left: f64,
    /// Distance to the right neighbour, in nm.
    pub right: f64,
}

impl StepSizes {
    /// Equal steps on both sides.
    pub fn uniform(h: f64) -> Self {
        Self { left: h, right: h }
    }

    /// Width of the control volume around the node.
    pub fn cell_width(&self) -> f64 {
        0.5 * (self.left + self.right)
    }
}

/// A one-dimensional grid of node positions, increasing with depth.
///
/// Node 0 sits at position `0.0`. The tracked free surface is one of the
/// nodes; depths are measured from it.
///
/// # Examples
///
/// ```
/// use spall_grid::Grid1D;
///
/// let grid = Grid1D::from_spacings(&[0.5, 0.5, 1.0]).unwrap();
/// assert_eq!(grid.len(), 4);
/// assert_eq!(grid.position(3), 2.0);
/// let steps = grid.step_sizes(2);
/// assert_eq!((steps.left, steps.right), (0.5, 1.0));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Grid1D {
    positions: Vec<f64>,
}

impl Grid1D {
    /// Build a grid from a [`GridSpec`].
    pub fn from_spec(spec: &GridSpec) -> Result<Self, GridError> {
        match spec {
            GridSpec::Uniform { points, spacing } => Self::uniform(*points, *spacing),
            GridSpec::Explicit { spacings } => Self::from_spacings(spacings),
        }
    }

    /// `points` nodes with constant `spacing`.
    pub fn uniform(points: usize, spacing: f64) -> Result<Self, GridError> {
        if points < 2 {
            return Err(GridError::TooFewPoints { points });
        }
        Self::from_spacings(&vec![spacing; points - 1])
    }

    /// Nodes separated by `spacings`; returns `spacings.len() + 1` nodes.
    pub fn from_spacings(spacings: &[f64]) -> Result<Self, GridError> {
        if spacings.is_empty() {
            return Err(GridError::TooFewPoints { points: 1 });
        }
        let mut positions = Vec::with_capacity(spacings.len() + 1);
        positions.push(0.0);
        let mut x = 0.0;
        for (index, &h) in spacings.iter().enumerate() {
            if !h.is_finite() || h <= 0.0 {
                return Err(GridError::InvalidSpacing { index, value: h });
            }
            x += h;
            positions.push(x);
        }
        Ok(Self { positions })
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always returns `false`: construction rejects grids under two nodes.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Position of node `i`, in nm from node 0.
    pub fn position(&self, i: usize) -> f64 {
        self.positions[i]
    }

    /// All node positions.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Left and right step sizes at node `i`.
    pub fn step_sizes(&self, i: usize) -> StepSizes {
        let last = self.positions.len() - 1;
        let left = (i > 0).then(|| self.positions[i] - self.positions[i - 1]);
        let right = (i < last).then(|| self.positions[i + 1] - self.positions[i]);
        match (left, right) {
            (Some(l), Some(r)) => StepSizes { left: l, right: r },
            (Some(h), None) | (None, Some(h)) => StepSizes::uniform(h),
            (None, None) => StepSizes::uniform(1.0),
        }
    }

    /// Depth of node `i` below the surface node, in nm. Negative in front
    /// of the surface.
    pub fn depth(&self, i: usize, surface: usize) -> f64 {
        self.positions[i] - self.positions[surface]
    }

    /// Fractional depth of node `i` between the surface (0) and the last
    /// node (1). Returns 0 when the surface is the last node.
    pub fn fraction(&self, i: usize, surface: usize) -> f64 {
        let span = self.positions[self.positions.len() - 1] - self.positions[surface];
        if span <= 0.0 {
            return 0.0;
        }
        self.depth(i, surface) / span
    }

    /// Check that `surface` is a valid node index.
    pub fn check_surface(&self, surface: usize) -> Result<(), GridError> {
        if surface < self.positions.len() {
            Ok(())
        } else {
            Err(GridError::SurfaceOutOfRange {
                surface,
                points: self.positions.len(),
            })
        }
    }
}
