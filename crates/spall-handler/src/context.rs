//! Contexts passed to handlers at setup and at every grid point.
//!
//! [`SetupContext`] is read once per subdomain when participant lists
//! are built. [`PointContext`] is rebuilt for every owned grid point of
//! every evaluation and borrows the solver's state without copying.

use spall_core::FillMap;
use spall_grid::{Grid1D, OwnedRange, StepSizes};
use spall_network::{BoundNetwork, ReactionNetwork};

/// Globally reduced scalars threaded into every evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aggregates {
    /// Near-surface trapped-defect concentration, summed over all
    /// processes.
    pub trapped_concentration: f64,
}

/// Fixed (cross-point) and variable (intra-point) sparsity patterns.
#[derive(Clone, Debug)]
pub struct FillMaps {
    /// Cross-grid-point entries contributed by transport.
    pub ofill: FillMap,
    /// Intra-point entries contributed by reactions and boundary physics.
    pub dfill: FillMap,
}

impl FillMaps {
    /// Empty patterns for `dof` slots.
    pub fn new(dof: usize) -> Self {
        Self {
            ofill: FillMap::new(dof),
            dfill: FillMap::new(dof),
        }
    }
}

/// What a handler sees while building its participant lists.
#[derive(Clone, Copy, Debug)]
pub struct SetupContext<'a> {
    network: &'a ReactionNetwork,
    grid: &'a Grid1D,
    owned: OwnedRange,
    surface: usize,
    temperature: f64,
}

impl<'a> SetupContext<'a> {
    /// Construct a setup context.
    ///
    /// `temperature` is the setup temperature, used by tables that are
    /// selected once rather than per point.
    pub fn new(
        network: &'a ReactionNetwork,
        grid: &'a Grid1D,
        owned: OwnedRange,
        surface: usize,
        temperature: f64,
    ) -> Self {
        Self {
            network,
            grid,
            owned,
            surface,
            temperature,
        }
    }

    /// The reaction network.
    pub fn network(&self) -> &'a ReactionNetwork {
        self.network
    }

    /// The full spatial grid.
    pub fn grid(&self) -> &'a Grid1D {
        self.grid
    }

    /// Grid points owned by this process.
    pub fn owned(&self) -> OwnedRange {
        self.owned
    }

    /// Index of the tracked surface node.
    pub fn surface(&self) -> usize {
        self.surface
    }

    /// Setup temperature (K).
    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

/// Concentration slices of a point and its two neighbours.
#[derive(Clone, Copy, Debug)]
pub struct Neighborhood<'a> {
    /// Left neighbour (one step toward the surface).
    pub left: &'a [f64],
    /// The evaluated point.
    pub mid: &'a [f64],
    /// Right neighbour (one step into the bulk).
    pub right: &'a [f64],
}

/// Where the evaluated point sits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    /// Global grid index.
    pub point: usize,
    /// Index within the owned range; keys per-point caches.
    pub local: usize,
    /// Position along the grid (nm).
    pub position: f64,
    /// Depth below the surface (nm).
    pub depth: f64,
    /// Index of the surface node.
    pub surface: usize,
    /// Step sizes around the point.
    pub steps: StepSizes,
}

/// Everything a handler reads while evaluating one grid point.
#[derive(Clone, Copy, Debug)]
pub struct PointContext<'a> {
    network: BoundNetwork<'a>,
    neighborhood: Neighborhood<'a>,
    location: Location,
    time: f64,
    aggregates: Aggregates,
}

impl<'a> PointContext<'a> {
    /// Construct a point context.
    ///
    /// Typically called by the solver. `network` must be bound to
    /// `neighborhood.mid` at `location.local`.
    pub fn new(
        network: BoundNetwork<'a>,
        neighborhood: Neighborhood<'a>,
        location: Location,
        time: f64,
        aggregates: Aggregates,
    ) -> Self {
        Self {
            network,
            neighborhood,
            location,
            time,
            aggregates,
        }
    }

    /// The network bound to this point.
    pub fn network(&self) -> &BoundNetwork<'a> {
        &self.network
    }

    /// Left neighbour concentrations.
    pub fn left(&self) -> &'a [f64] {
        self.neighborhood.left
    }

    /// Concentrations at the point.
    pub fn mid(&self) -> &'a [f64] {
        self.neighborhood.mid
    }

    /// Right neighbour concentrations.
    pub fn right(&self) -> &'a [f64] {
        self.neighborhood.right
    }

    /// Location of the point.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Global grid index.
    pub fn point(&self) -> usize {
        self.location.point
    }

    /// Local cache index.
    pub fn local(&self) -> usize {
        self.location.local
    }

    /// Step sizes around the point.
    pub fn steps(&self) -> StepSizes {
        self.location.steps
    }

    /// Temperature at the point (K).
    pub fn temperature(&self) -> f64 {
        self.network.temperature()
    }

    /// Simulation time (s).
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Reduced global scalars.
    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }
}
