//! Spall: spatially resolved cluster-dynamics kinetics.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! spall sub-crates. Most users only need `spall` as a single dependency.
//!
//! # Quick start
//!
//! ```rust
//! use spall::prelude::*;
//!
//! // Mobile He₁ and He₂ plus an immobile vacancy trap.
//! let catalog = ClusterCatalog::new(
//!     0.317,
//!     vec![
//!         ClusterSpec::new(Composition::pure(Species::He, 1), 6.15, 0.13, 2.95e10),
//!         ClusterSpec::new(Composition::pure(Species::He, 2), 11.44, 0.20, 3.24e10),
//!         ClusterSpec::new(Composition::pure(Species::V, 1), 3.6, f64::INFINITY, 0.0),
//!         ClusterSpec::new(
//!             Composition::pure(Species::He, 1).with(Species::V, 1),
//!             5.14,
//!             f64::INFINITY,
//!             0.0,
//!         ),
//!     ],
//! )
//! .unwrap();
//! let network = ReactionNetwork::build(&catalog, &NetworkConfig::default()).unwrap();
//!
//! let handlers: Vec<Handler> = vec![
//!     IncidentFluxHandler::builder()
//!         .amplitude(1.0e-3)
//!         .profile(DepthProfile::Polynomial { coefficients: vec![1.0], cutoff: 2.0 })
//!         .species(Species::He, 1.0)
//!         .build()
//!         .unwrap()
//!         .into(),
//!     DiffusionHandler::new().into(),
//! ];
//! let config = SolverConfig {
//!     grid: GridSpec::Uniform { points: 10, spacing: 0.5 },
//!     ..SolverConfig::default()
//! };
//! let mut solver = SolverHandler::new(config, network, handlers).unwrap();
//!
//! let mut state = vec![0.0; solver.state_len()];
//! solver.initialize_concentration(&mut state).unwrap();
//! let aggregates = solver.aggregates(&state, &LocalReduction).unwrap();
//! let mut rates = vec![0.0; solver.output_len()];
//! solver.compute_rhs(0.0, &state, aggregates, &mut rates).unwrap();
//!
//! let mut jacobian: Vec<JacobianEntry> = Vec::new();
//! solver
//!     .compute_diagonal_jacobian(0.0, &state, aggregates, &mut jacobian)
//!     .unwrap();
//! assert!(rates.iter().any(|&r| r > 0.0));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `spall-core` | Species, ids, fill maps, tables, errors, sink and reduction traits |
//! | [`grid`] | `spall-grid` | 1-D grid, step sizes, surface bands, owned ranges |
//! | [`network`] | `spall-network` | Cluster catalog, grouping, reaction network |
//! | [`handler`] | `spall-handler` | Physics-handler trait, contexts, pipeline validation |
//! | [`handlers`] | `spall-handlers` | The six physics handlers |
//! | [`solver`] | `spall-solver` | Grid-point orchestration, configuration, restarts |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`spall-core`).
///
/// Contains [`types::Species`] and [`types::Composition`], slot ids, the
/// [`types::FillMap`] sparsity pattern, and the [`types::JacobianSink`]
/// and [`types::Reduction`] seams.
pub use spall_core as types;

/// Spatial grid (`spall-grid`).
///
/// [`grid::Grid1D`] is built from a [`grid::GridSpec`] and answers depth
/// and step-size queries relative to the surface.
pub use spall_grid as grid;

/// Reaction network (`spall-network`).
///
/// Build a [`network::ReactionNetwork`] from a [`network::ClusterCatalog`],
/// optionally grouping large clusters into super-clusters.
pub use spall_network as network;

/// Physics-handler interface (`spall-handler`).
///
/// The [`handler::PhysicsHandler`] trait is the extension point for new
/// physics.
pub use spall_handler as handler;

/// Physics handler implementations (`spall-handlers`).
///
/// Incident flux, diffusion, advection, trap mutation, re-solution and
/// desorption, dispatched through [`handlers::Handler`].
pub use spall_handlers as handlers;

/// Orchestration (`spall-solver`).
///
/// [`solver::SolverHandler`] is what an external time integrator drives.
pub use spall_solver as solver;

/// Common imports for typical spall usage.
///
/// ```rust
/// use spall::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use spall_core::{
        Composition, JacobianEntry, JacobianSink, LinearTable, LocalReduction, Reduction,
        Species,
    };

    // Errors
    pub use spall_core::{HandlerError, NetworkError, ReductionError};

    // Grid
    pub use spall_grid::{GridSpec, OwnedRange};

    // Network
    pub use spall_network::{
        ClusterCatalog, ClusterSpec, DislocationSink, GroupingConfig, NetworkConfig,
        ReactionNetwork,
    };

    // Handlers
    pub use spall_handler::{Aggregates, PhysicsHandler};
    pub use spall_handlers::{
        AdvectionHandler, DepthProfile, DesorptionHandler, DiffusionHandler, Handler,
        IncidentFluxHandler, ReSolutionHandler, SinkStrengthTable, TrapMutationHandler,
        TrapMutationTable,
    };

    // Solver
    pub use spall_solver::{
        Checkpoint, EvaluationMetrics, SolverConfig, SolverError, SolverHandler,
        TemperatureProfile,
    };
}
