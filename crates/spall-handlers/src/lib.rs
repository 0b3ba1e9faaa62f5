//! Transport and boundary physics handlers for spall.
//!
//! Each handler implements [`PhysicsHandler`](spall_handler::PhysicsHandler)
//! and is wrapped in the closed [`Handler`] enum the solver iterates.
//!
//! # Evaluation order (each point)
//!
//! 1. [`IncidentFluxHandler`]: implantation source, no partials
//! 2. [`DiffusionHandler`]: three-point stencil, off-diagonal pass
//! 3. [`AdvectionHandler`] (any number): drift toward a sink, off-diagonal pass
//! 4. [`TrapMutationHandler`]: near-surface He → HeV + I, diagonal pass
//! 5. [`ReSolutionHandler`]: gas knocked out of bubbles, diagonal pass
//! 6. [`DesorptionHandler`]: hydrogen recombination at the surface, diagonal pass

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod advection;
pub mod desorption;
pub mod diffusion;
pub mod handler;
pub mod incident_flux;
pub mod resolution;
pub mod sink_strength;
pub mod trap_mutation;

pub use advection::{AdvectionConfig, AdvectionHandler, SinkGeometry};
pub use desorption::{DesorptionConfig, DesorptionHandler};
pub use diffusion::DiffusionHandler;
pub use handler::Handler;
pub use incident_flux::{DepthProfile, IncidentFluxConfig, IncidentFluxHandler};
pub use resolution::{ReSolutionConfig, ReSolutionHandler};
pub use sink_strength::SinkStrengthTable;
pub use trap_mutation::{
    HeliumDesorption, TrapEntry, TrapMutationConfig, TrapMutationHandler, TrapMutationTable,
    W111_TRANSITION_TEMPERATURE,
};
