//! Physics handler trait and evaluation contexts for spall.
//!
//! A [`PhysicsHandler`] contributes flux and Jacobian terms for one
//! physical process at one grid point at a time. The solver walks the
//! handlers in [`Stage`] order, checked once at setup by
//! [`validate_pipeline`], and hands each one a [`PointContext`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod handler;
pub mod pipeline;
pub mod scratch;
pub mod stage;

pub use context::{Aggregates, FillMaps, Location, Neighborhood, PointContext, SetupContext};
pub use handler::{check_buffers, PartialsShape, PhysicsHandler};
pub use pipeline::{validate_pipeline, PipelineError, PipelinePlan};
pub use scratch::PartialsScratch;
pub use stage::{JacobianPass, Stage};
