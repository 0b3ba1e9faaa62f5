//! Grid-point orchestration for spall.
//!
//! [`SolverHandler`] is what an external time integrator talks to. Per
//! evaluation it needs the ghost-padded state, the globally reduced
//! [`Aggregates`](spall_handler::Aggregates) (see
//! [`SolverHandler::aggregates`]), and either an output buffer (residual)
//! or a [`JacobianSink`](spall_core::JacobianSink) (two Jacobian passes).
//!
//! Configuration lives in [`SolverConfig`]; failures are [`SolverError`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod metrics;
pub mod solver;
pub mod temperature;

pub use checkpoint::{Checkpoint, PointSnapshot};
pub use config::{ConfigError, SolverConfig};
pub use error::SolverError;
pub use metrics::EvaluationMetrics;
pub use solver::SolverHandler;
pub use temperature::TemperatureProfile;
