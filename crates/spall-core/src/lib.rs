//! Core types and traits for the spall cluster-dynamics workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the workspace: species
//! and compositions, cluster identifiers, slot bitsets and fill maps,
//! physical constants, piecewise-linear tables, error types, and the
//! traits through which the core talks to its external collaborators
//! (collective reduction and Jacobian assembly).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod constants;
pub mod error;
pub mod fill;
pub mod id;
pub mod species;
pub mod table;
pub mod traits;

pub use error::{HandlerError, NetworkError, ReductionError};
pub use fill::{FillMap, SlotSet, SparseFill};
pub use id::{ClusterId, GroupId};
pub use species::{Composition, Species};
pub use table::LinearTable;
pub use traits::{JacobianEntry, JacobianSink, LocalReduction, Reduction};
