//! Cluster reaction network for the spall workspace.
//!
//! Built once from a [`ClusterCatalog`], a [`ReactionNetwork`] knows
//! every production and dissociation between its clusters, optionally
//! coarse-grains large same-species clusters into [`SuperCluster`]
//! groups, and evaluates reaction fluxes and their exact partial
//! derivatives at one grid point at a time through [`BoundNetwork`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod cluster;
pub mod grouping;
pub mod layout;
pub mod network;
pub mod reaction;
pub mod reaction_index;
pub mod super_cluster;

pub use catalog::ClusterCatalog;
pub use cluster::{default_reaction_radius, Cluster, ClusterSpec, Kinetics};
pub use grouping::{GroupingConfig, Placement};
pub use layout::PartialsLayout;
pub use network::{BoundNetwork, DislocationSink, NetworkConfig, ReactionNetwork};
pub use reaction::{DissociationReaction, ProductionReaction, Reactant};
pub use reaction_index::{combine, Combination, ReactionIndex};
pub use super_cluster::{Member, SuperCluster};
