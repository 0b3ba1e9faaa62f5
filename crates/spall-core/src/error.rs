//! Error types for the spall workspace.
//!
//! Organized by subsystem: network construction, handler evaluation,
//! and external collective reduction. None of these is recoverable
//! mid-evaluation; callers abort the whole residual or Jacobian pass.

use crate::species::{Composition, Species};
use std::error::Error;
use std::fmt;

/// Errors raised while parsing a catalog or building a reaction network.
///
/// All variants are configuration errors: they surface before the first
/// time step and are fatal.
#[derive(Clone, Debug, PartialEq)]
pub enum NetworkError {
    /// A composition label names a species that does not exist.
    UnknownSpecies {
        /// The unrecognised symbol.
        symbol: String,
    },
    /// A composition label could not be parsed.
    MalformedLabel {
        /// The offending label.
        label: String,
    },
    /// The catalog contains no clusters.
    EmptyCatalog,
    /// The lattice parameter is not a positive finite number.
    InvalidLatticeParameter {
        /// The rejected value.
        value: f64,
    },
    /// Two catalog entries share a composition.
    DuplicateComposition {
        /// The repeated composition.
        composition: Composition,
    },
    /// A catalog entry carries an invalid physical parameter.
    InvalidEntry {
        /// The entry's composition.
        composition: Composition,
        /// What is wrong with it.
        reason: String,
    },
    /// The grouping configuration itself is unusable.
    InvalidGrouping {
        /// What is wrong with it.
        reason: String,
    },
    /// A super-cluster bin contains no catalog member.
    EmptySuperCluster {
        /// The grouped species.
        species: Species,
        /// Smallest size of the bin (inclusive).
        low: u32,
        /// Largest size of the bin (inclusive).
        high: u32,
    },
    /// A reaction touches a `(row, col)` entry missing from the partials
    /// layout built from the network's own connectivity.
    LayoutMismatch {
        /// Row slot.
        row: usize,
        /// Column slot.
        col: usize,
    },
    /// A network-level option is out of range.
    InvalidOption {
        /// What is wrong.
        reason: String,
    },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSpecies { symbol } => write!(f, "unknown species '{symbol}'"),
            Self::MalformedLabel { label } => {
                write!(f, "malformed composition label '{label}'")
            }
            Self::EmptyCatalog => write!(f, "cluster catalog is empty"),
            Self::InvalidLatticeParameter { value } => {
                write!(f, "lattice parameter must be positive and finite, got {value}")
            }
            Self::DuplicateComposition { composition } => {
                write!(f, "duplicate catalog entry for {composition}")
            }
            Self::InvalidEntry {
                composition,
                reason,
            } => write!(f, "invalid catalog entry {composition}: {reason}"),
            Self::InvalidGrouping { reason } => write!(f, "invalid grouping: {reason}"),
            Self::EmptySuperCluster { species, low, high } => {
                write!(f, "super-cluster {species}[{low}..={high}] has no members")
            }
            Self::LayoutMismatch { row, col } => {
                write!(f, "partials layout has no entry for ({row}, {col})")
            }
            Self::InvalidOption { reason } => write!(f, "invalid network option: {reason}"),
        }
    }
}

impl Error for NetworkError {}

/// Errors from a physics handler during setup or evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerError {
    /// A caller-owned partials buffer is smaller than the participant
    /// count reported for this point requires. This is a programming
    /// defect in the caller, never a recoverable condition.
    BufferTooSmall {
        /// Name of the handler that detected the mismatch.
        handler: String,
        /// Slots required for the current participant count.
        required: usize,
        /// Slots actually provided.
        provided: usize,
    },
    /// The network lacks a cluster the handler cannot work without.
    MissingCluster {
        /// Name of the handler.
        handler: String,
        /// The composition that was looked up.
        composition: Composition,
    },
    /// The handler's configuration is inconsistent with the network or
    /// grid it is being initialized against.
    InvalidConfig {
        /// Name of the handler.
        handler: String,
        /// What is wrong.
        reason: String,
    },
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall {
                handler,
                required,
                provided,
            } => write!(
                f,
                "handler '{handler}': partials buffer too small ({provided} < {required})"
            ),
            Self::MissingCluster {
                handler,
                composition,
            } => write!(f, "handler '{handler}': network has no cluster {composition}"),
            Self::InvalidConfig { handler, reason } => {
                write!(f, "handler '{handler}': invalid configuration: {reason}")
            }
        }
    }
}

impl Error for HandlerError {}

/// Errors reported by the external collective-reduction layer.
#[derive(Clone, Debug, PartialEq)]
pub enum ReductionError {
    /// The communication layer failed.
    Failed {
        /// Description from the communication layer.
        reason: String,
    },
    /// The reduced value is NaN or infinite.
    NonFinite {
        /// The reduced value.
        value: f64,
    },
}

impl fmt::Display for ReductionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "collective reduction failed: {reason}"),
            Self::NonFinite { value } => {
                write!(f, "collective reduction produced non-finite value {value}")
            }
        }
    }
}

impl Error for ReductionError {}
