//! The validated cluster catalog a network is built from.

use crate::cluster::ClusterSpec;
use indexmap::IndexMap;
use spall_core::{Composition, NetworkError, Species};

/// A validated set of catalog entries plus the host lattice parameter.
///
/// The catalog is the persisted description of a network: every
/// composition that may appear as a kinetic state variable, with its
/// energies. Entry order is preserved and becomes slot order for
/// ungrouped clusters.
#[derive(Clone, Debug)]
pub struct ClusterCatalog {
    lattice_parameter: f64,
    entries: Vec<ClusterSpec>,
    by_composition: IndexMap<Composition, usize>,
}

impl ClusterCatalog {
    /// Validate and index `entries`.
    ///
    /// Fails on an empty catalog, a non-positive lattice parameter, an
    /// invalid entry, or a repeated composition.
    pub fn new(lattice_parameter: f64, entries: Vec<ClusterSpec>) -> Result<Self, NetworkError> {
        if !lattice_parameter.is_finite() || lattice_parameter <= 0.0 {
            return Err(NetworkError::InvalidLatticeParameter {
                value: lattice_parameter,
            });
        }
        if entries.is_empty() {
            return Err(NetworkError::EmptyCatalog);
        }
        let mut by_composition = IndexMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            entry.validate()?;
            if by_composition.insert(entry.composition, i).is_some() {
                return Err(NetworkError::DuplicateComposition {
                    composition: entry.composition,
                });
            }
        }
        Ok(Self {
            lattice_parameter,
            entries,
            by_composition,
        })
    }

    /// Host lattice parameter (nm).
    pub fn lattice_parameter(&self) -> f64 {
        self.lattice_parameter
    }

    /// Atomic volume Ω = ½·a³ of a bcc host (nm³).
    pub fn atomic_volume(&self) -> f64 {
        0.5 * self.lattice_parameter.powi(3)
    }

    /// All entries in catalog order.
    pub fn entries(&self) -> &[ClusterSpec] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always returns `false`: construction rejects empty catalogs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Catalog index of `composition`.
    pub fn find(&self, composition: &Composition) -> Option<usize> {
        self.by_composition.get(composition).copied()
    }

    /// Largest size among pure entries of `species`.
    pub fn max_pure_size(&self, species: Species) -> Option<u32> {
        self.entries
            .iter()
            .filter(|e| e.composition.pure_species() == Some(species))
            .map(|e| e.composition.size())
            .max()
    }
}
