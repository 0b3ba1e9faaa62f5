//! Enumeration of valid production and dissociation pairings.
//!
//! Works at the level of catalog entries, before any grouping: every
//! pairing listed here is a member-level reaction. The network later
//! folds pairings that land on the same super-cluster representatives
//! into one effective reaction.

use crate::catalog::ClusterCatalog;
use crate::cluster::Kinetics;
use spall_core::{Composition, Species};

/// Outcome of bringing two compositions together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combination {
    /// The reactants merge into one cluster.
    Product(Composition),
    /// Interstitials and vacancies cancel exactly; nothing remains.
    Annihilation,
    /// The pairing does not react.
    Forbidden,
}

/// Combine two compositions.
///
/// Vacancies and interstitials recombine one-for-one. An excess of
/// interstitials can only survive as a pure interstitial cluster, so it
/// forbids the pairing when any gas atom is present. Xenon only reacts
/// with xenon.
pub fn combine(a: &Composition, b: &Composition) -> Combination {
    let xe_a = a.count(Species::Xe) > 0;
    let xe_b = b.count(Species::Xe) > 0;
    if xe_a || xe_b {
        let both_pure =
            a.pure_species() == Some(Species::Xe) && b.pure_species() == Some(Species::Xe);
        return if both_pure {
            Combination::Product(a.sum(b))
        } else {
            Combination::Forbidden
        };
    }
    let raw = a.sum(b);
    let v = raw.count(Species::V);
    let i = raw.count(Species::I);
    let gas = raw.with(Species::V, 0).with(Species::I, 0);
    if v >= i {
        let product = gas.with(Species::V, v - i);
        if product.is_empty() {
            Combination::Annihilation
        } else {
            Combination::Product(product)
        }
    } else if gas.is_empty() {
        Combination::Product(Composition::pure(Species::I, i - v))
    } else {
        Combination::Forbidden
    }
}

/// Member-level production `first + second → product`, as catalog indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductionPairing {
    /// First reactant.
    pub first: usize,
    /// Second reactant (may equal `first`).
    pub second: usize,
    /// Product, or `None` for interstitial-vacancy annihilation.
    pub product: Option<usize>,
}

/// Member-level dissociation `parent → emitted + remainder`, as catalog
/// indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DissociationPairing {
    /// Dissociating cluster.
    pub parent: usize,
    /// Emitted size-1 mobile cluster.
    pub emitted: usize,
    /// What is left of the parent.
    pub remainder: usize,
}

/// All member-level pairings of a catalog.
#[derive(Clone, Debug, Default)]
pub struct ReactionIndex {
    productions: Vec<ProductionPairing>,
    dissociations: Vec<DissociationPairing>,
    dropped: usize,
}

impl ReactionIndex {
    /// Enumerate every unordered pair of catalog entries.
    ///
    /// A pair reacts when at least one partner is mobile and
    /// [`combine`] yields a product present in the catalog, or an
    /// annihilation. Each production that is not an interstitial-vacancy
    /// recombination and involves a size-1 mobile partner also yields
    /// the reverse dissociation.
    pub fn build(catalog: &ClusterCatalog) -> Self {
        let entries = catalog.entries();
        let kinetics: Vec<Kinetics> = entries
            .iter()
            .map(|e| e.kinetics(catalog.lattice_parameter()))
            .collect();
        let mut index = Self::default();
        for i in 0..entries.len() {
            for j in i..entries.len() {
                if !kinetics[i].is_mobile() && !kinetics[j].is_mobile() {
                    continue;
                }
                let (a, b) = (&entries[i].composition, &entries[j].composition);
                let product = match combine(a, b) {
                    Combination::Forbidden => continue,
                    Combination::Annihilation => None,
                    Combination::Product(c) => match catalog.find(&c) {
                        Some(p) => Some(p),
                        None => {
                            index.dropped += 1;
                            continue;
                        }
                    },
                };
                index.productions.push(ProductionPairing {
                    first: i,
                    second: j,
                    product,
                });
                let Some(parent) = product else { continue };
                if is_recombination(a, b) {
                    continue;
                }
                let emitter =
                    |k: usize| entries[k].composition.size() == 1 && kinetics[k].is_mobile();
                if emitter(i) {
                    index.dissociations.push(DissociationPairing {
                        parent,
                        emitted: i,
                        remainder: j,
                    });
                } else if emitter(j) {
                    index.dissociations.push(DissociationPairing {
                        parent,
                        emitted: j,
                        remainder: i,
                    });
                }
            }
        }
        index
    }

    /// Member-level productions in enumeration order.
    pub fn productions(&self) -> &[ProductionPairing] {
        &self.productions
    }

    /// Member-level dissociations in enumeration order.
    pub fn dissociations(&self) -> &[DissociationPairing] {
        &self.dissociations
    }

    /// Pairings skipped because their product lies outside the catalog.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

fn is_recombination(a: &Composition, b: &Composition) -> bool {
    (a.count(Species::V) > 0 && b.count(Species::I) > 0)
        || (a.count(Species::I) > 0 && b.count(Species::V) > 0)
}
