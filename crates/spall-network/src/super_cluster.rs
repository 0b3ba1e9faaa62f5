//! Mean-plus-first-moment representation of a group of clusters.

use crate::cluster::Kinetics;
use spall_core::{ClusterId, Composition, GroupId, Species};

/// One catalog cluster folded into a [`SuperCluster`].
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    /// The member's composition (pure, of the group's species).
    pub composition: Composition,
    /// Number of atoms of the group's species.
    pub size: u32,
    /// Signed distance `size − mean` from the group mean.
    pub distance: f64,
    /// Resolved kinetic parameters.
    pub kinetics: Kinetics,
}

/// A coarse-grained group of same-species clusters.
///
/// Member concentrations are not stored: they are reconstructed from
/// the base (mean) concentration `c0` and the first moment `l1` as
/// `c(n) = c0 + (n − mean)·l1`.
#[derive(Clone, Debug)]
pub struct SuperCluster {
    id: GroupId,
    base: ClusterId,
    moment: usize,
    species: Species,
    low: u32,
    high: u32,
    mean: f64,
    dispersion: f64,
    members: Vec<Member>,
}

impl SuperCluster {
    /// Build a group from its members.
    ///
    /// `members` must be non-empty; the caller reports an empty bin as a
    /// configuration error before getting here. Member distances are
    /// filled in from the computed mean.
    pub(crate) fn new(
        id: GroupId,
        base: ClusterId,
        moment: usize,
        species: Species,
        (low, high): (u32, u32),
        mut members: Vec<Member>,
    ) -> Self {
        let n = members.len().max(1) as f64;
        let mean = members.iter().map(|m| f64::from(m.size)).sum::<f64>() / n;
        let dispersion = members
            .iter()
            .map(|m| (f64::from(m.size) - mean).powi(2))
            .sum::<f64>()
            / n;
        for m in &mut members {
            m.distance = f64::from(m.size) - mean;
        }
        Self {
            id,
            base,
            moment,
            species,
            low,
            high,
            mean,
            dispersion,
            members,
        }
    }

    /// Group id.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Slot of the base (mean) concentration; also the group's cluster id.
    pub fn base_slot(&self) -> ClusterId {
        self.base
    }

    /// Slot of the first moment.
    pub fn moment_slot(&self) -> usize {
        self.moment
    }

    /// Grouped species.
    pub fn species(&self) -> Species {
        self.species
    }

    /// Inclusive size range covered by the bin.
    pub fn bounds(&self) -> (u32, u32) {
        (self.low, self.high)
    }

    /// Mean member size.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Number of member clusters.
    pub fn n_tot(&self) -> f64 {
        self.members.len() as f64
    }

    /// Width of the size section covered by the bin.
    pub fn section_width(&self) -> f64 {
        f64::from(self.high - self.low + 1)
    }

    /// Population size variance σ² = mean((n − n̄)²).
    pub fn dispersion(&self) -> f64 {
        self.dispersion
    }

    /// Folded members, ascending in size.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// `true` iff `size` lies strictly inside
    /// `(mean − width/2, mean + width/2)`.
    pub fn is_in(&self, size: u32) -> bool {
        let half = 0.5 * self.section_width();
        let s = f64::from(size);
        s > self.mean - half && s < self.mean + half
    }

    /// Signed distance of `size` from the mean.
    pub fn distance(&self, size: u32) -> f64 {
        f64::from(size) - self.mean
    }

    /// Reconstructed concentration at signed distance `distance`.
    pub fn concentration(base: f64, moment: f64, distance: f64) -> f64 {
        base + distance * moment
    }

    /// Σ c(n) over members, from the state slice of one point.
    pub fn total_concentration(&self, concs: &[f64]) -> f64 {
        self.n_tot() * concs[self.base.index()]
    }

    /// Σ n·c(n) over members, from the state slice of one point.
    pub fn total_atom_concentration(&self, concs: &[f64]) -> f64 {
        let c0 = concs[self.base.index()];
        let l1 = concs[self.moment];
        self.n_tot() * (self.mean * c0 + self.dispersion * l1)
    }
}
