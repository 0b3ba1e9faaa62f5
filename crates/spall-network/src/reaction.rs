//! Effective production and dissociation reactions.
//!
//! An effective reaction links network representatives (normal clusters
//! or super-cluster groups). It folds every member-level pairing that
//! maps onto the same representatives into a coefficient table, so the
//! flux and its exact derivatives are bilinear (production) or linear
//! (dissociation) in the representatives' base and moment values.
//!
//! Table layout: `a[t][i][j][k]` sums `k(T)·wA^i·wB^j·wT^k` over
//! member terms, where `w = (1, distance)`; `t` selects the target
//! (product/parent, first, second), `i` and `j` the reactant factor
//! (base or moment), and `k` the target projection (base or moment).

use crate::cluster::Kinetics;
use crate::layout::PartialsLayout;
use smallvec::SmallVec;
use spall_core::constants::{arrhenius, FOUR_PI};
use spall_core::{ClusterId, FillMap, GroupId, NetworkError};
use std::fmt;

/// A network participant: a normal cluster or a super-cluster group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reactant {
    /// An individually resolved cluster.
    Cluster(ClusterId),
    /// A super-cluster group.
    Group(GroupId),
}

impl fmt::Display for Reactant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cluster(id) => write!(f, "C{id}"),
            Self::Group(id) => write!(f, "{id}"),
        }
    }
}

/// Slots and group statistics of one representative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Factor {
    pub base: usize,
    pub moment: Option<usize>,
    pub n_tot: f64,
    pub dispersion: f64,
}

impl Factor {
    pub fn cluster(id: ClusterId) -> Self {
        Self {
            base: id.index(),
            moment: None,
            n_tot: 1.0,
            dispersion: 0.0,
        }
    }

    fn values(&self, concs: &[f64]) -> [f64; 2] {
        [concs[self.base], self.moment.map_or(0.0, |m| concs[m])]
    }

    /// `(factor index, slot)` for every column this factor contributes.
    fn columns(&self) -> SmallVec<[(usize, usize); 2]> {
        let mut cols = SmallVec::new();
        cols.push((0, self.base));
        if let Some(m) = self.moment {
            cols.push((1, m));
        }
        cols
    }

    /// Projections of a member-level rate onto this representative's
    /// slots, with `sign` +1 for a gain and −1 for a loss.
    fn projections(&self, sign: f64) -> SmallVec<[Projection; 2]> {
        let mut out = SmallVec::new();
        out.push(Projection {
            slot: self.base,
            weight: 0,
            scale: sign / self.n_tot,
        });
        if let Some(m) = self.moment {
            if self.dispersion > 0.0 {
                out.push(Projection {
                    slot: m,
                    weight: 1,
                    scale: sign / (self.n_tot * self.dispersion),
                });
            }
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Projection {
    slot: usize,
    weight: usize,
    scale: f64,
}

/// Coefficients of an effective production at one grid point.
pub type ProductionTable = [[[[f64; 2]; 2]; 2]; 3];

/// Coefficients of an effective dissociation at one grid point.
pub type DissociationTable = [[[f64; 2]; 2]; 3];

/// Capture rate k⁺ = 4π(r₁ + r₂)(D₁ + D₂) in nm³/s.
pub fn capture_rate(a: &Kinetics, b: &Kinetics, temperature: f64) -> f64 {
    FOUR_PI
        * (a.reaction_radius + b.reaction_radius)
        * (a.diffusion_coefficient(temperature) + b.diffusion_coefficient(temperature))
}

/// One member-level production folded into an effective reaction.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ProductionTerm {
    pub first: Kinetics,
    pub second: Kinetics,
    /// Distances of the first, second and product members.
    pub distance: [f64; 3],
}

/// One member-level dissociation folded into an effective reaction.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DissociationTerm {
    pub emitted: Kinetics,
    pub remainder: Kinetics,
    pub binding_energy: f64,
    /// Distances of the parent, emitted and remainder members.
    pub distance: [f64; 3],
}

#[derive(Clone, Copy, Debug)]
enum Source {
    First(usize),
    Second(usize),
}

/// Effective `first + second → product` reaction.
///
/// `product` is `None` for interstitial-vacancy annihilation.
#[derive(Clone, Debug)]
pub struct ProductionReaction {
    first: Reactant,
    second: Reactant,
    product: Option<Reactant>,
    first_factor: Factor,
    second_factor: Factor,
    targets: [SmallVec<[Projection; 2]>; 3],
    terms: Vec<ProductionTerm>,
    coefficients: Vec<ProductionTable>,
    positions: Vec<usize>,
}

impl ProductionReaction {
    pub(crate) fn new(
        (first, first_factor): (Reactant, Factor),
        (second, second_factor): (Reactant, Factor),
        product: Option<(Reactant, Factor)>,
    ) -> Self {
        let targets = [
            product.map(|(_, f)| f.projections(1.0)).unwrap_or_default(),
            first_factor.projections(-1.0),
            second_factor.projections(-1.0),
        ];
        Self {
            first,
            second,
            product: product.map(|(r, _)| r),
            first_factor,
            second_factor,
            targets,
            terms: Vec::new(),
            coefficients: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub(crate) fn push_term(&mut self, term: ProductionTerm) {
        self.terms.push(term);
    }

    /// First reactant.
    pub fn first(&self) -> Reactant {
        self.first
    }

    /// Second reactant.
    pub fn second(&self) -> Reactant {
        self.second
    }

    /// Product, or `None` for annihilation.
    pub fn product(&self) -> Option<Reactant> {
        self.product
    }

    /// Number of member-level pairings folded into this reaction.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Coefficient table at local grid point `point`, if allocated.
    pub fn coefficients(&self, point: usize) -> Option<&ProductionTable> {
        self.coefficients.get(point)
    }

    pub(crate) fn resize(&mut self, points: usize) {
        self.coefficients.resize(points, [[[[0.0; 2]; 2]; 2]; 3]);
    }

    /// Recompute the table at `point`; returns the largest member rate.
    pub(crate) fn update(&mut self, point: usize, temperature: f64) -> f64 {
        let mut table: ProductionTable = [[[[0.0; 2]; 2]; 2]; 3];
        let mut largest = 0.0f64;
        for term in &self.terms {
            let k = capture_rate(&term.first, &term.second, temperature);
            largest = largest.max(k);
            let [d1, d2, dp] = term.distance;
            let wa = [1.0, d1];
            let wb = [1.0, d2];
            let wt = [[1.0, dp], [1.0, d1], [1.0, d2]];
            for (t, target) in table.iter_mut().enumerate() {
                for (i, row) in target.iter_mut().enumerate() {
                    for (j, cell) in row.iter_mut().enumerate() {
                        for (w, value) in cell.iter_mut().enumerate() {
                            *value += k * wa[i] * wb[j] * wt[t][w];
                        }
                    }
                }
            }
        }
        self.coefficients[point] = table;
        largest
    }

    fn entries(&self) -> impl Iterator<Item = (usize, Projection, Source, usize)> + '_ {
        let first = self.first_factor.columns();
        let second = self.second_factor.columns();
        self.targets.iter().enumerate().flat_map(move |(t, projections)| {
            let first = first.clone();
            let second = second.clone();
            projections.iter().flat_map(move |&p| {
                first
                    .clone()
                    .into_iter()
                    .map(move |(i, col)| (t, p, Source::First(i), col))
                    .chain(
                        second
                            .clone()
                            .into_iter()
                            .map(move |(j, col)| (t, p, Source::Second(j), col)),
                    )
            })
        })
    }

    pub(crate) fn mark(&self, fill: &mut FillMap) {
        for (_, p, _, col) in self.entries() {
            fill.mark(p.slot, col);
        }
    }

    pub(crate) fn locate(&mut self, layout: &PartialsLayout) -> Result<(), NetworkError> {
        let positions = self
            .entries()
            .map(|(_, p, _, col)| {
                layout
                    .position(p.slot, col)
                    .ok_or(NetworkError::LayoutMismatch { row: p.slot, col })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.positions = positions;
        Ok(())
    }

    pub(crate) fn flux(&self, point: usize, concs: &[f64], out: &mut [f64]) {
        let Some(table) = self.coefficients.get(point) else {
            return;
        };
        let f = self.first_factor.values(concs);
        let s = self.second_factor.values(concs);
        for (target, projections) in table.iter().zip(&self.targets) {
            for p in projections {
                let mut v = 0.0;
                for i in 0..2 {
                    for j in 0..2 {
                        v += target[i][j][p.weight] * f[i] * s[j];
                    }
                }
                out[p.slot] += p.scale * v;
            }
        }
    }

    pub(crate) fn partials(&self, point: usize, concs: &[f64], vals: &mut [f64]) {
        let Some(table) = self.coefficients.get(point) else {
            return;
        };
        let f = self.first_factor.values(concs);
        let s = self.second_factor.values(concs);
        for ((t, p, source, _), &pos) in self.entries().zip(&self.positions) {
            let a = &table[t];
            let w = p.weight;
            let v = match source {
                Source::First(i) => a[i][0][w] * s[0] + a[i][1][w] * s[1],
                Source::Second(j) => a[0][j][w] * f[0] + a[1][j][w] * f[1],
            };
            vals[pos] += p.scale * v;
        }
    }
}

/// Effective `parent → emitted + remainder` reaction.
#[derive(Clone, Debug)]
pub struct DissociationReaction {
    parent: Reactant,
    emitted: Reactant,
    remainder: Reactant,
    parent_factor: Factor,
    targets: [SmallVec<[Projection; 2]>; 3],
    terms: Vec<DissociationTerm>,
    coefficients: Vec<DissociationTable>,
    positions: Vec<usize>,
}

impl DissociationReaction {
    pub(crate) fn new(
        (parent, parent_factor): (Reactant, Factor),
        (emitted, emitted_factor): (Reactant, Factor),
        (remainder, remainder_factor): (Reactant, Factor),
    ) -> Self {
        let targets = [
            parent_factor.projections(-1.0),
            emitted_factor.projections(1.0),
            remainder_factor.projections(1.0),
        ];
        Self {
            parent,
            emitted,
            remainder,
            parent_factor,
            targets,
            terms: Vec::new(),
            coefficients: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub(crate) fn push_term(&mut self, term: DissociationTerm) {
        self.terms.push(term);
    }

    /// Dissociating representative.
    pub fn parent(&self) -> Reactant {
        self.parent
    }

    /// Emitted size-1 cluster.
    pub fn emitted(&self) -> Reactant {
        self.emitted
    }

    /// What remains of the parent.
    pub fn remainder(&self) -> Reactant {
        self.remainder
    }

    /// Number of member-level pairings folded into this reaction.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Coefficient table at local grid point `point`, if allocated.
    pub fn coefficients(&self, point: usize) -> Option<&DissociationTable> {
        self.coefficients.get(point)
    }

    pub(crate) fn resize(&mut self, points: usize) {
        self.coefficients.resize(points, [[[0.0; 2]; 2]; 3]);
    }

    /// Recompute the table at `point` for a host of atomic volume
    /// `atomic_volume`; returns the largest member rate.
    pub(crate) fn update(&mut self, point: usize, temperature: f64, atomic_volume: f64) -> f64 {
        let mut table: DissociationTable = [[[0.0; 2]; 2]; 3];
        let mut largest = 0.0f64;
        for term in &self.terms {
            let capture = capture_rate(&term.emitted, &term.remainder, temperature);
            let k = arrhenius(capture / atomic_volume, term.binding_energy, temperature);
            largest = largest.max(k);
            let [dp, de, dr] = term.distance;
            let wp = [1.0, dp];
            let wt = [[1.0, dp], [1.0, de], [1.0, dr]];
            for (t, target) in table.iter_mut().enumerate() {
                for (i, cell) in target.iter_mut().enumerate() {
                    for (w, value) in cell.iter_mut().enumerate() {
                        *value += k * wp[i] * wt[t][w];
                    }
                }
            }
        }
        self.coefficients[point] = table;
        largest
    }

    fn entries(&self) -> impl Iterator<Item = (usize, Projection, usize, usize)> + '_ {
        let cols = self.parent_factor.columns();
        self.targets.iter().enumerate().flat_map(move |(t, projections)| {
            let cols = cols.clone();
            projections.iter().flat_map(move |&p| {
                cols.clone().into_iter().map(move |(i, col)| (t, p, i, col))
            })
        })
    }

    pub(crate) fn mark(&self, fill: &mut FillMap) {
        for (_, p, _, col) in self.entries() {
            fill.mark(p.slot, col);
        }
    }

    pub(crate) fn locate(&mut self, layout: &PartialsLayout) -> Result<(), NetworkError> {
        let positions = self
            .entries()
            .map(|(_, p, _, col)| {
                layout
                    .position(p.slot, col)
                    .ok_or(NetworkError::LayoutMismatch { row: p.slot, col })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.positions = positions;
        Ok(())
    }

    pub(crate) fn flux(&self, point: usize, concs: &[f64], out: &mut [f64]) {
        let Some(table) = self.coefficients.get(point) else {
            return;
        };
        let g = self.parent_factor.values(concs);
        for (target, projections) in table.iter().zip(&self.targets) {
            for p in projections {
                let v = target[0][p.weight] * g[0] + target[1][p.weight] * g[1];
                out[p.slot] += p.scale * v;
            }
        }
    }

    pub(crate) fn partials(&self, point: usize, vals: &mut [f64]) {
        let Some(table) = self.coefficients.get(point) else {
            return;
        };
        for ((t, p, i, _), &pos) in self.entries().zip(&self.positions) {
            vals[pos] += p.scale * table[t][i][p.weight];
        }
    }
}
