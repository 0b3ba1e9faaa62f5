//! Re-solution of gas atoms from bubbles by fission fragments.
//!
//! Each fragment passing through a bubble knocks `k` atoms back into
//! solution:
//!
//! ```text
//! X_n → X_{n−k} + k·X_1,   rate = r·c(n),   r = prefactor · flux · S_e
//! ```
//!
//! where `S_e` is the electronic stopping power. Member-level terms are
//! folded per `(parent representative, product representative)` into
//! moment tables, the same way the network folds its reactions.

use indexmap::IndexMap;
use spall_core::{Composition, HandlerError, JacobianEntry, JacobianSink, Species};
use spall_handler::{
    check_buffers, FillMaps, PartialsShape, PhysicsHandler, PointContext, SetupContext, Stage,
};
use spall_network::{Reactant, ReactionNetwork};

/// Rows of one participant: parent base, parent moment, product base,
/// product moment, single.
const ROWS: usize = 5;
/// Columns: parent base, parent moment.
const COLS: usize = 2;

const PARENT: usize = 0;
const PRODUCT: usize = 1;
const SINGLE: usize = 2;

/// Where a representative's flux lands and how it is projected.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Target {
    base: usize,
    moment: Option<usize>,
    n_tot: f64,
    dispersion: f64,
}

impl Target {
    fn of(network: &ReactionNetwork, reactant: Reactant) -> Self {
        let (n_tot, dispersion) = match reactant {
            Reactant::Group(g) => network
                .group(g)
                .map_or((1.0, 0.0), |g| (g.n_tot(), g.dispersion())),
            Reactant::Cluster(_) => (1.0, 0.0),
        };
        Self {
            base: network.base_slot(reactant),
            moment: network.moment_slot(reactant),
            n_tot,
            dispersion,
        }
    }

    fn single(slot: usize) -> Self {
        Self {
            base: slot,
            moment: None,
            n_tot: 1.0,
            dispersion: 0.0,
        }
    }

    /// Projection scale of row `w` (0 base, 1 moment).
    fn scale(&self, w: usize) -> f64 {
        match w {
            0 => 1.0 / self.n_tot,
            _ if self.moment.is_some() && self.dispersion > 0.0 => {
                1.0 / (self.n_tot * self.dispersion)
            }
            _ => 0.0,
        }
    }

    fn row(&self, w: usize) -> usize {
        match w {
            0 => self.base,
            _ => self.moment.unwrap_or(self.base),
        }
    }
}

/// One folded `(parent, product)` channel.
///
/// `coefficients[t][i][w]` sums, over member terms, the stoichiometry of
/// target `t` times the parent's weight `(1, d_p)[i]` times the target's
/// weight `(1, d_t)[w]`.
#[derive(Clone, Debug, PartialEq)]
struct Ejection {
    targets: [Target; 3],
    coefficients: [[[f64; 2]; 2]; 3],
}

impl Ejection {
    /// `∂flux(t, w)/∂parent(i)` for unit rate.
    fn partial(&self, t: usize, w: usize, i: usize) -> f64 {
        if i == 1 && self.targets[PARENT].moment.is_none() {
            return 0.0;
        }
        self.coefficients[t][i][w] * self.targets[t].scale(w)
    }

    /// `(target, row)` pairs in partials row order.
    fn rows() -> [(usize, usize); ROWS] {
        [(PARENT, 0), (PARENT, 1), (PRODUCT, 0), (PRODUCT, 1), (SINGLE, 0)]
    }
}

/// Re-solution of one gas species.
#[derive(Clone, Debug)]
pub struct ReSolutionHandler {
    species: Species,
    threshold: u32,
    ejected: u32,
    prefactor: f64,
    stopping_power: f64,
    flux_amplitude: f64,
    participants: Vec<Ejection>,
}

/// Builder for [`ReSolutionHandler`].
///
/// Defaults: xenon, threshold 1, one atom ejected per event, unit
/// prefactor and stopping power.
#[derive(Clone, Debug)]
pub struct ReSolutionConfig {
    species: Species,
    threshold: u32,
    ejected: u32,
    prefactor: f64,
    stopping_power: f64,
}

impl ReSolutionHandler {
    /// Create a builder.
    pub fn builder() -> ReSolutionConfig {
        ReSolutionConfig {
            species: Species::Xe,
            threshold: 1,
            ejected: 1,
            prefactor: 1.0,
            stopping_power: 1.0,
        }
    }

    /// Set the incident flux amplitude the rate scales with.
    pub fn set_flux_amplitude(&mut self, amplitude: f64) {
        self.flux_amplitude = amplitude;
    }

    /// Re-solution rate `r` per unit concentration.
    pub fn rate(&self) -> f64 {
        self.prefactor * self.flux_amplitude * self.stopping_power
    }

    /// Number of folded channels.
    pub fn channel_count(&self) -> usize {
        self.participants.len()
    }

    fn parent_factors(ctx: &PointContext<'_>, e: &Ejection) -> [f64; 2] {
        let p = &e.targets[PARENT];
        [ctx.mid()[p.base], p.moment.map_or(0.0, |m| ctx.mid()[m])]
    }
}

impl ReSolutionConfig {
    /// Gas species knocked back into solution.
    pub fn species(mut self, species: Species) -> Self {
        self.species = species;
        self
    }

    /// Only clusters strictly larger than `size` re-solve.
    pub fn threshold(mut self, size: u32) -> Self {
        self.threshold = size;
        self
    }

    /// Atoms ejected per event.
    pub fn ejected(mut self, k: u32) -> Self {
        self.ejected = k;
        self
    }

    /// Dimensionless prefactor.
    pub fn prefactor(mut self, prefactor: f64) -> Self {
        self.prefactor = prefactor;
        self
    }

    /// Electronic stopping power of the fragments.
    pub fn stopping_power(mut self, stopping_power: f64) -> Self {
        self.stopping_power = stopping_power;
        self
    }

    /// Build the handler.
    ///
    /// # Errors
    ///
    /// Returns `Err` for a defect species, zero ejected atoms, or a
    /// negative or non-finite prefactor or stopping power.
    pub fn build(self) -> Result<ReSolutionHandler, String> {
        if self.species.is_defect() {
            return Err(format!("re-solution needs a gas species, got {}", self.species));
        }
        if self.ejected == 0 {
            return Err("at least one atom must be ejected per event".to_string());
        }
        for (what, v) in [("prefactor", self.prefactor), ("stopping power", self.stopping_power)] {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("re-solution {what} must be finite and >= 0, got {v}"));
            }
        }
        Ok(ReSolutionHandler {
            species: self.species,
            threshold: self.threshold,
            ejected: self.ejected,
            prefactor: self.prefactor,
            stopping_power: self.stopping_power,
            flux_amplitude: 0.0,
            participants: Vec::new(),
        })
    }
}

impl PhysicsHandler for ReSolutionHandler {
    fn name(&self) -> &str {
        "re-solution"
    }

    fn stage(&self) -> Stage {
        Stage::ReSolution
    }

    fn initialize(
        &mut self,
        setup: &SetupContext<'_>,
        fill: &mut FillMaps,
    ) -> Result<(), HandlerError> {
        let network = setup.network();
        let species = self.species;
        let k = self.ejected;
        let min = self.threshold.max(k);

        // (parent representative, member size, distance from its mean)
        let mut members: Vec<(Reactant, u32, f64)> = network
            .clusters()
            .iter()
            .filter(|c| c.composition().pure_species() == Some(species) && c.size() > min)
            .map(|c| (Reactant::Cluster(c.id()), c.size(), 0.0))
            .collect();
        for g in network.groups().iter().filter(|g| g.species() == species) {
            members.extend(
                g.members()
                    .iter()
                    .filter(|m| m.size > min)
                    .map(|m| (Reactant::Group(g.id()), m.size, m.distance)),
            );
        }
        if members.is_empty() {
            self.participants.clear();
            log::debug!("re-solution: no {species} cluster above size {min}");
            return Ok(());
        }

        let single = network
            .get(species, 1)
            .ok_or_else(|| HandlerError::MissingCluster {
                handler: self.name().to_string(),
                composition: Composition::pure(species, 1),
            })?
            .id()
            .index();

        let mut folded: IndexMap<(Reactant, Reactant), Ejection> = IndexMap::new();
        let mut dropped = 0usize;
        for (parent, size, d_p) in members {
            let Some(product) = network.find_reactant(&Composition::pure(species, size - k)) else {
                dropped += 1;
                continue;
            };
            let d_q = match product {
                Reactant::Group(g) => network.group(g).map_or(0.0, |g| g.distance(size - k)),
                Reactant::Cluster(_) => 0.0,
            };
            let e = folded.entry((parent, product)).or_insert_with(|| Ejection {
                targets: [
                    Target::of(network, parent),
                    Target::of(network, product),
                    Target::single(single),
                ],
                coefficients: [[[0.0; 2]; 2]; 3],
            });
            let w_p = [1.0, d_p];
            let w_q = [1.0, d_q];
            for i in 0..2 {
                for w in 0..2 {
                    e.coefficients[PARENT][i][w] -= w_p[i] * w_p[w];
                    e.coefficients[PRODUCT][i][w] += w_p[i] * w_q[w];
                }
                e.coefficients[SINGLE][i][0] += f64::from(k) * w_p[i];
            }
        }
        self.participants = folded.into_values().collect();

        for e in &self.participants {
            let parent = &e.targets[PARENT];
            for (t, w) in Ejection::rows() {
                let target = &e.targets[t];
                if w == 1 && target.moment.is_none() {
                    continue;
                }
                fill.dfill.mark(target.row(w), parent.base);
                if let Some(m) = parent.moment {
                    fill.dfill.mark(target.row(w), m);
                }
            }
        }
        log::debug!(
            "re-solution: {} channels for {species}, {dropped} members without product",
            self.participants.len()
        );
        Ok(())
    }

    fn compute_flux(&self, ctx: &PointContext<'_>, out: &mut [f64]) {
        let r = self.rate();
        if r == 0.0 {
            return;
        }
        for e in &self.participants {
            let factors = Self::parent_factors(ctx, e);
            for (t, w) in Ejection::rows() {
                let target = &e.targets[t];
                if w == 1 && target.moment.is_none() {
                    continue;
                }
                let flux: f64 = (0..2)
                    .map(|i| e.coefficients[t][i][w] * factors[i])
                    .sum::<f64>()
                    * target.scale(w);
                out[target.row(w)] += r * flux;
            }
        }
    }

    fn participant_count(&self, _ctx: &PointContext<'_>) -> usize {
        self.participants.len()
    }

    fn partials_shape(&self) -> PartialsShape {
        PartialsShape::new(ROWS, ROWS * COLS)
    }

    /// Indices per participant are the five row slots; the columns are
    /// the first two. Values are row-major `5 × 2`.
    fn compute_partials(
        &self,
        _ctx: &PointContext<'_>,
        indices: &mut [usize],
        values: &mut [f64],
    ) -> Result<usize, HandlerError> {
        let n = self.participants.len();
        check_buffers(self.name(), self.partials_shape(), n, indices, values)?;
        let r = self.rate();
        for (p, e) in self.participants.iter().enumerate() {
            for (row, (t, w)) in Ejection::rows().into_iter().enumerate() {
                indices[ROWS * p + row] = e.targets[t].row(w);
                for col in 0..COLS {
                    values[ROWS * COLS * p + COLS * row + col] = r * e.partial(t, w, col);
                }
            }
        }
        Ok(n)
    }

    /// Emits every structural entry, zeros included; moment rows and
    /// columns exist only for grouped targets.
    fn emit_partials(
        &self,
        ctx: &PointContext<'_>,
        indices: &[usize],
        values: &[f64],
        count: usize,
        sink: &mut dyn JacobianSink,
    ) {
        let point = ctx.point() as isize;
        for (p, e) in self.participants.iter().enumerate().take(count) {
            let rows = &indices[ROWS * p..ROWS * (p + 1)];
            let cols = if e.targets[PARENT].moment.is_some() { COLS } else { 1 };
            for (row, (t, w)) in Ejection::rows().into_iter().enumerate() {
                if w == 1 && e.targets[t].moment.is_none() {
                    continue;
                }
                let row_slot = rows[row];
                for col in 0..cols {
                    let value = values[ROWS * COLS * p + COLS * row + col];
                    sink.add(JacobianEntry {
                        row_point: point,
                        row: row_slot,
                        col_point: point,
                        col: rows[col],
                        value,
                    });
                }
            }
        }
    }
}
