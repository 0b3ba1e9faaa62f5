//! Modified trap mutation of small helium clusters near the surface.
//!
//! Close to the surface a mobile `He_n` can push `k` tungsten atoms out of
//! their sites, leaving an immobile `He_nV_k` and emitting an `I_k`:
//!
//! ```text
//! He_n → He_nV_k + I_k,   rate = k_mut · k_dis · c(He_n)
//! ```
//!
//! `k_mut` is pinned to the fastest reaction at the point so the mutation
//! is effectively instantaneous. `k_dis` optionally attenuates it as the
//! near-surface trapped population builds up.
//!
//! On (111) tungsten part of the `He_1` reaching the surface desorbs
//! instead: the He₁ channel keeps its total loss but only `1 − p` of it
//! becomes `He_1V_k + I_k`, with `p` taken at the point's temperature.

use spall_core::{Composition, HandlerError, JacobianEntry, JacobianSink, Species};
use spall_grid::SurfaceBand;
use spall_handler::{
    check_buffers, FillMaps, PartialsShape, PhysicsHandler, PointContext, SetupContext, Stage,
};
use spall_network::ReactionNetwork;

const W100_DEPTH: [f64; 7] = [-0.1, 0.5, 0.6, 0.6, 0.8, 0.8, 0.8];
const W100_VACANCIES: [u32; 7] = [0, 1, 1, 1, 1, 1, 1];
const W111_COLD_DEPTH: [f64; 7] = [0.6, 0.8, 1.1, 1.1, 1.2, 1.3, 1.3];
const W111_HOT_DEPTH: [f64; 7] = [0.6, 0.8, 1.1, 1.1, 1.1, 1.1, 1.1];
const W111_VACANCIES: [u32; 7] = [1, 1, 1, 1, 1, 1, 2];

/// W111 switches depth tables at this temperature (K).
pub const W111_TRANSITION_TEMPERATURE: f64 = 1066.5;

const W111_COLD_DESORPTION: f64 = 0.61;
const W111_HOT_DESORPTION: f64 = 0.35;

/// Mutation rate relative to the fastest reaction at the point.
const MUTATION_RATE_FACTOR: f64 = 1000.0;

/// Depth tolerance added to every table depth (nm).
const DEPTH_TOLERANCE: f64 = 0.01;

/// One row of a trap-mutation table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrapEntry {
    /// Helium count of the mutating cluster.
    pub helium: u32,
    /// Deepest position below the surface (nm) where it mutates.
    pub depth: f64,
    /// Vacancies created; also the size of the emitted interstitial.
    pub vacancies: u32,
}

/// Fraction of one helium size that desorbs instead of mutating.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeliumDesorption {
    /// Helium count of the desorbing cluster.
    pub helium: u32,
    /// Desorbed share of its surface loss, in `[0, 1]`.
    pub fraction: f64,
}

/// Which depth/size table to use.
#[derive(Clone, Debug, PartialEq)]
pub enum TrapMutationTable {
    /// (100) tungsten.
    W100,
    /// (111) tungsten; the table depends on the setup temperature.
    W111,
    /// User-supplied rows.
    Custom(Vec<TrapEntry>),
}

impl TrapMutationTable {
    /// Rows in effect at `temperature`.
    pub fn entries(&self, temperature: f64) -> Vec<TrapEntry> {
        let rows = |depths: &[f64; 7], vacancies: &[u32; 7]| -> Vec<TrapEntry> {
            depths
                .iter()
                .zip(vacancies)
                .enumerate()
                .map(|(i, (&depth, &vacancies))| TrapEntry {
                    helium: i as u32 + 1,
                    depth,
                    vacancies,
                })
                .collect()
        };
        match self {
            Self::W100 => rows(&W100_DEPTH, &W100_VACANCIES),
            Self::W111 if temperature < W111_TRANSITION_TEMPERATURE => {
                rows(&W111_COLD_DEPTH, &W111_VACANCIES)
            }
            Self::W111 => rows(&W111_HOT_DEPTH, &W111_VACANCIES),
            Self::Custom(entries) => entries.clone(),
        }
    }

    /// Helium desorption in effect at `temperature`, if the table has any.
    pub fn helium_desorption(&self, temperature: f64) -> Option<HeliumDesorption> {
        match self {
            Self::W111 => Some(HeliumDesorption {
                helium: 1,
                fraction: if temperature < W111_TRANSITION_TEMPERATURE {
                    W111_COLD_DESORPTION
                } else {
                    W111_HOT_DESORPTION
                },
            }),
            Self::W100 | Self::Custom(_) => None,
        }
    }
}

/// Resolved slots of one mutation channel.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Mutation {
    helium: usize,
    bubble: usize,
    interstitial: usize,
    depth: f64,
    desorbs: bool,
}

/// Trap mutation inside a band below the tracked surface.
#[derive(Clone, Debug)]
pub struct TrapMutationHandler {
    table: TrapMutationTable,
    band: SurfaceBand,
    attenuation: Option<f64>,
    cutoff: f64,
    mutations: Vec<Mutation>,
    /// Per local point, indices into `mutations`.
    active: Vec<Vec<usize>>,
    /// Per local point, `k_mut`.
    rates: Vec<f64>,
    /// Per local point, the desorbed share of the desorbing channel.
    desorbed: Vec<f64>,
}

/// Builder for [`TrapMutationHandler`].
///
/// Defaults: W100 table, band of offsets `1..=16` past the surface, no
/// attenuation, cutoff 50.
#[derive(Clone, Debug)]
pub struct TrapMutationConfig {
    table: TrapMutationTable,
    band: SurfaceBand,
    attenuation: Option<f64>,
    cutoff: f64,
}

impl TrapMutationHandler {
    /// Create a builder.
    pub fn builder() -> TrapMutationConfig {
        TrapMutationConfig {
            table: TrapMutationTable::W100,
            band: SurfaceBand::new(1, 16),
            attenuation: None,
            cutoff: 50.0,
        }
    }

    /// Number of resolved mutation channels.
    pub fn channel_count(&self) -> usize {
        self.mutations.len()
    }

    /// Channels active at local point `local`.
    pub fn active_count(&self, local: usize) -> usize {
        self.active.get(local).map_or(0, Vec::len)
    }

    /// `k_mut` at local point `local`.
    pub fn mutation_rate(&self, local: usize) -> f64 {
        self.rates.get(local).copied().unwrap_or(0.0)
    }

    /// Desorbed share of the He₁ channel at local point `local`; zero for
    /// tables without desorption.
    pub fn desorbed_fraction(&self, local: usize) -> f64 {
        self.desorbed.get(local).copied().unwrap_or(0.0)
    }

    /// Share of channel `m`'s helium loss that becomes `HeV + I`.
    fn mutated_share(&self, m: &Mutation, local: usize) -> f64 {
        if m.desorbs {
            1.0 - self.desorbed_fraction(local)
        } else {
            1.0
        }
    }

    fn desorption_at(&self, temperature: f64) -> f64 {
        self.table
            .helium_desorption(temperature)
            .map_or(0.0, |d| d.fraction)
    }

    /// `k_dis` for the current trapped total, or `None` once the
    /// disappearing rate reaches the cutoff.
    fn attenuation_factor(&self, ctx: &PointContext<'_>) -> Option<f64> {
        match self.attenuation {
            None => Some(1.0),
            Some(strength) => {
                let exponent = strength * ctx.aggregates().trapped_concentration;
                (exponent < self.cutoff).then(|| (-exponent).exp())
            }
        }
    }

    fn channels<'s>(&'s self, ctx: &PointContext<'_>) -> Option<(f64, &'s [usize])> {
        let k_dis = self.attenuation_factor(ctx)?;
        let active = self.active.get(ctx.local())?;
        Some((self.mutation_rate(ctx.local()) * k_dis, active.as_slice()))
    }
}

impl TrapMutationConfig {
    /// Depth/size table.
    pub fn table(mut self, table: TrapMutationTable) -> Self {
        self.table = table;
        self
    }

    /// Points past the surface where mutation may happen.
    pub fn band(mut self, band: SurfaceBand) -> Self {
        self.band = band;
        self
    }

    /// Enable attenuation `k_dis = exp(−strength · trapped_total)`.
    pub fn attenuation(mut self, strength: f64) -> Self {
        self.attenuation = Some(strength);
        self
    }

    /// Mutation stays on while `strength · trapped_total` is below this.
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Build the handler.
    ///
    /// # Errors
    ///
    /// Returns `Err` for an empty band, a negative or non-finite
    /// attenuation strength or cutoff, or a custom row with zero helium.
    pub fn build(self) -> Result<TrapMutationHandler, String> {
        if self.band.is_empty() {
            return Err(format!(
                "trap mutation band {}..={} is empty",
                self.band.start, self.band.end
            ));
        }
        if let Some(s) = self.attenuation {
            if !s.is_finite() || s < 0.0 {
                return Err(format!("attenuation strength must be finite and >= 0, got {s}"));
            }
        }
        if self.cutoff.is_nan() || self.cutoff < 0.0 {
            return Err(format!("cutoff must be >= 0, got {}", self.cutoff));
        }
        if let TrapMutationTable::Custom(rows) = &self.table {
            if let Some(row) = rows.iter().find(|r| r.helium == 0 || !r.depth.is_finite()) {
                return Err(format!("invalid trap mutation row {row:?}"));
            }
        }
        Ok(TrapMutationHandler {
            table: self.table,
            band: self.band,
            attenuation: self.attenuation,
            cutoff: self.cutoff,
            mutations: Vec::new(),
            active: Vec::new(),
            rates: Vec::new(),
            desorbed: Vec::new(),
        })
    }
}

impl PhysicsHandler for TrapMutationHandler {
    fn name(&self) -> &str {
        "trap mutation"
    }

    fn stage(&self) -> Stage {
        Stage::TrapMutation
    }

    fn initialize(
        &mut self,
        setup: &SetupContext<'_>,
        fill: &mut FillMaps,
    ) -> Result<(), HandlerError> {
        let network = setup.network();
        let desorbing = self
            .table
            .helium_desorption(setup.temperature())
            .map(|d| d.helium);
        self.mutations = self
            .table
            .entries(setup.temperature())
            .into_iter()
            .filter(|e| e.vacancies > 0)
            .filter_map(|e| {
                let helium = network.get(Species::He, e.helium)?;
                let bubble = network.get_by_composition(
                    &Composition::pure(Species::He, e.helium).with(Species::V, e.vacancies),
                )?;
                let interstitial = network.get(Species::I, e.vacancies)?;
                Some(Mutation {
                    helium: helium.id().index(),
                    bubble: bubble.id().index(),
                    interstitial: interstitial.id().index(),
                    depth: e.depth,
                    desorbs: desorbing == Some(e.helium),
                })
            })
            .collect();

        for m in &self.mutations {
            fill.dfill.mark(m.helium, m.helium);
            fill.dfill.mark(m.bubble, m.helium);
            fill.dfill.mark(m.interstitial, m.helium);
        }

        let grid = setup.grid();
        let surface = setup.surface();
        self.active = setup
            .owned()
            .iter()
            .map(|point| {
                if !self.band.contains(point, surface) {
                    return Vec::new();
                }
                let depth = grid.depth(point, surface);
                self.mutations
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| depth <= m.depth + DEPTH_TOLERANCE)
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
        let owned = setup.owned().len();
        if self.rates.len() != owned {
            self.rates = (0..owned)
                .map(|local| MUTATION_RATE_FACTOR * network.largest_rate(local))
                .collect();
        }
        self.desorbed = (0..owned)
            .map(|local| self.desorption_at(network.temperature(local)))
            .collect();

        log::debug!(
            "trap mutation: {} channels, active at {} points",
            self.mutations.len(),
            self.active.iter().filter(|a| !a.is_empty()).count()
        );
        Ok(())
    }

    fn refresh_temperature(&mut self, local: usize, temperature: f64, network: &ReactionNetwork) {
        if local >= self.rates.len() {
            self.rates.resize(local + 1, 0.0);
        }
        self.rates[local] = MUTATION_RATE_FACTOR * network.largest_rate(local);
        let fraction = self.desorption_at(temperature);
        if local >= self.desorbed.len() {
            self.desorbed.resize(local + 1, 0.0);
        }
        self.desorbed[local] = fraction;
    }

    fn compute_flux(&self, ctx: &PointContext<'_>, out: &mut [f64]) {
        let Some((k, active)) = self.channels(ctx) else {
            return;
        };
        for m in active.iter().map(|&i| &self.mutations[i]) {
            let rate = k * ctx.mid()[m.helium];
            let mutated = self.mutated_share(m, ctx.local()) * rate;
            // The desorbed remainder leaves the material.
            out[m.helium] -= rate;
            out[m.bubble] += mutated;
            out[m.interstitial] += mutated;
        }
    }

    fn participant_count(&self, ctx: &PointContext<'_>) -> usize {
        self.channels(ctx).map_or(0, |(_, active)| active.len())
    }

    fn partials_shape(&self) -> PartialsShape {
        PartialsShape::new(3, 3)
    }

    /// Rows `(He, HeV, I)`, all in the He column.
    fn compute_partials(
        &self,
        ctx: &PointContext<'_>,
        indices: &mut [usize],
        values: &mut [f64],
    ) -> Result<usize, HandlerError> {
        let Some((k, active)) = self.channels(ctx) else {
            return Ok(0);
        };
        check_buffers(self.name(), self.partials_shape(), active.len(), indices, values)?;
        for (i, m) in active.iter().map(|&i| &self.mutations[i]).enumerate() {
            indices[3 * i..3 * i + 3].copy_from_slice(&[m.helium, m.bubble, m.interstitial]);
            let mutated = self.mutated_share(m, ctx.local()) * k;
            values[3 * i..3 * i + 3].copy_from_slice(&[-k, mutated, mutated]);
        }
        Ok(active.len())
    }

    fn emit_partials(
        &self,
        ctx: &PointContext<'_>,
        indices: &[usize],
        values: &[f64],
        count: usize,
        sink: &mut dyn JacobianSink,
    ) {
        let point = ctx.point() as isize;
        for i in 0..count {
            let col = indices[3 * i];
            for k in 0..3 {
                sink.add(JacobianEntry {
                    row_point: point,
                    row: indices[3 * i + k],
                    col_point: point,
                    col,
                    value: values[3 * i + k],
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn w111_switches_with_temperature() {
        let cold = TrapMutationTable::W111.entries(900.0);
        let hot = TrapMutationTable::W111.entries(1200.0);
        assert_eq!(cold[4].depth, 1.2);
        assert_eq!(hot[4].depth, 1.1);
        assert_eq!(cold[6].vacancies, 2);
        assert_eq!(hot[6].vacancies, 2);
    }

    #[test]
    fn only_w111_desorbs_helium() {
        let d = TrapMutationTable::W111.helium_desorption(1066.4).unwrap();
        assert_eq!((d.helium, d.fraction), (1, 0.61));
        let d = TrapMutationTable::W111.helium_desorption(1066.5).unwrap();
        assert_eq!(d.fraction, 0.35);
        assert_eq!(TrapMutationTable::W100.helium_desorption(500.0), None);
        assert_eq!(TrapMutationTable::Custom(Vec::new()).helium_desorption(500.0), None);
    }

    #[test]
    fn w100_he1_does_not_mutate() {
        let rows = TrapMutationTable::W100.entries(0.0);
        assert_eq!(rows[0].vacancies, 0);
        assert_eq!(rows.len(), 7);
    }

    #[test]
    fn builder_validation() {
        assert!(TrapMutationHandler::builder()
            .band(SurfaceBand::new(3, 1))
            .build()
            .is_err());
        assert!(TrapMutationHandler::builder().attenuation(-1.0).build().is_err());
        assert!(TrapMutationHandler::builder()
            .table(TrapMutationTable::Custom(vec![TrapEntry {
                helium: 0,
                depth: 0.5,
                vacancies: 1
            }]))
            .build()
            .is_err());
        assert!(TrapMutationHandler::builder().attenuation(2.0).cutoff(10.0).build().is_ok());
    }
}
