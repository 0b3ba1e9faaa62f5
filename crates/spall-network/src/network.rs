//! The assembled reaction network and its per-point bound view.

use crate::catalog::ClusterCatalog;
use crate::cluster::Cluster;
use crate::grouping::{self, GroupingConfig, Placement};
use crate::layout::PartialsLayout;
use crate::reaction::{
    DissociationReaction, DissociationTerm, Factor, ProductionReaction, ProductionTerm, Reactant,
};
use crate::reaction_index::ReactionIndex;
use crate::super_cluster::{Member, SuperCluster};
use indexmap::IndexMap;
use spall_core::{
    ClusterId, Composition, FillMap, GroupId, HandlerError, NetworkError, Species,
};

// ── Configuration ───────────────────────────────────────────────

/// Linear loss of pure vacancy and interstitial clusters to a
/// dislocation network: `−bias·S·D·c`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DislocationSink {
    /// Sink strength S (nm⁻²).
    pub strength: f64,
    /// Extra capture bias applied to interstitials (vacancies use 1).
    pub interstitial_bias: f64,
}

/// Options applied when building a [`ReactionNetwork`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkConfig {
    /// Super-cluster grouping; `None` keeps every cluster resolved.
    pub grouping: Option<GroupingConfig>,
    /// Optional dislocation sink.
    pub dislocation_sink: Option<DislocationSink>,
}

impl NetworkConfig {
    /// Check option ranges.
    pub fn validate(&self) -> Result<(), NetworkError> {
        if let Some(g) = &self.grouping {
            g.validate()?;
        }
        if let Some(sink) = &self.dislocation_sink {
            if !sink.strength.is_finite() || sink.strength < 0.0 {
                return Err(NetworkError::InvalidOption {
                    reason: format!(
                        "dislocation sink strength must be finite and >= 0, got {}",
                        sink.strength
                    ),
                });
            }
            if !sink.interstitial_bias.is_finite() || sink.interstitial_bias < 0.0 {
                return Err(NetworkError::InvalidOption {
                    reason: format!(
                        "interstitial bias must be finite and >= 0, got {}",
                        sink.interstitial_bias
                    ),
                });
            }
        }
        Ok(())
    }
}

// ── Network ─────────────────────────────────────────────────────

/// Temperature-dependent state of one grid point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct PointState {
    temperature: f64,
    largest_rate: f64,
}

#[derive(Clone, Copy, Debug)]
struct SinkTerm {
    cluster: ClusterId,
    coefficient: f64,
    position: usize,
}

/// A cluster reaction network over one process's grid points.
///
/// Slots per grid point are laid out as normal clusters, then group
/// base slots, then group moment slots, then temperature. Coefficient
/// tables are cached per local grid point and refreshed by
/// [`set_temperature`](Self::set_temperature).
#[derive(Clone, Debug)]
pub struct ReactionNetwork {
    lattice_parameter: f64,
    atomic_volume: f64,
    clusters: Vec<Cluster>,
    groups: Vec<SuperCluster>,
    lookup: IndexMap<Composition, Reactant>,
    productions: Vec<ProductionReaction>,
    dissociations: Vec<DissociationReaction>,
    sinks: Vec<SinkTerm>,
    connectivity: FillMap,
    layout: PartialsLayout,
    points: Vec<PointState>,
}

impl ReactionNetwork {
    /// Build a network from a catalog.
    ///
    /// Enumerates every member-level pairing, groups clusters as
    /// configured, folds pairings onto their representatives and lays
    /// out the partial derivatives. No grid point is allocated yet; see
    /// [`add_grid_points`](Self::add_grid_points).
    pub fn build(catalog: &ClusterCatalog, config: &NetworkConfig) -> Result<Self, NetworkError> {
        config.validate()?;
        let a = catalog.lattice_parameter();
        let entries = catalog.entries();
        let partition = grouping::partition(catalog, config.grouping.as_ref())?;

        let n_normal = partition.normal.len();
        let n_groups = partition.bins.len();
        let dof = n_normal + 2 * n_groups + 1;

        let clusters: Vec<Cluster> = partition
            .normal
            .iter()
            .enumerate()
            .map(|(k, &i)| Cluster::new(ClusterId(k as u32), &entries[i], a))
            .collect();

        let groups: Vec<SuperCluster> = partition
            .bins
            .iter()
            .enumerate()
            .map(|(g, bin)| {
                let members = bin
                    .members
                    .iter()
                    .map(|&i| Member {
                        composition: entries[i].composition,
                        size: entries[i].composition.size(),
                        distance: 0.0,
                        kinetics: entries[i].kinetics(a),
                    })
                    .collect();
                SuperCluster::new(
                    GroupId(g as u32),
                    ClusterId((n_normal + g) as u32),
                    n_normal + n_groups + g,
                    bin.species,
                    (bin.low, bin.high),
                    members,
                )
            })
            .collect();

        // Representative, factor and distance of every catalog entry.
        let resolve = |i: usize| -> (Reactant, Factor, f64) {
            match partition.placement[i] {
                Placement::Normal(id) => (Reactant::Cluster(id), Factor::cluster(id), 0.0),
                Placement::Grouped(g) => {
                    let group = &groups[g.index()];
                    let factor = Factor {
                        base: group.base_slot().index(),
                        moment: Some(group.moment_slot()),
                        n_tot: group.n_tot(),
                        dispersion: group.dispersion(),
                    };
                    let distance = group.distance(entries[i].composition.size());
                    (Reactant::Group(g), factor, distance)
                }
            }
        };

        let mut lookup = IndexMap::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            lookup.insert(e.composition, resolve(i).0);
        }

        let index = ReactionIndex::build(catalog);
        let kinetics: Vec<_> = entries.iter().map(|e| e.kinetics(a)).collect();

        let mut productions: IndexMap<(Reactant, Reactant, Option<Reactant>), ProductionReaction> =
            IndexMap::new();
        for pairing in index.productions() {
            let (mut i, mut j) = (pairing.first, pairing.second);
            if resolve(j).0 < resolve(i).0 {
                std::mem::swap(&mut i, &mut j);
            }
            let (ra, fa, da) = resolve(i);
            let (rb, fb, db) = resolve(j);
            let product = pairing.product.map(resolve);
            let key = (ra, rb, product.map(|p| p.0));
            productions
                .entry(key)
                .or_insert_with(|| {
                    ProductionReaction::new((ra, fa), (rb, fb), product.map(|(r, f, _)| (r, f)))
                })
                .push_term(ProductionTerm {
                    first: kinetics[i],
                    second: kinetics[j],
                    distance: [da, db, product.map_or(0.0, |p| p.2)],
                });
        }

        let mut dissociations: IndexMap<(Reactant, Reactant, Reactant), DissociationReaction> =
            IndexMap::new();
        for pairing in index.dissociations() {
            let (rp, fp, dp) = resolve(pairing.parent);
            let (re, fe, de) = resolve(pairing.emitted);
            let (rr, fr, dr) = resolve(pairing.remainder);
            let binding_energy = entries[pairing.emitted].formation_energy
                + entries[pairing.remainder].formation_energy
                - entries[pairing.parent].formation_energy;
            dissociations
                .entry((rp, re, rr))
                .or_insert_with(|| DissociationReaction::new((rp, fp), (re, fe), (rr, fr)))
                .push_term(DissociationTerm {
                    emitted: kinetics[pairing.emitted],
                    remainder: kinetics[pairing.remainder],
                    binding_energy,
                    distance: [dp, de, dr],
                });
        }

        let mut sinks = Vec::new();
        if let Some(sink) = &config.dislocation_sink {
            for c in &clusters {
                if !c.is_mobile() {
                    continue;
                }
                let bias = match c.composition().pure_species() {
                    Some(Species::V) => 1.0,
                    Some(Species::I) => sink.interstitial_bias,
                    _ => continue,
                };
                sinks.push(SinkTerm {
                    cluster: c.id(),
                    coefficient: bias * sink.strength,
                    position: 0,
                });
            }
        }

        let mut productions: Vec<_> = productions.into_values().collect();
        let mut dissociations: Vec<_> = dissociations.into_values().collect();

        let mut connectivity = FillMap::new(dof);
        for r in &productions {
            r.mark(&mut connectivity);
        }
        for r in &dissociations {
            r.mark(&mut connectivity);
        }
        for s in &sinks {
            connectivity.mark(s.cluster.index(), s.cluster.index());
        }
        let layout = PartialsLayout::from_fill(&connectivity);
        for r in &mut productions {
            r.locate(&layout)?;
        }
        for r in &mut dissociations {
            r.locate(&layout)?;
        }
        for s in &mut sinks {
            let slot = s.cluster.index();
            s.position = layout
                .position(slot, slot)
                .ok_or(NetworkError::LayoutMismatch { row: slot, col: slot })?;
        }

        log::info!(
            "built reaction network: {} clusters, {} groups, {} productions, {} dissociations, dof {}",
            clusters.len(),
            groups.len(),
            productions.len(),
            dissociations.len(),
            dof
        );
        if index.dropped() > 0 {
            log::debug!(
                "{} pairings dropped: product outside the catalog",
                index.dropped()
            );
        }

        Ok(Self {
            lattice_parameter: a,
            atomic_volume: catalog.atomic_volume(),
            clusters,
            groups,
            lookup,
            productions,
            dissociations,
            sinks,
            connectivity,
            layout,
            points: Vec::new(),
        })
    }

    // ── Shape ───────────────────────────────────────────────────

    /// Degrees of freedom per grid point, temperature included.
    pub fn dof(&self) -> usize {
        self.clusters.len() + 2 * self.groups.len() + 1
    }

    /// Slot holding the local temperature (always the last).
    pub fn temperature_slot(&self) -> usize {
        self.dof() - 1
    }

    /// Number of individually resolved clusters.
    pub fn normal_count(&self) -> usize {
        self.clusters.len()
    }

    /// Normal clusters in slot order.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Super-cluster groups in size order.
    pub fn groups(&self) -> &[SuperCluster] {
        &self.groups
    }

    /// Normal cluster by id.
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(id.index())
    }

    /// Group by id.
    pub fn group(&self, id: GroupId) -> Option<&SuperCluster> {
        self.groups.get(id.index())
    }

    /// Host lattice parameter (nm).
    pub fn lattice_parameter(&self) -> f64 {
        self.lattice_parameter
    }

    /// Atomic volume Ω (nm³).
    pub fn atomic_volume(&self) -> f64 {
        self.atomic_volume
    }

    // ── Lookup ──────────────────────────────────────────────────

    /// Normal pure cluster of `species` with `size` units.
    pub fn get(&self, species: Species, size: u32) -> Option<&Cluster> {
        self.get_by_composition(&Composition::pure(species, size))
    }

    /// Normal cluster of exactly `composition`.
    pub fn get_by_composition(&self, composition: &Composition) -> Option<&Cluster> {
        match self.lookup.get(composition)? {
            Reactant::Cluster(id) => self.clusters.get(id.index()),
            Reactant::Group(_) => None,
        }
    }

    /// Representative of `composition`, whether normal or grouped.
    pub fn find_reactant(&self, composition: &Composition) -> Option<Reactant> {
        self.lookup.get(composition).copied()
    }

    /// Base slot of a representative.
    pub fn base_slot(&self, reactant: Reactant) -> usize {
        match reactant {
            Reactant::Cluster(id) => id.index(),
            Reactant::Group(g) => self.clusters.len() + g.index(),
        }
    }

    /// Moment slot of a representative; `None` for normal clusters.
    pub fn moment_slot(&self, reactant: Reactant) -> Option<usize> {
        match reactant {
            Reactant::Cluster(_) => None,
            Reactant::Group(g) => Some(self.clusters.len() + self.groups.len() + g.index()),
        }
    }

    // ── Reactions ───────────────────────────────────────────────

    /// Effective productions.
    pub fn productions(&self) -> &[ProductionReaction] {
        &self.productions
    }

    /// Effective dissociations.
    pub fn dissociations(&self) -> &[DissociationReaction] {
        &self.dissociations
    }

    /// Intra-point sparsity of the network's partials.
    pub fn connectivity(&self) -> &FillMap {
        &self.connectivity
    }

    /// Flat layout of [`BoundNetwork::compute_all_partials`] output.
    pub fn partials_layout(&self) -> &PartialsLayout {
        &self.layout
    }

    // ── Per-point state ─────────────────────────────────────────

    /// Number of grid points with allocated caches.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Append `n` grid points with zeroed caches.
    pub fn add_grid_points(&mut self, n: usize) {
        let total = self.points.len() + n;
        self.points.resize(total, PointState::default());
        for c in &mut self.clusters {
            c.resize(total);
        }
        for r in &mut self.productions {
            r.resize(total);
        }
        for r in &mut self.dissociations {
            r.resize(total);
        }
    }

    /// Refresh every temperature-dependent cache of `point`.
    ///
    /// Grows the caches if `point` lies past the allocated range.
    pub fn set_temperature(&mut self, point: usize, temperature: f64) {
        if point >= self.points.len() {
            self.add_grid_points(point + 1 - self.points.len());
        }
        for c in &mut self.clusters {
            c.update_temperature(point, temperature);
        }
        let mut largest = 0.0f64;
        for r in &mut self.productions {
            largest = largest.max(r.update(point, temperature));
        }
        for r in &mut self.dissociations {
            largest = largest.max(r.update(point, temperature, self.atomic_volume));
        }
        self.points[point] = PointState {
            temperature,
            largest_rate: largest,
        };
    }

    /// Temperature last set at `point` (0 if never set).
    pub fn temperature(&self, point: usize) -> f64 {
        self.points.get(point).map_or(0.0, |p| p.temperature)
    }

    /// Largest member-level rate at `point`.
    pub fn largest_rate(&self, point: usize) -> f64 {
        self.points.get(point).map_or(0.0, |p| p.largest_rate)
    }

    /// Cached diffusion coefficient of `slot` at `point`; zero for group
    /// slots and temperature.
    pub fn diffusion_coefficient(&self, slot: usize, point: usize) -> f64 {
        self.clusters
            .get(slot)
            .map_or(0.0, |c| c.diffusion_coefficient(point))
    }

    /// View the network at `point` over its concentration slice.
    ///
    /// `concs` must hold [`dof`](Self::dof) values.
    pub fn bind<'a>(&'a self, concs: &'a [f64], point: usize) -> BoundNetwork<'a> {
        debug_assert_eq!(concs.len(), self.dof());
        BoundNetwork {
            network: self,
            concs,
            point,
        }
    }
}

// ── Bound view ──────────────────────────────────────────────────

/// A network bound to one grid point's concentrations.
#[derive(Clone, Copy, Debug)]
pub struct BoundNetwork<'a> {
    network: &'a ReactionNetwork,
    concs: &'a [f64],
    point: usize,
}

impl<'a> BoundNetwork<'a> {
    /// The underlying network.
    pub fn network(&self) -> &'a ReactionNetwork {
        self.network
    }

    /// Bound local grid point.
    pub fn point(&self) -> usize {
        self.point
    }

    /// Bound concentration slice.
    pub fn concentrations(&self) -> &'a [f64] {
        self.concs
    }

    /// Value of `slot` at the bound point.
    pub fn concentration(&self, slot: usize) -> f64 {
        self.concs.get(slot).copied().unwrap_or(0.0)
    }

    /// Temperature of the bound point.
    pub fn temperature(&self) -> f64 {
        self.network.temperature(self.point)
    }

    /// Largest member-level rate at the bound point.
    pub fn largest_rate(&self) -> f64 {
        self.network.largest_rate(self.point)
    }

    /// Diffusion coefficient of `slot` at the bound point.
    pub fn diffusion_coefficient(&self, slot: usize) -> f64 {
        self.network.diffusion_coefficient(slot, self.point)
    }

    /// Accumulate every reaction's rate of change into `out`.
    pub fn compute_all_fluxes(&self, out: &mut [f64]) {
        let net = self.network;
        for r in &net.productions {
            r.flux(self.point, self.concs, out);
        }
        for r in &net.dissociations {
            r.flux(self.point, self.concs, out);
        }
        for s in &net.sinks {
            let slot = s.cluster.index();
            let d = net.diffusion_coefficient(slot, self.point);
            out[slot] -= s.coefficient * d * self.concs[slot];
        }
    }

    /// Write every partial derivative into `vals` following
    /// [`ReactionNetwork::partials_layout`].
    ///
    /// The first `layout.len()` values are overwritten.
    pub fn compute_all_partials(&self, vals: &mut [f64]) -> Result<(), HandlerError> {
        let net = self.network;
        let required = net.layout.len();
        if vals.len() < required {
            return Err(HandlerError::BufferTooSmall {
                handler: "reaction network".into(),
                required,
                provided: vals.len(),
            });
        }
        vals[..required].fill(0.0);
        for r in &net.productions {
            r.partials(self.point, self.concs, vals);
        }
        for r in &net.dissociations {
            r.partials(self.point, vals);
        }
        for s in &net.sinks {
            let d = net.diffusion_coefficient(s.cluster.index(), self.point);
            vals[s.position] -= s.coefficient * d;
        }
        Ok(())
    }

    /// Number concentration of clusters containing `species`.
    pub fn total_concentration(&self, species: Species) -> f64 {
        let net = self.network;
        let normal: f64 = net
            .clusters
            .iter()
            .filter(|c| c.composition().count(species) > 0)
            .map(|c| self.concs[c.id().index()])
            .sum();
        let grouped: f64 = net
            .groups
            .iter()
            .filter(|g| g.species() == species)
            .map(|g| g.total_concentration(self.concs))
            .sum();
        normal + grouped
    }

    /// Concentration of `species` units held in all clusters.
    pub fn total_atom_concentration(&self, species: Species) -> f64 {
        let net = self.network;
        let normal: f64 = net
            .clusters
            .iter()
            .map(|c| f64::from(c.composition().count(species)) * self.concs[c.id().index()])
            .sum();
        let grouped: f64 = net
            .groups
            .iter()
            .filter(|g| g.species() == species)
            .map(|g| g.total_atom_concentration(self.concs))
            .sum();
        normal + grouped
    }

    /// Gas atoms held in vacancy-bearing clusters.
    pub fn total_trapped_atom_concentration(&self) -> f64 {
        self.network
            .clusters
            .iter()
            .filter(|c| c.composition().count(Species::V) > 0)
            .map(|c| f64::from(c.composition().atoms()) * self.concs[c.id().index()])
            .sum()
    }
}
