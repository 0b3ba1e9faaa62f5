//! The per-process orchestrator.
//!
//! [`SolverHandler`] owns the grid, the reaction network and the handler
//! list of one process. Every evaluation walks the owned points in
//! ascending order, skips excluded points, refreshes temperature-
//! dependent rates, and runs the handlers in [`Stage`](spall_handler::Stage)
//! order followed by the network.

use std::mem;
use std::time::Instant;

use spall_core::{JacobianEntry, JacobianSink, Reduction, ReductionError, SparseFill, Species};
use spall_grid::{Grid1D, OwnedRange};
use spall_handler::{
    validate_pipeline, Aggregates, FillMaps, JacobianPass, Location, Neighborhood,
    PartialsScratch, PhysicsHandler, PipelinePlan, PointContext, SetupContext,
};
use spall_handlers::{AdvectionHandler, Handler};
use spall_network::ReactionNetwork;

use crate::checkpoint::Checkpoint;
use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::metrics::EvaluationMetrics;

// ── CountingSink ───────────────────────────────────────────────────

/// Forwards entries to the caller's sink and counts them.
struct CountingSink<'s> {
    inner: &'s mut dyn JacobianSink,
    count: usize,
}

impl JacobianSink for CountingSink<'_> {
    fn add(&mut self, entry: JacobianEntry) {
        self.count += 1;
        self.inner.add(entry);
    }
}

// ── SolverHandler ──────────────────────────────────────────────────

/// Grid-point loop over the network and the physics handlers.
///
/// The state passed to every operation is the process-local layout
/// `(owned.len() + 2) × dof`: one ghost point, the owned points, one
/// ghost point. Ghost values are read, never written. Output buffers
/// hold `owned.len() × dof` values.
///
/// # Examples
///
/// ```
/// use spall_core::{Composition, LocalReduction, Species};
/// use spall_grid::GridSpec;
/// use spall_handlers::DiffusionHandler;
/// use spall_network::{ClusterCatalog, ClusterSpec, NetworkConfig, ReactionNetwork};
/// use spall_solver::{SolverConfig, SolverHandler};
///
/// let catalog = ClusterCatalog::new(
///     0.317,
///     vec![ClusterSpec::new(Composition::pure(Species::He, 1), 6.15, 0.13, 2.95e10)],
/// )
/// .unwrap();
/// let network = ReactionNetwork::build(&catalog, &NetworkConfig::default()).unwrap();
/// let config = SolverConfig {
///     grid: GridSpec::Uniform { points: 8, spacing: 0.5 },
///     ..SolverConfig::default()
/// };
/// let mut solver =
///     SolverHandler::new(config, network, vec![DiffusionHandler::new().into()]).unwrap();
///
/// let mut state = vec![0.0; solver.state_len()];
/// solver.initialize_concentration(&mut state).unwrap();
/// let aggregates = solver.aggregates(&state, &LocalReduction).unwrap();
/// let mut rates = vec![0.0; solver.output_len()];
/// let metrics = solver.compute_rhs(0.0, &state, aggregates, &mut rates).unwrap();
/// assert_eq!(metrics.points_visited, 6);
/// ```
#[derive(Debug)]
pub struct SolverHandler {
    config: SolverConfig,
    grid: Grid1D,
    owned: OwnedRange,
    surface: usize,
    network: ReactionNetwork,
    handlers: Vec<Handler>,
    plan: PipelinePlan,
    fill: FillMaps,
    /// Temperature last applied to each owned point's caches.
    temperatures: Vec<f64>,
    excluded: Vec<bool>,
    scratch: PartialsScratch,
    network_partials: Vec<f64>,
    last: EvaluationMetrics,
}

impl SolverHandler {
    /// Validate `config`, bind `network` to the owned points, and
    /// initialize every handler.
    ///
    /// `handlers` must already be in canonical stage order.
    pub fn new(
        config: SolverConfig,
        mut network: ReactionNetwork,
        handlers: Vec<Handler>,
    ) -> Result<Self, SolverError> {
        config.validate()?;
        let grid = Grid1D::from_spec(&config.grid)?;
        let owned = config
            .owned
            .unwrap_or_else(|| OwnedRange::whole(grid.len()));
        let plan = validate_pipeline(&handlers)?;
        let surface = config.surface;

        let temperatures: Vec<f64> = owned
            .iter()
            .map(|point| config.temperature.initial(&grid, point, surface))
            .collect();
        for (local, &t) in temperatures.iter().enumerate() {
            network.set_temperature(local, t);
        }

        let dof = network.dof();
        let mut fill = FillMaps::new(dof);
        fill.dfill.merge(network.connectivity());
        let widest = plan.widest_shape();

        let mut solver = Self {
            network_partials: vec![0.0; network.partials_layout().len()],
            scratch: PartialsScratch::new(widest.indices, widest.values),
            config,
            grid,
            owned,
            surface,
            network,
            handlers,
            plan,
            fill,
            temperatures,
            excluded: Vec::new(),
            last: EvaluationMetrics::default(),
        };
        solver.excluded = solver.exclusion_mask();
        solver.initialize_handlers(false)?;
        solver.sync_flux_amplitude(0.0);

        let names: Vec<&str> = solver.handlers.iter().map(|h| h.name()).collect();
        log::info!(
            "solver: {} points, owned [{}, {}), surface {}, dof {}, handlers [{}]",
            solver.grid.len(),
            owned.start(),
            owned.end(),
            surface,
            dof,
            names.join(", ")
        );
        Ok(solver)
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// The configuration, with the current surface.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The grid.
    pub fn grid(&self) -> &Grid1D {
        &self.grid
    }

    /// Points owned by this process.
    pub fn owned(&self) -> OwnedRange {
        self.owned
    }

    /// Current surface position.
    pub fn surface(&self) -> usize {
        self.surface
    }

    /// The reaction network.
    pub fn network(&self) -> &ReactionNetwork {
        &self.network
    }

    /// Handlers in evaluation order.
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Jacobian pass membership.
    pub fn plan(&self) -> &PipelinePlan {
        &self.plan
    }

    /// Values per grid point.
    pub fn dof(&self) -> usize {
        self.network.dof()
    }

    /// Required length of the ghost-padded state.
    pub fn state_len(&self) -> usize {
        (self.owned.len() + 2) * self.dof()
    }

    /// Required length of the rate output.
    pub fn output_len(&self) -> usize {
        self.owned.len() * self.dof()
    }

    /// Whether the handlers skip global point `point`. Points outside the
    /// owned range are reported as excluded.
    pub fn is_excluded(&self, point: usize) -> bool {
        self.owned
            .local(point)
            .map_or(true, |local| self.excluded[local])
    }

    /// Temperature last applied at owned point `point`.
    pub fn temperature(&self, point: usize) -> Option<f64> {
        self.owned.local(point).map(|local| self.temperatures[local])
    }

    /// Metrics of the most recent evaluation.
    pub fn last_metrics(&self) -> &EvaluationMetrics {
        &self.last
    }

    // ── Fill maps ──────────────────────────────────────────────────

    /// Cross-point and intra-point sparsity patterns.
    pub fn fill_maps(&self) -> &FillMaps {
        &self.fill
    }

    /// Cross-point pattern in compressed-row form.
    pub fn ofill_csr(&self) -> SparseFill {
        self.fill.ofill.to_sparse()
    }

    /// Intra-point pattern in compressed-row form.
    pub fn dfill_csr(&self) -> SparseFill {
        self.fill.dfill.to_sparse()
    }

    // ── Setup ──────────────────────────────────────────────────────

    fn exclusion_mask(&self) -> Vec<bool> {
        self.owned
            .iter()
            .map(|point| self.config.is_excluded(point, self.surface))
            .collect()
    }

    /// Build participant lists. With `surface_only`, only handlers whose
    /// participants depend on the surface are rebuilt; the diffusion
    /// mask is always rebuilt.
    fn initialize_handlers(&mut self, surface_only: bool) -> Result<(), SolverError> {
        let setup = SetupContext::new(
            &self.network,
            &self.grid,
            self.owned,
            self.surface,
            self.config.temperature.setup_temperature(),
        );
        let mut fill = FillMaps::new(self.network.dof());
        for h in self
            .handlers
            .iter_mut()
            .filter(|h| !surface_only || h.tracks_surface())
        {
            h.initialize(&setup, &mut fill)?;
        }

        let advection: Vec<AdvectionHandler> = self
            .handlers
            .iter()
            .filter_map(Handler::as_advection)
            .cloned()
            .collect();
        for h in &mut self.handlers {
            if let Some(diffusion) = h.as_diffusion_mut() {
                diffusion.initialize_diffusion_grid(&advection, &setup);
            }
        }

        self.fill.ofill.merge(&fill.ofill);
        self.fill.dfill.merge(&fill.dfill);
        Ok(())
    }

    /// Re-solution scales with the implantation flux at `time`.
    fn sync_flux_amplitude(&mut self, time: f64) {
        let Some(amplitude) = self
            .handlers
            .iter()
            .find_map(Handler::as_incident_flux)
            .map(|f| f.flux_amplitude_at(time))
        else {
            return;
        };
        for h in &mut self.handlers {
            if let Some(resolution) = h.as_resolution_mut() {
                resolution.set_flux_amplitude(amplitude);
            }
        }
    }

    // ── Per-point helpers ──────────────────────────────────────────

    fn check_state(&self, state: &[f64]) -> Result<(), SolverError> {
        let expected = self.state_len();
        if state.len() == expected {
            Ok(())
        } else {
            Err(SolverError::BufferLength {
                buffer: "state",
                expected,
                actual: state.len(),
            })
        }
    }

    /// Recompute every cached rate of `local` at `temperature`.
    fn apply_temperature(&mut self, local: usize, temperature: f64) {
        self.network.set_temperature(local, temperature);
        for h in &mut self.handlers {
            h.refresh_temperature(local, temperature, &self.network);
        }
        self.temperatures[local] = temperature;
    }

    /// Skip excluded points, and refresh the temperature of the others
    /// if it moved beyond tolerance. Returns `false` for skipped points.
    fn enter_point(
        &mut self,
        local: usize,
        time: f64,
        state: &[f64],
        metrics: &mut EvaluationMetrics,
    ) -> bool {
        if self.excluded[local] {
            metrics.points_skipped += 1;
            return false;
        }
        let dof = self.network.dof();
        let point = self.owned.start() + local;
        let held = state[(local + 2) * dof - 1];
        let t = self
            .config
            .temperature
            .at(&self.grid, point, self.surface, time, held);
        if (t - self.temperatures[local]).abs() > self.config.temperature_tolerance {
            log::debug!(
                "point {point}: temperature {} -> {t} K",
                self.temperatures[local]
            );
            self.apply_temperature(local, t);
            metrics.temperature_refreshes += 1;
        }
        metrics.points_visited += 1;
        true
    }

    fn point_context<'a>(
        &'a self,
        local: usize,
        time: f64,
        state: &'a [f64],
        aggregates: Aggregates,
    ) -> PointContext<'a> {
        let dof = self.network.dof();
        let point = self.owned.start() + local;
        let neighborhood = Neighborhood {
            left: &state[local * dof..(local + 1) * dof],
            mid: &state[(local + 1) * dof..(local + 2) * dof],
            right: &state[(local + 2) * dof..(local + 3) * dof],
        };
        let location = Location {
            point,
            local,
            position: self.grid.position(point),
            depth: self.grid.depth(point, self.surface),
            surface: self.surface,
            steps: self.grid.step_sizes(point),
        };
        PointContext::new(
            self.network.bind(neighborhood.mid, local),
            neighborhood,
            location,
            time,
            aggregates,
        )
    }

    // ── Evaluation ─────────────────────────────────────────────────

    /// Sum the network-wide trapped-atom concentration over points at
    /// most `near_surface_depth` below the surface, weighted by the
    /// spacing to the next point, then reduce it across processes.
    pub fn aggregates<R: Reduction + ?Sized>(
        &self,
        state: &[f64],
        reduction: &R,
    ) -> Result<Aggregates, SolverError> {
        self.check_state(state)?;
        let dof = self.network.dof();
        let mut local_sum = 0.0;
        for (local, point) in self.owned.iter().enumerate() {
            if point < self.surface {
                continue;
            }
            if self.grid.depth(point, self.surface) > self.config.near_surface_depth {
                break;
            }
            let mid = &state[(local + 1) * dof..(local + 2) * dof];
            let trapped = self
                .network
                .bind(mid, local)
                .total_trapped_atom_concentration();
            local_sum += trapped * self.grid.step_sizes(point).right;
        }
        let total = reduction.all_reduce_sum(local_sum)?;
        if !total.is_finite() {
            return Err(ReductionError::NonFinite { value: total }.into());
        }
        Ok(Aggregates {
            trapped_concentration: total,
        })
    }

    /// Write the rate of change of every owned value into `out`.
    ///
    /// Excluded points are left at zero. Handlers run in stage order
    /// (incident flux, diffusion, advection, trap mutation, re-solution,
    /// desorption) and the network runs last.
    pub fn compute_rhs(
        &mut self,
        time: f64,
        state: &[f64],
        aggregates: Aggregates,
        out: &mut [f64],
    ) -> Result<EvaluationMetrics, SolverError> {
        let start = Instant::now();
        self.check_state(state)?;
        let dof = self.network.dof();
        let expected = self.output_len();
        if out.len() != expected {
            return Err(SolverError::BufferLength {
                buffer: "output",
                expected,
                actual: out.len(),
            });
        }
        out.fill(0.0);
        self.sync_flux_amplitude(time);

        let mut metrics = EvaluationMetrics::default();
        for local in 0..self.owned.len() {
            if !self.enter_point(local, time, state, &mut metrics) {
                continue;
            }
            let ctx = self.point_context(local, time, state, aggregates);
            let rates = &mut out[local * dof..(local + 1) * dof];
            for h in &self.handlers {
                h.compute_flux(&ctx, rates);
            }
            ctx.network().compute_all_fluxes(rates);
        }

        metrics.elapsed_us = start.elapsed().as_micros() as u64;
        self.last = metrics.clone();
        Ok(metrics)
    }

    /// Stream the cross-point (transport) Jacobian entries into `sink`.
    pub fn compute_off_diagonal_jacobian(
        &mut self,
        time: f64,
        state: &[f64],
        aggregates: Aggregates,
        sink: &mut dyn JacobianSink,
    ) -> Result<EvaluationMetrics, SolverError> {
        self.jacobian(JacobianPass::OffDiagonal, time, state, aggregates, sink)
    }

    /// Stream the intra-point Jacobian entries (network first, then the
    /// boundary handlers) into `sink`.
    pub fn compute_diagonal_jacobian(
        &mut self,
        time: f64,
        state: &[f64],
        aggregates: Aggregates,
        sink: &mut dyn JacobianSink,
    ) -> Result<EvaluationMetrics, SolverError> {
        self.jacobian(JacobianPass::Diagonal, time, state, aggregates, sink)
    }

    fn jacobian(
        &mut self,
        pass: JacobianPass,
        time: f64,
        state: &[f64],
        aggregates: Aggregates,
        sink: &mut dyn JacobianSink,
    ) -> Result<EvaluationMetrics, SolverError> {
        let start = Instant::now();
        self.check_state(state)?;
        self.sync_flux_amplitude(time);

        let mut metrics = EvaluationMetrics::default();
        let mut scratch = mem::take(&mut self.scratch);
        let mut partials = mem::take(&mut self.network_partials);
        let mut counting = CountingSink {
            inner: sink,
            count: 0,
        };
        let result = self.jacobian_points(
            pass,
            time,
            state,
            aggregates,
            &mut scratch,
            &mut partials,
            &mut counting,
            &mut metrics,
        );
        self.scratch = scratch;
        self.network_partials = partials;
        result?;

        metrics.partial_entries = counting.count;
        metrics.elapsed_us = start.elapsed().as_micros() as u64;
        self.last = metrics.clone();
        Ok(metrics)
    }

    #[allow(clippy::too_many_arguments)]
    fn jacobian_points(
        &mut self,
        pass: JacobianPass,
        time: f64,
        state: &[f64],
        aggregates: Aggregates,
        scratch: &mut PartialsScratch,
        partials: &mut [f64],
        sink: &mut CountingSink<'_>,
        metrics: &mut EvaluationMetrics,
    ) -> Result<(), SolverError> {
        let dof = self.network.dof();
        for local in 0..self.owned.len() {
            if !self.enter_point(local, time, state, metrics) {
                continue;
            }
            let ctx = self.point_context(local, time, state, aggregates);

            if pass == JacobianPass::Diagonal {
                ctx.network().compute_all_partials(partials)?;
                let layout = self.network.partials_layout();
                let point = ctx.point() as isize;
                for row in 0..dof {
                    let offset = layout.offsets()[row];
                    for (k, &col) in layout.row(row).iter().enumerate() {
                        sink.add(JacobianEntry {
                            row_point: point,
                            row,
                            col_point: point,
                            col,
                            value: partials[offset + k],
                        });
                    }
                }
            }

            for &i in self.plan.pass(pass) {
                let h = &self.handlers[i];
                let n = h.participant_count(&ctx);
                if n == 0 {
                    continue;
                }
                let (indices, values) = scratch.prepare(h.partials_shape(), n);
                let count = h.compute_partials(&ctx, indices, values)?;
                h.emit_partials(&ctx, indices, values, count, sink);
            }
        }
        Ok(())
    }

    // ── State management ───────────────────────────────────────────

    /// Initial conditions: zero everywhere, the configured V₁
    /// concentration at active points, and the initial temperature in
    /// the last slot. Ghost points are left untouched.
    pub fn initialize_concentration(&self, state: &mut [f64]) -> Result<(), SolverError> {
        self.check_state(state)?;
        let dof = self.network.dof();
        let vacancy = self.network.get(Species::V, 1).map(|c| c.id().index());
        for (local, point) in self.owned.iter().enumerate() {
            let values = &mut state[(local + 1) * dof..(local + 2) * dof];
            values.fill(0.0);
            if let Some(v) = vacancy {
                if !self.excluded[local] {
                    values[v] = self.config.initial_vacancy_concentration;
                }
            }
            values[dof - 1] = self
                .config
                .temperature
                .initial(&self.grid, point, self.surface);
        }
        Ok(())
    }

    /// Move the tracked surface and rebuild everything that depends on
    /// it: the excluded points, the surface-tracking handlers'
    /// participants, and the diffusion mask.
    pub fn set_surface(&mut self, surface: usize) -> Result<(), SolverError> {
        self.config.check_surface(surface)?;
        if surface == self.surface {
            return Ok(());
        }
        log::debug!(
            "surface moved from {} to {surface}; rebuilding participants",
            self.surface
        );
        self.surface = surface;
        self.config.surface = surface;
        self.excluded = self.exclusion_mask();
        self.initialize_handlers(true)
    }

    /// Load `checkpoint` into the owned points of `state` and rebind the
    /// network temperatures of the active points to the saved ones.
    ///
    /// Moves the surface first if the checkpoint's differs. Nothing is
    /// written unless the whole checkpoint fits.
    pub fn restore(
        &mut self,
        checkpoint: &Checkpoint,
        state: &mut [f64],
    ) -> Result<(), SolverError> {
        self.check_state(state)?;
        if checkpoint.points.len() != self.grid.len() {
            return Err(SolverError::Checkpoint {
                reason: format!(
                    "{} points saved for a grid of {}",
                    checkpoint.points.len(),
                    self.grid.len()
                ),
            });
        }
        let dof = self.network.dof();
        let temperature_slot = dof - 1;
        for point in self.owned.iter() {
            let saved = &checkpoint.points[point];
            if !saved.temperature.is_finite() || saved.temperature <= 0.0 {
                return Err(SolverError::Checkpoint {
                    reason: format!("point {point}: temperature {}", saved.temperature),
                });
            }
            if let Some(&(slot, _)) = saved
                .concentrations
                .iter()
                .find(|(slot, _)| *slot >= temperature_slot)
            {
                return Err(SolverError::Checkpoint {
                    reason: format!("point {point}: slot {slot} is not a cluster slot"),
                });
            }
        }

        if checkpoint.surface != self.surface {
            log::warn!(
                "checkpoint surface {} differs from current {}",
                checkpoint.surface,
                self.surface
            );
            self.set_surface(checkpoint.surface)?;
        }

        for (local, point) in self.owned.iter().enumerate() {
            let saved = &checkpoint.points[point];
            let values = &mut state[(local + 1) * dof..(local + 2) * dof];
            values.fill(0.0);
            for &(slot, c) in &saved.concentrations {
                values[slot] = c;
            }
            values[temperature_slot] = saved.temperature;
            if !self.excluded[local] {
                self.apply_temperature(local, saved.temperature);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spall_core::{Composition, LocalReduction};
    use spall_grid::GridSpec;
    use spall_handlers::DiffusionHandler;
    use spall_network::{ClusterCatalog, ClusterSpec, NetworkConfig};

    fn helium_network() -> ReactionNetwork {
        let catalog = ClusterCatalog::new(
            0.317,
            vec![
                ClusterSpec::new(Composition::pure(Species::He, 1), 6.15, 0.13, 2.95e10),
                ClusterSpec::new(Composition::pure(Species::He, 2), 11.44, 0.2, 3.24e10),
            ],
        )
        .unwrap();
        ReactionNetwork::build(&catalog, &NetworkConfig::default()).unwrap()
    }

    fn solver(points: usize) -> SolverHandler {
        let config = SolverConfig {
            grid: GridSpec::Uniform {
                points,
                spacing: 1.0,
            },
            ..SolverConfig::default()
        };
        SolverHandler::new(config, helium_network(), vec![DiffusionHandler::new().into()])
            .unwrap()
    }

    #[test]
    fn buffer_lengths_are_checked() {
        let mut s = solver(6);
        assert_eq!(s.state_len(), 8 * 3);
        assert_eq!(s.output_len(), 6 * 3);
        let state = vec![0.0; 5];
        let mut out = vec![0.0; s.output_len()];
        assert!(matches!(
            s.compute_rhs(0.0, &state, Aggregates::default(), &mut out),
            Err(SolverError::BufferLength { buffer: "state", .. })
        ));
        let state = vec![0.0; s.state_len()];
        let mut out = vec![0.0; 2];
        assert!(matches!(
            s.compute_rhs(0.0, &state, Aggregates::default(), &mut out),
            Err(SolverError::BufferLength { buffer: "output", .. })
        ));
    }

    #[test]
    fn exclusions_follow_offsets() {
        let s = solver(6);
        let active: Vec<usize> = (0..6).filter(|&p| !s.is_excluded(p)).collect();
        assert_eq!(active, vec![1, 2, 3, 4]);
        assert!(s.is_excluded(17));
    }

    #[test]
    fn aggregates_without_traps_are_zero() {
        let s = solver(6);
        let mut state = vec![0.0; s.state_len()];
        s.initialize_concentration(&mut state).unwrap();
        let a = s.aggregates(&state, &LocalReduction).unwrap();
        assert_eq!(a.trapped_concentration, 0.0);
    }

    #[test]
    fn fill_maps_export() {
        let s = solver(4);
        let ofill = s.ofill_csr();
        assert_eq!(ofill.row_ptr.len(), s.dof() + 1);
        // Diffusion marks both helium diagonals.
        assert_eq!(ofill.cols, vec![0, 1]);
        assert!(s.fill_maps().dfill.is_marked(1, 0));
    }
}
