//! Fickian diffusion on a non-uniform 1D grid.
//!
//! Three-point stencil with left and right steps `h_L`, `h_R`:
//!
//! ```text
//! flux = D·2·(c_L + (h_L/h_R)·c_R − (1 + h_L/h_R)·c_M) / (h_L·(h_L + h_R))
//! ```
//!
//! Clusters advected onto a grain-boundary sink stop diffusing at the
//! sink point; [`DiffusionHandler::initialize_diffusion_grid`] builds
//! that mask from the advection handlers.

use crate::advection::AdvectionHandler;
use spall_core::constants::is_immobile;
use spall_core::{HandlerError, JacobianEntry, JacobianSink, SlotSet};
use spall_grid::StepSizes;
use spall_handler::{
    check_buffers, FillMaps, PartialsShape, PhysicsHandler, PointContext, SetupContext, Stage,
};

/// Diffusion of every mobile normal cluster.
#[derive(Clone, Debug, Default)]
pub struct DiffusionHandler {
    participants: Vec<usize>,
    /// Per local point, the slots whose diffusion is switched off.
    mask: Vec<SlotSet>,
}

impl DiffusionHandler {
    /// Create an uninitialized handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slots of the diffusing clusters.
    pub fn participants(&self) -> &[usize] {
        &self.participants
    }

    /// Switch off diffusion of every cluster advected onto a sink, at
    /// the owned points whose control volume holds that sink.
    ///
    /// Called after [`initialize`](PhysicsHandler::initialize) and again
    /// whenever the advection handlers move.
    pub fn initialize_diffusion_grid<'h>(
        &mut self,
        advection: impl IntoIterator<Item = &'h AdvectionHandler>,
        setup: &SetupContext<'_>,
    ) {
        let owned = setup.owned();
        let grid = setup.grid();
        self.mask = vec![SlotSet::with_dof(setup.network().dof()); owned.len()];
        for handler in advection {
            for (local, point) in owned.iter().enumerate() {
                if handler.is_point_on_sink(grid.position(point), grid.step_sizes(point)) {
                    for slot in handler.advecting_slots() {
                        self.mask[local].insert(slot);
                    }
                }
            }
        }
        let masked: usize = self.mask.iter().map(SlotSet::len).sum();
        if masked > 0 {
            log::debug!("diffusion: {masked} (point, cluster) pairs masked at sinks");
        }
    }

    /// Whether diffusion of `slot` is switched off at local point `local`.
    pub fn is_masked(&self, local: usize, slot: usize) -> bool {
        self.mask.get(local).is_some_and(|m| m.contains(slot))
    }

    fn active<'s>(&'s self, local: usize) -> impl Iterator<Item = usize> + 's {
        self.participants
            .iter()
            .copied()
            .filter(move |&s| !self.is_masked(local, s))
    }
}

/// The three stencil weights `(mid, left, right)` for unit `D`.
fn stencil(steps: StepSizes) -> [f64; 3] {
    let StepSizes { left: hl, right: hr } = steps;
    [
        -2.0 / (hl * hr),
        2.0 / (hl * (hl + hr)),
        2.0 / (hr * (hl + hr)),
    ]
}

impl PhysicsHandler for DiffusionHandler {
    fn name(&self) -> &str {
        "diffusion"
    }

    fn stage(&self) -> Stage {
        Stage::Diffusion
    }

    fn initialize(
        &mut self,
        setup: &SetupContext<'_>,
        fill: &mut FillMaps,
    ) -> Result<(), HandlerError> {
        self.participants = setup
            .network()
            .clusters()
            .iter()
            .filter(|c| !is_immobile(c.diffusion_factor()))
            .map(|c| c.id().index())
            .collect();
        for &slot in &self.participants {
            fill.ofill.mark(slot, slot);
        }
        self.mask = vec![SlotSet::with_dof(setup.network().dof()); setup.owned().len()];
        log::debug!("diffusion: {} diffusing clusters", self.participants.len());
        Ok(())
    }

    fn compute_flux(&self, ctx: &PointContext<'_>, out: &mut [f64]) {
        let [w_mid, w_left, w_right] = stencil(ctx.steps());
        for s in self.active(ctx.local()) {
            let d = ctx.network().diffusion_coefficient(s);
            out[s] +=
                d * (w_left * ctx.left()[s] + w_right * ctx.right()[s] + w_mid * ctx.mid()[s]);
        }
    }

    fn participant_count(&self, ctx: &PointContext<'_>) -> usize {
        self.active(ctx.local()).count()
    }

    fn partials_shape(&self) -> PartialsShape {
        PartialsShape::new(1, 3)
    }

    /// Values per participant are `(mid, left, right)`.
    fn compute_partials(
        &self,
        ctx: &PointContext<'_>,
        indices: &mut [usize],
        values: &mut [f64],
    ) -> Result<usize, HandlerError> {
        let n = self.participant_count(ctx);
        check_buffers(self.name(), self.partials_shape(), n, indices, values)?;
        let weights = stencil(ctx.steps());
        for (i, s) in self.active(ctx.local()).enumerate() {
            let d = ctx.network().diffusion_coefficient(s);
            indices[i] = s;
            for (k, w) in weights.iter().enumerate() {
                values[3 * i + k] = d * w;
            }
        }
        Ok(n)
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
        for (i, &slot) in indices.iter().enumerate().take(count) {
            for (k, col_point) in [point, point - 1, point + 1].into_iter().enumerate() {
                sink.add(JacobianEntry {
                    row_point: point,
                    row: slot,
                    col_point,
                    col: slot,
                    value: values[3 * i + k],
                });
            }
        }
    }
}
