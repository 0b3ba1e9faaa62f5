//! Drift of mobile clusters toward a surface or grain-boundary sink.
//!
//! The drift velocity follows from an elastic interaction energy
//! `E(a) = −S/a³` at distance `a` from the sink, which gives the flux
//!
//! ```text
//! off sink:  3·S·D·(c_N/b⁴ − c_M/a⁴) / (k_B·T·h)
//! on sink:   3·S·D·(c_L/h_L⁵ + c_R/h_R⁵) / (k_B·T)
//! ```
//!
//! where `N` is the neighbour on the far side from the sink, `h` the step
//! toward it and `b = a + h`.

use crate::sink_strength::SinkStrengthTable;
use spall_core::constants::{is_immobile, K_BOLTZMANN};
use spall_core::{HandlerError, JacobianEntry, JacobianSink};
use spall_grid::StepSizes;
use spall_handler::{
    check_buffers, FillMaps, PartialsShape, PhysicsHandler, PointContext, SetupContext, Stage,
};

/// Where the sink sits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SinkGeometry {
    /// The tracked free surface. Follows the surface when it moves.
    Surface,
    /// A fixed grain boundary at `location` (nm).
    GrainBoundary {
        /// Position of the boundary along the grid.
        location: f64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Advecting {
    slot: usize,
    strength: f64,
}

/// Finite-difference stencil at one point.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Stencil {
    /// Ordinary point: mid and the neighbour away from the sink.
    Off {
        direction: isize,
        a: f64,
        b: f64,
        h: f64,
    },
    /// The sink lies in the point's control volume: both neighbours
    /// drain into it.
    On,
}

/// Advection toward one sink.
#[derive(Clone, Debug)]
pub struct AdvectionHandler {
    name: String,
    geometry: SinkGeometry,
    table: SinkStrengthTable,
    location: f64,
    participants: Vec<Advecting>,
}

/// Builder for [`AdvectionHandler`].
///
/// Required: a sink-strength table. The geometry defaults to the
/// surface.
#[derive(Clone, Debug)]
pub struct AdvectionConfig {
    name: Option<String>,
    geometry: SinkGeometry,
    table: Option<SinkStrengthTable>,
}

impl AdvectionHandler {
    /// Create a builder.
    pub fn builder() -> AdvectionConfig {
        AdvectionConfig {
            name: None,
            geometry: SinkGeometry::Surface,
            table: None,
        }
    }

    /// Sink geometry.
    pub fn geometry(&self) -> SinkGeometry {
        self.geometry
    }

    /// Current sink location (nm).
    pub fn location(&self) -> f64 {
        self.location
    }

    /// Number of advecting clusters.
    pub fn advecting_count(&self) -> usize {
        self.participants.len()
    }

    /// Slots of the advecting clusters.
    pub fn advecting_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.participants.iter().map(|p| p.slot)
    }

    /// Whether the sink lies in the control volume `(x − h_L/2, x + h_R/2]`
    /// of a point at `position`. Never true for a surface sink.
    pub fn is_point_on_sink(&self, position: f64, steps: StepSizes) -> bool {
        match self.geometry {
            SinkGeometry::Surface => false,
            SinkGeometry::GrainBoundary { location } => {
                location > position - 0.5 * steps.left && location <= position + 0.5 * steps.right
            }
        }
    }

    fn stencil(&self, position: f64, steps: StepSizes) -> Option<Stencil> {
        if self.is_point_on_sink(position, steps) {
            return Some(Stencil::On);
        }
        let direction = match self.geometry {
            SinkGeometry::Surface => 1,
            SinkGeometry::GrainBoundary { .. } if position > self.location => 1,
            SinkGeometry::GrainBoundary { .. } => -1,
        };
        let a = (position - self.location).abs();
        if a <= 0.0 {
            return None;
        }
        let h = if direction > 0 { steps.right } else { steps.left };
        Some(Stencil::Off {
            direction,
            a,
            b: a + h,
            h,
        })
    }

    /// `3·S·D / (k_B·T)` for one participant; zero at `T <= 0`.
    fn prefactor(&self, ctx: &PointContext<'_>, p: &Advecting) -> f64 {
        let t = ctx.temperature();
        if t <= 0.0 {
            return 0.0;
        }
        3.0 * p.strength * ctx.network().diffusion_coefficient(p.slot) / (K_BOLTZMANN * t)
    }
}

impl AdvectionConfig {
    /// Handler name (default `"advection"`).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Drift toward the tracked surface.
    pub fn surface(mut self) -> Self {
        self.geometry = SinkGeometry::Surface;
        self
    }

    /// Drift toward a grain boundary at `location` (nm).
    pub fn grain_boundary(mut self, location: f64) -> Self {
        self.geometry = SinkGeometry::GrainBoundary { location };
        self
    }

    /// Sink strengths.
    pub fn table(mut self, table: SinkStrengthTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Build the handler.
    ///
    /// # Errors
    ///
    /// Returns `Err` if no table is set or the boundary location is not
    /// finite.
    pub fn build(self) -> Result<AdvectionHandler, String> {
        let table = self
            .table
            .ok_or_else(|| "sink strength table is required".to_string())?;
        let location = match self.geometry {
            SinkGeometry::Surface => 0.0,
            SinkGeometry::GrainBoundary { location } => {
                if !location.is_finite() {
                    return Err(format!("grain boundary location must be finite, got {location}"));
                }
                location
            }
        };
        Ok(AdvectionHandler {
            name: self.name.unwrap_or_else(|| "advection".to_string()),
            geometry: self.geometry,
            table,
            location,
            participants: Vec::new(),
        })
    }
}

impl PhysicsHandler for AdvectionHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn stage(&self) -> Stage {
        Stage::Advection
    }

    fn initialize(
        &mut self,
        setup: &SetupContext<'_>,
        fill: &mut FillMaps,
    ) -> Result<(), HandlerError> {
        if self.geometry == SinkGeometry::Surface {
            self.location = setup.grid().position(setup.surface());
        }
        self.participants = setup
            .network()
            .clusters()
            .iter()
            .filter(|c| !is_immobile(c.diffusion_factor()))
            .filter_map(|c| {
                self.table.strength(c.composition()).map(|strength| Advecting {
                    slot: c.id().index(),
                    strength,
                })
            })
            .collect();
        for p in &self.participants {
            fill.ofill.mark(p.slot, p.slot);
        }
        log::debug!(
            "{}: {} advecting clusters, sink at {} nm",
            self.name,
            self.participants.len(),
            self.location
        );
        Ok(())
    }

    fn compute_flux(&self, ctx: &PointContext<'_>, out: &mut [f64]) {
        let steps = ctx.steps();
        let Some(stencil) = self.stencil(ctx.location().position, steps) else {
            return;
        };
        for p in &self.participants {
            let k = self.prefactor(ctx, p);
            let s = p.slot;
            out[s] += match stencil {
                Stencil::Off { direction, a, b, h } => {
                    let neighbour = if direction > 0 { ctx.right() } else { ctx.left() };
                    k * (neighbour[s] / b.powi(4) - ctx.mid()[s] / a.powi(4)) / h
                }
                Stencil::On => {
                    k * (ctx.left()[s] / steps.left.powi(5)
                        + ctx.right()[s] / steps.right.powi(5))
                }
            };
        }
    }

    fn participant_count(&self, _ctx: &PointContext<'_>) -> usize {
        self.participants.len()
    }

    fn partials_shape(&self) -> PartialsShape {
        PartialsShape::new(1, 2)
    }

    /// Values per participant are `(∂/∂c_M, ∂/∂c_N)` off the sink and
    /// `(∂/∂c_L, ∂/∂c_R)` on it.
    fn compute_partials(
        &self,
        ctx: &PointContext<'_>,
        indices: &mut [usize],
        values: &mut [f64],
    ) -> Result<usize, HandlerError> {
        let n = self.participants.len();
        check_buffers(&self.name, self.partials_shape(), n, indices, values)?;
        let steps = ctx.steps();
        let stencil = self.stencil(ctx.location().position, steps);
        for (i, p) in self.participants.iter().enumerate() {
            indices[i] = p.slot;
            let k = self.prefactor(ctx, p);
            let (first, second) = match stencil {
                Some(Stencil::Off { a, b, h, .. }) => (-k / (h * a.powi(4)), k / (h * b.powi(4))),
                Some(Stencil::On) => (k / steps.left.powi(5), k / steps.right.powi(5)),
                None => (0.0, 0.0),
            };
            values[2 * i] = first;
            values[2 * i + 1] = second;
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
        let (first, second) = match self.stencil(ctx.location().position, ctx.steps()) {
            Some(Stencil::Off { direction, .. }) => (point, point + direction),
            Some(Stencil::On) => (point - 1, point + 1),
            None => return,
        };
        for (i, &slot) in indices.iter().enumerate().take(count) {
            for (col_point, value) in [(first, values[2 * i]), (second, values[2 * i + 1])] {
                sink.add(JacobianEntry {
                    row_point: point,
                    row: slot,
                    col_point,
                    col: slot,
                    value,
                });
            }
        }
    }
}
