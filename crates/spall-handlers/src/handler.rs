//! The closed set of physics handlers.

use crate::advection::AdvectionHandler;
use crate::desorption::DesorptionHandler;
use crate::diffusion::DiffusionHandler;
use crate::incident_flux::IncidentFluxHandler;
use crate::resolution::ReSolutionHandler;
use crate::trap_mutation::TrapMutationHandler;
use spall_core::{HandlerError, JacobianSink};
use spall_handler::{FillMaps, PartialsShape, PhysicsHandler, PointContext, SetupContext, Stage};
use spall_network::ReactionNetwork;

/// Any one of the physics handlers, selected at setup.
#[derive(Clone, Debug)]
pub enum Handler {
    /// External implantation source.
    IncidentFlux(IncidentFluxHandler),
    /// Fickian diffusion.
    Diffusion(DiffusionHandler),
    /// Drift toward a sink.
    Advection(AdvectionHandler),
    /// Near-surface trap mutation.
    TrapMutation(TrapMutationHandler),
    /// Gas re-solution.
    ReSolution(ReSolutionHandler),
    /// Surface desorption.
    Desorption(DesorptionHandler),
}

macro_rules! dispatch {
    ($self:expr, $h:ident => $body:expr) => {
        match $self {
            Handler::IncidentFlux($h) => $body,
            Handler::Diffusion($h) => $body,
            Handler::Advection($h) => $body,
            Handler::TrapMutation($h) => $body,
            Handler::ReSolution($h) => $body,
            Handler::Desorption($h) => $body,
        }
    };
}

impl PhysicsHandler for Handler {
    fn name(&self) -> &str {
        dispatch!(self, h => h.name())
    }

    fn stage(&self) -> Stage {
        dispatch!(self, h => h.stage())
    }

    fn initialize(
        &mut self,
        setup: &SetupContext<'_>,
        fill: &mut FillMaps,
    ) -> Result<(), HandlerError> {
        dispatch!(self, h => h.initialize(setup, fill))
    }

    fn refresh_temperature(&mut self, local: usize, temperature: f64, network: &ReactionNetwork) {
        dispatch!(self, h => h.refresh_temperature(local, temperature, network))
    }

    fn compute_flux(&self, ctx: &PointContext<'_>, out: &mut [f64]) {
        dispatch!(self, h => h.compute_flux(ctx, out))
    }

    fn participant_count(&self, ctx: &PointContext<'_>) -> usize {
        dispatch!(self, h => h.participant_count(ctx))
    }

    fn partials_shape(&self) -> PartialsShape {
        dispatch!(self, h => h.partials_shape())
    }

    fn compute_partials(
        &self,
        ctx: &PointContext<'_>,
        indices: &mut [usize],
        values: &mut [f64],
    ) -> Result<usize, HandlerError> {
        dispatch!(self, h => h.compute_partials(ctx, indices, values))
    }

    fn emit_partials(
        &self,
        ctx: &PointContext<'_>,
        indices: &[usize],
        values: &[f64],
        count: usize,
        sink: &mut dyn JacobianSink,
    ) {
        dispatch!(self, h => h.emit_partials(ctx, indices, values, count, sink))
    }
}

macro_rules! impl_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Handler {
                fn from(h: $ty) -> Self {
                    Handler::$variant(h)
                }
            }
        )*
    };
}

impl_from!(
    IncidentFlux(IncidentFluxHandler),
    Diffusion(DiffusionHandler),
    Advection(AdvectionHandler),
    TrapMutation(TrapMutationHandler),
    ReSolution(ReSolutionHandler),
    Desorption(DesorptionHandler),
);

impl Handler {
    /// The advection handler, if this is one.
    pub fn as_advection(&self) -> Option<&AdvectionHandler> {
        match self {
            Handler::Advection(h) => Some(h),
            _ => None,
        }
    }

    /// The diffusion handler, if this is one.
    pub fn as_diffusion_mut(&mut self) -> Option<&mut DiffusionHandler> {
        match self {
            Handler::Diffusion(h) => Some(h),
            _ => None,
        }
    }

    /// The incident flux handler, if this is one.
    pub fn as_incident_flux(&self) -> Option<&IncidentFluxHandler> {
        match self {
            Handler::IncidentFlux(h) => Some(h),
            _ => None,
        }
    }

    /// The re-solution handler, if this is one.
    pub fn as_resolution_mut(&mut self) -> Option<&mut ReSolutionHandler> {
        match self {
            Handler::ReSolution(h) => Some(h),
            _ => None,
        }
    }

    /// Whether setting a new surface position changes this handler's
    /// participants.
    pub fn tracks_surface(&self) -> bool {
        match self {
            Handler::IncidentFlux(_) | Handler::TrapMutation(_) | Handler::Desorption(_) => true,
            Handler::Advection(h) => h.geometry() == crate::SinkGeometry::Surface,
            Handler::Diffusion(_) | Handler::ReSolution(_) => false,
        }
    }
}
