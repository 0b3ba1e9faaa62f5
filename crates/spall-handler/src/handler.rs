//! The [`PhysicsHandler`] trait.
//!
//! Handlers are built once, initialized once per subdomain (and again
//! whenever the tracked surface moves), then evaluated at every owned
//! grid point of every residual and Jacobian pass.

use crate::context::{FillMaps, PointContext, SetupContext};
use crate::stage::Stage;
use spall_core::{HandlerError, JacobianSink};
use spall_network::ReactionNetwork;

/// Buffer footprint of one participant's partial derivatives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PartialsShape {
    /// Slot indices written per participant.
    pub indices: usize,
    /// Values written per participant.
    pub values: usize,
}

impl PartialsShape {
    /// Shape with `indices` indices and `values` values per participant.
    pub const fn new(indices: usize, values: usize) -> Self {
        Self { indices, values }
    }

    /// Buffer lengths needed for `participants` participants.
    pub fn required(&self, participants: usize) -> (usize, usize) {
        (self.indices * participants, self.values * participants)
    }
}

/// Check caller buffers against the footprint of `participants`.
///
/// An undersized buffer means the caller did not size from
/// [`PhysicsHandler::participant_count`]; it is reported, never
/// truncated.
pub fn check_buffers(
    handler: &str,
    shape: PartialsShape,
    participants: usize,
    indices: &[usize],
    values: &[f64],
) -> Result<(), HandlerError> {
    let (need_indices, need_values) = shape.required(participants);
    if indices.len() < need_indices {
        return Err(HandlerError::BufferTooSmall {
            handler: handler.to_string(),
            required: need_indices,
            provided: indices.len(),
        });
    }
    if values.len() < need_values {
        return Err(HandlerError::BufferTooSmall {
            handler: handler.to_string(),
            required: need_values,
            provided: values.len(),
        });
    }
    Ok(())
}

/// A physical process contributing flux and partial derivatives.
///
/// # Contract
///
/// - `compute_flux` adds into `out`; it never overwrites.
/// - `participant_count` is exact for the given point. Callers size the
///   partials buffers from it via [`partials_shape`](Self::partials_shape).
/// - `compute_partials` writes exactly `participant_count` participants
///   and returns that count. Clusters that do not participate are left
///   out, not zero-filled.
/// - `emit_partials` turns the buffers back into Jacobian entries.
pub trait PhysicsHandler {
    /// Human-readable name for errors and logs.
    fn name(&self) -> &str;

    /// Evaluation stage.
    fn stage(&self) -> Stage;

    /// Build participant lists and mark sparsity.
    ///
    /// Called at setup and again after the surface moves.
    fn initialize(
        &mut self,
        setup: &SetupContext<'_>,
        fill: &mut FillMaps,
    ) -> Result<(), HandlerError>;

    /// Refresh temperature-dependent rates at local point `local`.
    ///
    /// Called after the network has been refreshed for that point.
    fn refresh_temperature(
        &mut self,
        _local: usize,
        _temperature: f64,
        _network: &ReactionNetwork,
    ) {
    }

    /// Add this handler's rate of change at the point into `out`.
    fn compute_flux(&self, ctx: &PointContext<'_>, out: &mut [f64]);

    /// Number of participants contributing partials at the point.
    fn participant_count(&self, ctx: &PointContext<'_>) -> usize;

    /// Per-participant buffer footprint.
    fn partials_shape(&self) -> PartialsShape;

    /// Write the point's partial derivatives into the caller's buffers.
    fn compute_partials(
        &self,
        ctx: &PointContext<'_>,
        indices: &mut [usize],
        values: &mut [f64],
    ) -> Result<usize, HandlerError>;

    /// Stream the first `count` participants of filled buffers as
    /// Jacobian entries.
    fn emit_partials(
        &self,
        ctx: &PointContext<'_>,
        indices: &[usize],
        values: &[f64],
        count: usize,
        sink: &mut dyn JacobianSink,
    );
}
