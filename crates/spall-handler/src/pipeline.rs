//! Pipeline validation and Jacobian pass planning.
//!
//! [`validate_pipeline`] runs once at solver setup. It checks that the
//! handler list follows the canonical [`Stage`] order and records which
//! handlers take part in each Jacobian pass, so the per-point loops need
//! no stage matching.

use crate::handler::{PartialsShape, PhysicsHandler};
use crate::stage::{JacobianPass, Stage};
use indexmap::IndexMap;
use std::error::Error;
use std::fmt;

// ── Plan ───────────────────────────────────────────────────────────

/// Handler indices per Jacobian pass, in evaluation order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct PipelinePlan {
    off_diagonal: Vec<usize>,
    diagonal: Vec<usize>,
    widest: PartialsShape,
}

impl PipelinePlan {
    /// Handlers contributing to `pass`.
    pub fn pass(&self, pass: JacobianPass) -> &[usize] {
        match pass {
            JacobianPass::OffDiagonal => &self.off_diagonal,
            JacobianPass::Diagonal => &self.diagonal,
        }
    }

    /// Largest per-participant footprint across all handlers.
    pub fn widest_shape(&self) -> PartialsShape {
        self.widest
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Errors from pipeline validation (setup-time, never per point).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A handler appears after one from a later stage.
    OutOfOrder {
        /// The misplaced handler.
        handler: String,
        /// Its stage.
        stage: Stage,
        /// Name of the earlier handler from a later stage.
        after: String,
    },
    /// Two handlers share a stage that allows only one.
    DuplicateStage {
        /// The stage.
        stage: Stage,
        /// Name of the first handler.
        first: String,
        /// Name of the second handler.
        second: String,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrder {
                handler,
                stage,
                after,
            } => write!(
                f,
                "handler '{handler}' ({stage}) must run before '{after}'"
            ),
            Self::DuplicateStage {
                stage,
                first,
                second,
            } => write!(
                f,
                "stage {stage} registered twice: '{first}' and '{second}'"
            ),
        }
    }
}

impl Error for PipelineError {}

// ── Validation ─────────────────────────────────────────────────────

/// Validate a handler list and build its [`PipelinePlan`].
///
/// Checks performed:
///
/// 1. Stages are non-decreasing in canonical order.
/// 2. Only repeatable stages appear more than once.
///
/// An empty list is valid: the reaction network alone is a pipeline.
pub fn validate_pipeline<H: PhysicsHandler>(handlers: &[H]) -> Result<PipelinePlan, PipelineError> {
    let mut first_of: IndexMap<Stage, usize> = IndexMap::new();
    let mut latest: Option<usize> = None;

    for (i, h) in handlers.iter().enumerate() {
        let stage = h.stage();
        if let Some(j) = latest {
            if handlers[j].stage() > stage {
                return Err(PipelineError::OutOfOrder {
                    handler: h.name().to_string(),
                    stage,
                    after: handlers[j].name().to_string(),
                });
            }
        }
        if let Some(&j) = first_of.get(&stage) {
            if !stage.repeatable() {
                return Err(PipelineError::DuplicateStage {
                    stage,
                    first: handlers[j].name().to_string(),
                    second: h.name().to_string(),
                });
            }
        } else {
            first_of.insert(stage, i);
        }
        latest = Some(i);
    }

    let mut plan = PipelinePlan::default();
    for (i, h) in handlers.iter().enumerate() {
        match h.stage().pass() {
            Some(JacobianPass::OffDiagonal) => plan.off_diagonal.push(i),
            Some(JacobianPass::Diagonal) => plan.diagonal.push(i),
            None => {}
        }
        let shape = h.partials_shape();
        plan.widest.indices = plan.widest.indices.max(shape.indices);
        plan.widest.values = plan.widest.values.max(shape.values);
    }
    Ok(plan)
}
