//! Canonical handler order and Jacobian pass membership.

use std::fmt;

/// Position of a handler in the per-point evaluation order.
///
/// Handlers run in ascending stage order; the reaction network always
/// runs after the last stage. Only [`Stage::Advection`] may appear more
/// than once (one per sink).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// External implantation.
    IncidentFlux,
    /// Fickian transport between neighbouring points.
    Diffusion,
    /// Drift toward a sink.
    Advection,
    /// Near-surface self-trapping of mobile gas clusters.
    TrapMutation,
    /// Atom reinjection from large clusters.
    ReSolution,
    /// Surface recombination of hydrogen isotopes.
    Desorption,
}

/// The two Jacobian assembly passes the external assembler distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JacobianPass {
    /// Fixed cross-point sparsity.
    OffDiagonal,
    /// Position-dependent intra-point sparsity.
    Diagonal,
}

impl Stage {
    /// All stages in evaluation order.
    pub const ALL: [Stage; 6] = [
        Stage::IncidentFlux,
        Stage::Diffusion,
        Stage::Advection,
        Stage::TrapMutation,
        Stage::ReSolution,
        Stage::Desorption,
    ];

    /// Jacobian pass this stage contributes to, if any.
    pub fn pass(self) -> Option<JacobianPass> {
        match self {
            Stage::IncidentFlux => None,
            Stage::Diffusion | Stage::Advection => Some(JacobianPass::OffDiagonal),
            Stage::TrapMutation | Stage::ReSolution | Stage::Desorption => {
                Some(JacobianPass::Diagonal)
            }
        }
    }

    /// Whether several handlers may share this stage.
    pub fn repeatable(self) -> bool {
        self == Stage::Advection
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::IncidentFlux => "incident flux",
            Stage::Diffusion => "diffusion",
            Stage::Advection => "advection",
            Stage::TrapMutation => "trap mutation",
            Stage::ReSolution => "re-solution",
            Stage::Desorption => "desorption",
        };
        f.write_str(name)
    }
}
