//! Error type for solver setup and evaluation.

use std::error::Error;
use std::fmt;

use spall_core::{HandlerError, NetworkError, ReductionError};
use spall_grid::GridError;
use spall_handler::PipelineError;

use crate::config::ConfigError;

/// Any failure of a [`SolverHandler`](crate::SolverHandler) operation.
///
/// Every failure aborts the whole evaluation; nothing here is retried.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Invalid solver configuration.
    Config(ConfigError),
    /// Grid construction or ownership failure.
    Grid(GridError),
    /// Reaction network failure.
    Network(NetworkError),
    /// Handler list out of canonical order.
    Pipeline(PipelineError),
    /// A handler failed at setup or while writing partials.
    Handler(HandlerError),
    /// The collective reduction failed.
    Reduction(ReductionError),
    /// A caller buffer has the wrong length.
    BufferLength {
        /// Which buffer.
        buffer: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// A checkpoint does not fit the grid or network.
    Checkpoint {
        /// Description of the mismatch.
        reason: String,
    },
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Pipeline(e) => write!(f, "pipeline: {e}"),
            Self::Handler(e) => write!(f, "handler: {e}"),
            Self::Reduction(e) => write!(f, "reduction: {e}"),
            Self::BufferLength {
                buffer,
                expected,
                actual,
            } => write!(f, "{buffer} buffer has {actual} values, expected {expected}"),
            Self::Checkpoint { reason } => write!(f, "checkpoint: {reason}"),
        }
    }
}

impl Error for SolverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Grid(e) => Some(e),
            Self::Network(e) => Some(e),
            Self::Pipeline(e) => Some(e),
            Self::Handler(e) => Some(e),
            Self::Reduction(e) => Some(e),
            Self::BufferLength { .. } | Self::Checkpoint { .. } => None,
        }
    }
}

impl From<ConfigError> for SolverError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<GridError> for SolverError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<NetworkError> for SolverError {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}

impl From<PipelineError> for SolverError {
    fn from(e: PipelineError) -> Self {
        Self::Pipeline(e)
    }
}

impl From<HandlerError> for SolverError {
    fn from(e: HandlerError) -> Self {
        Self::Handler(e)
    }
}

impl From<ReductionError> for SolverError {
    fn from(e: ReductionError) -> Self {
        Self::Reduction(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_chain() {
        let e: SolverError = ReductionError::Failed {
            reason: "rank 3 died".into(),
        }
        .into();
        assert_eq!(
            e.to_string(),
            "reduction: collective reduction failed: rank 3 died"
        );
        assert!(e.source().is_some());

        let e = SolverError::BufferLength {
            buffer: "state",
            expected: 12,
            actual: 10,
        };
        assert!(e.source().is_none());
        assert_eq!(e.to_string(), "state buffer has 10 values, expected 12");
    }
}
