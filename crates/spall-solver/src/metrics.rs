//! Per-evaluation counters.
//!
//! [`EvaluationMetrics`] captures what one residual or Jacobian pass did,
//! for profiling and for tests that check which points were visited.

/// Counters collected during one evaluation.
///
/// The solver returns a fresh value from every evaluation and keeps a
/// copy of the most recent one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvaluationMetrics {
    /// Owned points whose handlers ran.
    pub points_visited: usize,
    /// Owned points skipped by the offsets or a grain boundary.
    pub points_skipped: usize,
    /// Points whose cached rates were recomputed for a new temperature.
    pub temperature_refreshes: usize,
    /// Jacobian entries streamed into the sink.
    pub partial_entries: usize,
    /// Wall-clock time of the whole evaluation, in microseconds.
    pub elapsed_us: u64,
}
