//! Reusable partials buffers.
//!
//! The solver sizes one scratch per evaluation from the largest
//! participant footprint it meets and reuses it across handlers and
//! points, so the inner loop does not allocate in steady state.

use crate::handler::PartialsShape;

/// Growable index and value buffers shared by all handlers.
#[derive(Clone, Debug, Default)]
pub struct PartialsScratch {
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl PartialsScratch {
    /// Create a scratch with the given initial capacities.
    pub fn new(indices: usize, values: usize) -> Self {
        Self {
            indices: vec![0; indices],
            values: vec![0.0; values],
        }
    }

    /// Zeroed buffers for `participants` participants of `shape`,
    /// growing the backing storage if needed.
    pub fn prepare(
        &mut self,
        shape: PartialsShape,
        participants: usize,
    ) -> (&mut [usize], &mut [f64]) {
        let (ni, nv) = shape.required(participants);
        if self.indices.len() < ni {
            self.indices.resize(ni, 0);
        }
        if self.values.len() < nv {
            self.values.resize(nv, 0.0);
        }
        self.indices[..ni].fill(0);
        self.values[..nv].fill(0.0);
        (&mut self.indices[..ni], &mut self.values[..nv])
    }

    /// Index capacity.
    pub fn index_capacity(&self) -> usize {
        self.indices.len()
    }

    /// Value capacity.
    pub fn value_capacity(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn prepare_grows_and_zeroes() {
        let mut s = PartialsScratch::new(2, 2);
        {
            let (idx, vals) = s.prepare(PartialsShape::new(1, 3), 2);
            assert_eq!(idx.len(), 2);
            assert_eq!(vals.len(), 6);
            vals[5] = 7.0;
            idx[1] = 9;
        }
        assert_eq!(s.value_capacity(), 6);

        let (idx, vals) = s.prepare(PartialsShape::new(1, 3), 2);
        assert_eq!(vals, &[0.0; 6]);
        assert_eq!(idx, &[0, 0]);
    }

    #[test]
    fn prepare_never_shrinks() {
        let mut s = PartialsScratch::new(0, 0);
        let _ = s.prepare(PartialsShape::new(7, 10), 3);
        let (idx, vals) = s.prepare(PartialsShape::new(1, 1), 1);
        assert_eq!((idx.len(), vals.len()), (1, 1));
        assert_eq!(s.index_capacity(), 21);
        assert_eq!(s.value_capacity(), 30);
    }

    #[test]
    fn zero_participants() {
        let mut s = PartialsScratch::default();
        let (idx, vals) = s.prepare(PartialsShape::new(3, 3), 0);
        assert!(idx.is_empty() && vals.is_empty());
    }

    proptest! {
        #[test]
        fn prepare_always_returns_exact_zeroed_buffers(
            calls in prop::collection::vec((0usize..8, 0usize..8, 0usize..20), 1..12),
        ) {
            let mut s = PartialsScratch::default();
            for (ni, nv, participants) in calls {
                let (idx, vals) = s.prepare(PartialsShape::new(ni, nv), participants);
                prop_assert_eq!(idx.len(), ni * participants);
                prop_assert_eq!(vals.len(), nv * participants);
                prop_assert!(idx.iter().all(|&i| i == 0));
                prop_assert!(vals.iter().all(|&v| v == 0.0));
                idx.fill(3);
                vals.fill(1.5);
            }
        }
    }
}
