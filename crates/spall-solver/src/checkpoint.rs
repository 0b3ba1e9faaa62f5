//! Restart snapshots.
//!
//! A [`Checkpoint`] is what an external reader decoded from a restart
//! file: sparse concentrations and a temperature for every grid point,
//! plus the surface position at the time it was written. The solver
//! only reads it.

/// Saved state of one grid point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointSnapshot {
    /// Temperature, in K.
    pub temperature: f64,
    /// Non-zero `(slot, concentration)` pairs. Slots omitted are zero.
    pub concentrations: Vec<(usize, f64)>,
}

/// Saved state of the whole grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Checkpoint {
    /// Surface position when the snapshot was taken.
    pub surface: usize,
    /// One entry per global grid point.
    pub points: Vec<PointSnapshot>,
}

impl Checkpoint {
    /// Snapshot with `points` empty points at `temperature`.
    pub fn uniform(surface: usize, points: usize, temperature: f64) -> Self {
        Self {
            surface,
            points: vec![
                PointSnapshot {
                    temperature,
                    concentrations: Vec::new(),
                };
                points
            ],
        }
    }

    /// Record `value` for `slot` at `point`, replacing any earlier value.
    ///
    /// Does nothing if `point` is outside the snapshot.
    pub fn set(&mut self, point: usize, slot: usize, value: f64) {
        let Some(p) = self.points.get_mut(point) else {
            return;
        };
        match p.concentrations.iter_mut().find(|(s, _)| *s == slot) {
            Some(entry) => entry.1 = value,
            None => p.concentrations.push((slot, value)),
        }
    }
}
