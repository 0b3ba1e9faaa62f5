//! Sink-strength tables for drift toward surfaces and grain boundaries.

use spall_core::{Composition, Species};

const W100_HELIUM: [f64; 7] = [0.54e-3, 1.01e-3, 3.03e-3, 3.93e-3, 7.24e-3, 10.82e-3, 19.26e-3];
const W211_HELIUM: [f64; 7] = [1.49e-3, 3.69e-3, 12.34e-3, 14.11e-3, 19.14e-3, 35.77e-3, 67.65e-3];

/// Sink strength S (eV·nm³) per cluster composition.
///
/// Clusters absent from the table do not advect.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkStrengthTable {
    entries: Vec<(Composition, f64)>,
}

impl SinkStrengthTable {
    /// Helium toward a (100) tungsten surface.
    pub fn w100() -> Self {
        Self::helium(&W100_HELIUM)
    }

    /// Helium toward a (211) tungsten surface or boundary.
    pub fn w211() -> Self {
        Self::helium(&W211_HELIUM)
    }

    /// A user-supplied table of `(species, size, strength)` rows.
    pub fn custom(rows: impl IntoIterator<Item = (Species, u32, f64)>) -> Result<Self, String> {
        let mut entries = Vec::new();
        for (species, size, strength) in rows {
            if size == 0 {
                return Err(format!("sink strength for {species} has size 0"));
            }
            if !strength.is_finite() || strength < 0.0 {
                return Err(format!(
                    "sink strength for {species}_{size} must be finite and >= 0, got {strength}"
                ));
            }
            entries.push((Composition::pure(species, size), strength));
        }
        Ok(Self { entries })
    }

    fn helium(values: &[f64]) -> Self {
        let entries = values
            .iter()
            .enumerate()
            .map(|(i, &s)| (Composition::pure(Species::He, i as u32 + 1), s))
            .collect();
        Self { entries }
    }

    /// Strength for `composition`, if tabulated and non-zero.
    pub fn strength(&self, composition: &Composition) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| c == composition)
            .map(|&(_, s)| s)
            .filter(|&s| s > 0.0)
    }

    /// Number of tabulated compositions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is tabulated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn w211_helium_values() {
        let t = SinkStrengthTable::w211();
        assert_eq!(t.strength(&Composition::pure(Species::He, 3)), Some(12.34e-3));
        assert_eq!(t.strength(&Composition::pure(Species::He, 8)), None);
        assert_eq!(t.strength(&Composition::pure(Species::V, 1)), None);
    }

    #[test]
    fn custom_rejects_negative() {
        assert!(SinkStrengthTable::custom([(Species::Xe, 1, -1.0)]).is_err());
        let t = SinkStrengthTable::custom([(Species::Xe, 1, 2.0e-3), (Species::Xe, 2, 0.0)]).unwrap();
        assert_eq!(t.strength(&Composition::pure(Species::Xe, 1)), Some(2.0e-3));
        // Zero strength means no advection.
        assert_eq!(t.strength(&Composition::pure(Species::Xe, 2)), None);
    }
}
