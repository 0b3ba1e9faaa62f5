//! Species and cluster compositions.

use crate::error::NetworkError;
use std::fmt;
use std::str::FromStr;

/// A chemical or defect species that can appear in a cluster.
///
/// The declaration order is the canonical order used when formatting
/// composition labels and when laying out [`Composition`] counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Species {
    /// Helium.
    He,
    /// Deuterium.
    D,
    /// Tritium.
    T,
    /// Xenon.
    Xe,
    /// Vacancy.
    V,
    /// Self-interstitial.
    I,
}

impl Species {
    /// Number of species variants.
    pub const COUNT: usize = 6;

    /// All species in canonical order.
    pub const ALL: [Species; Self::COUNT] = [
        Species::He,
        Species::D,
        Species::T,
        Species::Xe,
        Species::V,
        Species::I,
    ];

    /// Index of this species in [`Species::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short chemical symbol used in composition labels.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::He => "He",
            Self::D => "D",
            Self::T => "T",
            Self::Xe => "Xe",
            Self::V => "V",
            Self::I => "I",
        }
    }

    /// Hydrogen isotopes (deuterium and tritium).
    pub fn is_hydrogen(self) -> bool {
        matches!(self, Self::D | Self::T)
    }

    /// Lattice defects (vacancies and interstitials), as opposed to
    /// implanted or generated atoms.
    pub fn is_defect(self) -> bool {
        matches!(self, Self::V | Self::I)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Species {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .iter()
            .copied()
            .find(|sp| sp.symbol() == s)
            .ok_or_else(|| NetworkError::UnknownSpecies {
                symbol: s.to_string(),
            })
    }
}

/// Per-species atom/defect counts of one cluster.
///
/// A composition is the identity of a cluster: two catalog entries with
/// the same composition describe the same kinetic state variable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Composition {
    counts: [u32; Species::COUNT],
}

impl Composition {
    /// The empty composition (no atoms, no defects).
    pub const fn empty() -> Self {
        Self {
            counts: [0; Species::COUNT],
        }
    }

    /// A single-species composition of `count` units.
    pub fn pure(species: Species, count: u32) -> Self {
        Self::empty().with(species, count)
    }

    /// Return a copy with the count for `species` replaced.
    pub fn with(mut self, species: Species, count: u32) -> Self {
        self.counts[species.index()] = count;
        self
    }

    /// Count of `species` in this composition.
    pub fn count(&self, species: Species) -> u32 {
        self.counts[species.index()]
    }

    /// Total number of units over all species.
    pub fn size(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Returns `true` when every count is zero.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// The single species present, if the composition is pure.
    pub fn pure_species(&self) -> Option<Species> {
        let mut found = None;
        for (sp, &n) in Species::ALL.iter().zip(self.counts.iter()) {
            if n > 0 {
                if found.is_some() {
                    return None;
                }
                found = Some(*sp);
            }
        }
        found
    }

    /// Number of non-defect atoms (He, D, T, Xe).
    pub fn atoms(&self) -> u32 {
        Species::ALL
            .iter()
            .filter(|sp| !sp.is_defect())
            .map(|&sp| self.count(sp))
            .sum()
    }

    /// Iterate over `(species, count)` pairs with non-zero counts.
    pub fn iter(&self) -> impl Iterator<Item = (Species, u32)> + '_ {
        Species::ALL
            .iter()
            .copied()
            .zip(self.counts.iter().copied())
            .filter(|&(_, n)| n > 0)
    }

    /// Element-wise sum of two compositions, without any vacancy or
    /// interstitial recombination.
    pub fn sum(&self, other: &Self) -> Self {
        let mut counts = self.counts;
        for (c, o) in counts.iter_mut().zip(other.counts.iter()) {
            *c += o;
        }
        Self { counts }
    }

    /// Element-wise difference, or `None` if any count would go negative.
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        let mut counts = self.counts;
        for (c, o) in counts.iter_mut().zip(other.counts.iter()) {
            *c = c.checked_sub(*o)?;
        }
        Some(Self { counts })
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("0");
        }
        for (sp, n) in self.iter() {
            write!(f, "{}_{}", sp.symbol(), n)?;
        }
        Ok(())
    }
}

impl FromStr for Composition {
    type Err = NetworkError;

    /// Parse a label such as `He_2V_1` or `Xe3`.
    ///
    /// Symbols are case-sensitive; the underscore between a symbol and
    /// its count is optional. A species appearing twice is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || NetworkError::MalformedLabel {
            label: s.to_string(),
        };
        let bytes = s.as_bytes();
        if bytes.is_empty() {
            return Err(malformed());
        }
        let mut comp = Composition::empty();
        let mut i = 0;
        while i < bytes.len() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                i += 1;
            }
            if start == i {
                return Err(malformed());
            }
            let species: Species = s[start..i].parse()?;
            if i < bytes.len() && bytes[i] == b'_' {
                i += 1;
            }
            let digits = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if digits == i {
                return Err(malformed());
            }
            let count: u32 = s[digits..i].parse().map_err(|_| malformed())?;
            if count == 0 || comp.count(species) != 0 {
                return Err(malformed());
            }
            comp = comp.with(species, count);
        }
        Ok(comp)
    }
}
