//! Catalog entries, kinetic parameters, and network clusters.

use spall_core::constants::{arrhenius, is_immobile, FOUR_PI, XENON_DENSITY};
use spall_core::{ClusterId, Composition, NetworkError, Species};

/// One catalog entry: a composition and its physical parameters.
///
/// Energies are in eV, the diffusion factor in nm²/s. A migration
/// energy of `f64::INFINITY` marks an immobile cluster just as a zero
/// diffusion factor does.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterSpec {
    /// Species counts of the cluster.
    pub composition: Composition,
    /// Formation energy (eV).
    pub formation_energy: f64,
    /// Migration energy (eV).
    pub migration_energy: f64,
    /// Diffusion prefactor D₀ (nm²/s).
    pub diffusion_factor: f64,
    /// Capture radius (nm). Derived from the lattice parameter when absent.
    pub reaction_radius: Option<f64>,
}

impl ClusterSpec {
    /// Create an entry with a derived reaction radius.
    pub fn new(
        composition: Composition,
        formation_energy: f64,
        migration_energy: f64,
        diffusion_factor: f64,
    ) -> Self {
        Self {
            composition,
            formation_energy,
            migration_energy,
            diffusion_factor,
            reaction_radius: None,
        }
    }

    /// Parse the composition from a label such as `He_2V_1`.
    pub fn from_label(
        label: &str,
        formation_energy: f64,
        migration_energy: f64,
        diffusion_factor: f64,
    ) -> Result<Self, NetworkError> {
        Ok(Self::new(
            label.parse()?,
            formation_energy,
            migration_energy,
            diffusion_factor,
        ))
    }

    /// Override the derived reaction radius.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.reaction_radius = Some(radius);
        self
    }

    /// Check the entry's physical parameters.
    pub(crate) fn validate(&self) -> Result<(), NetworkError> {
        let invalid = |reason: String| NetworkError::InvalidEntry {
            composition: self.composition,
            reason,
        };
        if self.composition.is_empty() {
            return Err(invalid("empty composition".into()));
        }
        if !self.formation_energy.is_finite() {
            return Err(invalid(format!(
                "formation energy must be finite, got {}",
                self.formation_energy
            )));
        }
        if self.migration_energy.is_nan() || self.migration_energy < 0.0 {
            return Err(invalid(format!(
                "migration energy must be >= 0, got {}",
                self.migration_energy
            )));
        }
        if !self.diffusion_factor.is_finite() || self.diffusion_factor < 0.0 {
            return Err(invalid(format!(
                "diffusion factor must be finite and >= 0, got {}",
                self.diffusion_factor
            )));
        }
        if let Some(r) = self.reaction_radius {
            if !r.is_finite() || r <= 0.0 {
                return Err(invalid(format!(
                    "reaction radius must be positive, got {r}"
                )));
            }
        }
        Ok(())
    }

    /// Resolve the kinetic parameters against a lattice parameter.
    pub(crate) fn kinetics(&self, lattice_parameter: f64) -> Kinetics {
        Kinetics {
            formation_energy: self.formation_energy,
            migration_energy: self.migration_energy,
            diffusion_factor: self.diffusion_factor,
            reaction_radius: self
                .reaction_radius
                .unwrap_or_else(|| default_reaction_radius(&self.composition, lattice_parameter)),
        }
    }
}

/// Resolved kinetic parameters of one cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kinetics {
    /// Formation energy (eV).
    pub formation_energy: f64,
    /// Migration energy (eV).
    pub migration_energy: f64,
    /// Diffusion prefactor D₀ (nm²/s).
    pub diffusion_factor: f64,
    /// Capture radius (nm).
    pub reaction_radius: f64,
}

impl Kinetics {
    /// D(T) = D₀·exp(−Em / k_B·T).
    pub fn diffusion_coefficient(&self, temperature: f64) -> f64 {
        if is_immobile(self.diffusion_factor) {
            return 0.0;
        }
        arrhenius(self.diffusion_factor, self.migration_energy, temperature)
    }

    /// Whether the cluster can migrate at all.
    pub fn is_mobile(&self) -> bool {
        !is_immobile(self.diffusion_factor) && self.migration_energy.is_finite()
    }
}

/// Default capture radius for a composition on a lattice of parameter
/// `a` (nm).
///
/// Vacancy-bearing and interstitial clusters use the spherical-void
/// form `√3/4·a + ∛(3a³n/8π) − ∛(3a³/8π)`, xenon bubbles a fixed atom
/// density, and light-gas clusters `0.3 + ∛(3a³n/40π) − ∛(3a³/40π)`.
pub fn default_reaction_radius(composition: &Composition, a: f64) -> f64 {
    let a3 = a * a * a;
    let void = |n: u32| {
        3f64.sqrt() / 4.0 * a + (3.0 * a3 * n as f64 / (2.0 * FOUR_PI)).cbrt()
            - (3.0 * a3 / (2.0 * FOUR_PI)).cbrt()
    };
    let v = composition.count(Species::V);
    let i = composition.count(Species::I);
    let xe = composition.count(Species::Xe);
    if v > 0 {
        void(v)
    } else if i > 0 {
        void(i)
    } else if xe > 0 {
        (3.0 * xe as f64 / (FOUR_PI * XENON_DENSITY)).cbrt()
    } else {
        let n = composition.atoms();
        if n == 0 {
            return 0.0;
        }
        0.3 + (3.0 * a3 * n as f64 / (10.0 * FOUR_PI)).cbrt() - (3.0 * a3 / (10.0 * FOUR_PI)).cbrt()
    }
}

/// A normal (ungrouped) cluster of a reaction network.
///
/// Holds a per-grid-point cache of its diffusion coefficient, refreshed
/// by [`ReactionNetwork::set_temperature`](crate::ReactionNetwork::set_temperature).
#[derive(Clone, Debug)]
pub struct Cluster {
    id: ClusterId,
    composition: Composition,
    name: String,
    kinetics: Kinetics,
    diffusion_coefficients: Vec<f64>,
}

impl Cluster {
    pub(crate) fn new(id: ClusterId, spec: &ClusterSpec, lattice_parameter: f64) -> Self {
        Self {
            id,
            composition: spec.composition,
            name: spec.composition.to_string(),
            kinetics: spec.kinetics(lattice_parameter),
            diffusion_coefficients: Vec::new(),
        }
    }

    /// Dense id, equal to the cluster's slot.
    pub fn id(&self) -> ClusterId {
        self.id
    }

    /// Species counts.
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Label such as `He_2V_1`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of units in the cluster.
    pub fn size(&self) -> u32 {
        self.composition.size()
    }

    /// Resolved kinetic parameters.
    pub fn kinetics(&self) -> &Kinetics {
        &self.kinetics
    }

    /// Diffusion prefactor D₀ (nm²/s).
    pub fn diffusion_factor(&self) -> f64 {
        self.kinetics.diffusion_factor
    }

    /// Formation energy (eV).
    pub fn formation_energy(&self) -> f64 {
        self.kinetics.formation_energy
    }

    /// Migration energy (eV).
    pub fn migration_energy(&self) -> f64 {
        self.kinetics.migration_energy
    }

    /// Capture radius (nm).
    pub fn reaction_radius(&self) -> f64 {
        self.kinetics.reaction_radius
    }

    /// Whether the cluster migrates.
    pub fn is_mobile(&self) -> bool {
        self.kinetics.is_mobile()
    }

    /// Cached diffusion coefficient at local grid point `point`.
    pub fn diffusion_coefficient(&self, point: usize) -> f64 {
        self.diffusion_coefficients.get(point).copied().unwrap_or(0.0)
    }

    pub(crate) fn resize(&mut self, points: usize) {
        self.diffusion_coefficients.resize(points, 0.0);
    }

    pub(crate) fn update_temperature(&mut self, point: usize, temperature: f64) {
        self.diffusion_coefficients[point] = self.kinetics.diffusion_coefficient(temperature);
    }
}
