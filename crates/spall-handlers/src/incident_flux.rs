//! Implantation of incident particles below the surface.
//!
//! Every implanted species shares one depth profile `f(d)`, normalized
//! over the grid points past the surface so that `Σ f(dᵢ)·wᵢ = 1` with
//! `wᵢ` the cell width. The size-1 cluster of each species then gains
//!
//! ```text
//! amplitude(t) · fraction · f(dᵢ)
//! ```
//!
//! The source does not depend on the state, so it has no partials.

use spall_core::{Composition, HandlerError, JacobianSink, LinearTable, Species};
use spall_handler::{FillMaps, PartialsShape, PhysicsHandler, PointContext, SetupContext, Stage};

/// Shape of the implantation profile versus depth (nm).
#[derive(Clone, Debug, PartialEq)]
pub enum DepthProfile {
    /// Linear interpolation between samples; zero outside the table.
    Tabulated(LinearTable),
    /// `Σ aₖ·dᵏ` up to `cutoff`, zero beyond.
    Polynomial {
        /// Coefficients, constant term first.
        coefficients: Vec<f64>,
        /// Depth past which the profile vanishes (nm).
        cutoff: f64,
    },
}

impl DepthProfile {
    /// Un-normalized profile value at `depth`, clamped at zero.
    pub fn evaluate(&self, depth: f64) -> f64 {
        let v = match self {
            Self::Tabulated(table) if table.contains(depth) => table.value(depth),
            Self::Tabulated(_) => 0.0,
            Self::Polynomial { cutoff, .. } if depth > *cutoff => 0.0,
            Self::Polynomial { coefficients, .. } => coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, &a| acc * depth + a),
        };
        v.max(0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Implanted {
    species: Species,
    fraction: f64,
    slot: usize,
}

/// Incident flux source.
#[derive(Clone, Debug)]
pub struct IncidentFluxHandler {
    amplitude: f64,
    profile: DepthProfile,
    time_profile: Option<LinearTable>,
    implanted: Vec<Implanted>,
    /// Per local point, the normalized profile value.
    weights: Vec<f64>,
}

/// Builder for [`IncidentFluxHandler`].
///
/// Required: a depth profile and at least one species. The amplitude
/// defaults to zero.
#[derive(Clone, Debug, Default)]
pub struct IncidentFluxConfig {
    amplitude: f64,
    profile: Option<DepthProfile>,
    species: Vec<(Species, f64)>,
    time_profile: Option<LinearTable>,
}

impl IncidentFluxHandler {
    /// Create a builder.
    pub fn builder() -> IncidentFluxConfig {
        IncidentFluxConfig::default()
    }

    /// Configured amplitude, before any time profile.
    pub fn flux_amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Amplitude at `time`, scaled by the time profile if one is set.
    pub fn flux_amplitude_at(&self, time: f64) -> f64 {
        match &self.time_profile {
            Some(p) => self.amplitude * p.value(time),
            None => self.amplitude,
        }
    }

    /// Normalized profile value at local point `local`.
    pub fn weight(&self, local: usize) -> f64 {
        self.weights.get(local).copied().unwrap_or(0.0)
    }
}

impl IncidentFluxConfig {
    /// Total incident flux (nm⁻²·s⁻¹).
    pub fn amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Depth profile shared by all species.
    pub fn profile(mut self, profile: DepthProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Implant `species` with `fraction` of the amplitude.
    pub fn species(mut self, species: Species, fraction: f64) -> Self {
        self.species.push((species, fraction));
        self
    }

    /// Scale the amplitude by a function of time.
    pub fn time_profile(mut self, profile: LinearTable) -> Self {
        self.time_profile = Some(profile);
        self
    }

    /// Build the handler.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the profile or species list is missing, a species
    /// repeats, or a fraction, the amplitude or the polynomial cutoff is
    /// negative or not finite.
    pub fn build(self) -> Result<IncidentFluxHandler, String> {
        let profile = self
            .profile
            .ok_or_else(|| "depth profile is required".to_string())?;
        if let DepthProfile::Polynomial {
            coefficients,
            cutoff,
        } = &profile
        {
            if coefficients.iter().any(|a| !a.is_finite()) {
                return Err("polynomial coefficients must be finite".to_string());
            }
            if !cutoff.is_finite() || *cutoff <= 0.0 {
                return Err(format!("polynomial cutoff must be positive, got {cutoff}"));
            }
        }
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err(format!("amplitude must be finite and >= 0, got {}", self.amplitude));
        }
        if self.species.is_empty() {
            return Err("at least one implanted species is required".to_string());
        }
        for (i, &(sp, fraction)) in self.species.iter().enumerate() {
            if !fraction.is_finite() || fraction < 0.0 {
                return Err(format!("fraction for {sp} must be finite and >= 0, got {fraction}"));
            }
            if self.species[..i].iter().any(|&(other, _)| other == sp) {
                return Err(format!("species {sp} listed twice"));
            }
        }
        Ok(IncidentFluxHandler {
            amplitude: self.amplitude,
            profile,
            time_profile: self.time_profile,
            implanted: self
                .species
                .into_iter()
                .map(|(species, fraction)| Implanted {
                    species,
                    fraction,
                    slot: 0,
                })
                .collect(),
            weights: Vec::new(),
        })
    }
}

impl PhysicsHandler for IncidentFluxHandler {
    fn name(&self) -> &str {
        "incident flux"
    }

    fn stage(&self) -> Stage {
        Stage::IncidentFlux
    }

    fn initialize(
        &mut self,
        setup: &SetupContext<'_>,
        _fill: &mut FillMaps,
    ) -> Result<(), HandlerError> {
        let network = setup.network();
        for imp in &mut self.implanted {
            let cluster = network
                .get(imp.species, 1)
                .ok_or_else(|| HandlerError::MissingCluster {
                    handler: "incident flux".to_string(),
                    composition: Composition::pure(imp.species, 1),
                })?;
            imp.slot = cluster.id().index();
        }

        let grid = setup.grid();
        let surface = setup.surface();
        let norm: f64 = (surface + 1..grid.len())
            .map(|p| {
                self.profile.evaluate(grid.depth(p, surface)) * grid.step_sizes(p).cell_width()
            })
            .sum();
        if norm <= 0.0 || !norm.is_finite() {
            return Err(HandlerError::InvalidConfig {
                handler: self.name().to_string(),
                reason: format!("depth profile integrates to {norm} past the surface"),
            });
        }
        self.weights = setup
            .owned()
            .iter()
            .map(|p| {
                if p > surface {
                    self.profile.evaluate(grid.depth(p, surface)) / norm
                } else {
                    0.0
                }
            })
            .collect();
        log::debug!(
            "incident flux: {} species, profile norm {norm:.6e}",
            self.implanted.len()
        );
        Ok(())
    }

    fn compute_flux(&self, ctx: &PointContext<'_>, out: &mut [f64]) {
        let w = self.weight(ctx.local());
        if w == 0.0 {
            return;
        }
        let amplitude = self.flux_amplitude_at(ctx.time());
        for imp in &self.implanted {
            out[imp.slot] += amplitude * imp.fraction * w;
        }
    }

    fn participant_count(&self, _ctx: &PointContext<'_>) -> usize {
        0
    }

    fn partials_shape(&self) -> PartialsShape {
        PartialsShape::default()
    }

    fn compute_partials(
        &self,
        _ctx: &PointContext<'_>,
        _indices: &mut [usize],
        _values: &mut [f64],
    ) -> Result<usize, HandlerError> {
        Ok(0)
    }

    fn emit_partials(
        &self,
        _ctx: &PointContext<'_>,
        _indices: &[usize],
        _values: &[f64],
        _count: usize,
        _sink: &mut dyn JacobianSink,
    ) {
    }
}
