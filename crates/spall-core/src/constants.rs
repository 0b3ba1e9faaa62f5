//! Physical constants shared by the network and the handlers.
//!
//! Units throughout the workspace: lengths in nm, energies in eV,
//! temperatures in K, times in s.

/// Boltzmann constant in eV/K.
pub const K_BOLTZMANN: f64 = 8.617_330_3e-5;

/// 4π.
pub const FOUR_PI: f64 = 4.0 * std::f64::consts::PI;

/// Number density of xenon atoms in a bubble, in nm⁻³.
pub const XENON_DENSITY: f64 = 28.0;

/// Arrhenius factor `prefactor * exp(-energy / (k_B * temperature))`.
///
/// A non-positive temperature yields `0.0` rather than NaN, so caches
/// initialised before the first temperature update stay finite.
pub fn arrhenius(prefactor: f64, energy: f64, temperature: f64) -> f64 {
    if temperature <= 0.0 {
        return 0.0;
    }
    prefactor * (-energy / (K_BOLTZMANN * temperature)).exp()
}

/// Returns `true` when a diffusion factor is small enough to treat the
/// cluster as immobile.
pub fn is_immobile(diffusion_factor: f64) -> bool {
    diffusion_factor.abs() <= f64::EPSILON
}
