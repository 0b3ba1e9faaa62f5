//! Synthetic cluster catalogs.
//!
//! Energies are loosely based on tungsten and uranium-dioxide values;
//! they only need to be plausible, not accurate.

use spall_core::{Composition, Species};
use spall_network::{ClusterCatalog, ClusterSpec, NetworkConfig, ReactionNetwork};

/// Tungsten lattice parameter used by the helium catalogs (nm).
pub const TUNGSTEN_LATTICE: f64 = 0.317;

fn he(n: u32) -> Composition {
    Composition::pure(Species::He, n)
}

/// Mobile He₁..He₇ only.
pub fn helium_catalog() -> ClusterCatalog {
    let entries = [
        (6.15, 0.13, 2.95e10),
        (11.44, 0.20, 3.24e10),
        (16.35, 0.25, 2.26e10),
        (21.0, 0.20, 1.68e10),
        (26.1, 0.12, 5.20e10),
        (30.24, 0.30, 2.03e10),
        (34.93, 0.38, 1.58e10),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (ef, em, d0))| ClusterSpec::new(he(i as u32 + 1), ef, em, d0))
    .collect();
    ClusterCatalog::new(TUNGSTEN_LATTICE, entries).expect("valid helium catalog")
}

/// Helium, vacancies and interstitials with the bubbles trap mutation
/// needs: He₁..He₇ mobile, V₁ and I₁ mobile, I₂ and every HeₙV₁,
/// He₇V₂ immobile.
pub fn he_v_catalog() -> ClusterCatalog {
    let mut entries: Vec<ClusterSpec> = helium_catalog().entries().to_vec();
    entries.push(ClusterSpec::new(Composition::pure(Species::V, 1), 3.6, 1.3, 1.8e12));
    entries.push(ClusterSpec::new(Composition::pure(Species::I, 1), 10.0, 0.01, 8.8e10));
    entries.push(ClusterSpec::new(Composition::pure(Species::I, 2), 18.5, f64::INFINITY, 0.0));
    for n in 1..=7 {
        let ef = 5.14 + 4.0 * f64::from(n - 1);
        entries.push(ClusterSpec::new(he(n).with(Species::V, 1), ef, f64::INFINITY, 0.0));
    }
    entries.push(ClusterSpec::new(he(7).with(Species::V, 2), 33.0, f64::INFINITY, 0.0));
    ClusterCatalog::new(TUNGSTEN_LATTICE, entries).expect("valid He-V catalog")
}

/// Xe₁..Xe_max; Xe₁ and Xe₂ mobile.
pub fn xenon_catalog(max: u32) -> ClusterCatalog {
    let entries = (1..=max)
        .map(|n| {
            let d0 = if n <= 2 { 7.6e9 / f64::from(n) } else { 0.0 };
            let ef = 7.0 * f64::from(n).powf(2.0 / 3.0);
            ClusterSpec::new(Composition::pure(Species::Xe, n), ef, 0.65, d0)
        })
        .collect();
    ClusterCatalog::new(0.5, entries).expect("valid xenon catalog")
}

/// D₁, D₂, T₁ and V₁; the size-1 isotopes are mobile.
pub fn hydrogen_catalog() -> ClusterCatalog {
    let entries = vec![
        ClusterSpec::new(Composition::pure(Species::D, 1), 1.0, 0.38, 2.83e11),
        ClusterSpec::new(Composition::pure(Species::D, 2), 1.8, f64::INFINITY, 0.0),
        ClusterSpec::new(Composition::pure(Species::T, 1), 1.0, 0.38, 2.31e11),
        ClusterSpec::new(Composition::pure(Species::V, 1), 3.6, 1.3, 1.8e12),
    ];
    ClusterCatalog::new(TUNGSTEN_LATTICE, entries).expect("valid hydrogen catalog")
}

/// Build a network with the default configuration.
pub fn network(catalog: &ClusterCatalog) -> ReactionNetwork {
    ReactionNetwork::build(catalog, &NetworkConfig::default()).expect("valid network")
}
