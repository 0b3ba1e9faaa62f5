//! Benchmark profiles and utilities for spall.
//!
//! Provides pre-built solver setups for benchmarking:
//!
//! - [`tungsten_profile`]: He–V network under plasma exposure, with
//!   implantation, diffusion, surface advection and trap mutation
//! - [`fuel_profile`]: grouped xenon network with implantation,
//!   diffusion and re-solution
//! - [`seeded_state`]: deterministic ghost-padded concentrations

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spall_core::{Composition, NetworkError, Species};
use spall_grid::GridSpec;
use spall_handlers::{
    AdvectionHandler, DepthProfile, DiffusionHandler, Handler, IncidentFluxHandler,
    ReSolutionHandler, SinkStrengthTable, TrapMutationHandler,
};
use spall_network::{
    ClusterCatalog, ClusterSpec, DislocationSink, GroupingConfig, NetworkConfig, ReactionNetwork,
};
use spall_solver::{SolverConfig, SolverError, SolverHandler, TemperatureProfile};

/// Error type of the profile builders: handler builders report `String`,
/// everything else a typed error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Tungsten lattice parameter (nm).
pub const TUNGSTEN_LATTICE: f64 = 0.317;

/// He₁..He₈, V₁..V₃, I₁..I₂ and every HeₙVₘ with n ≤ 8.
pub fn tungsten_catalog() -> Result<ClusterCatalog, NetworkError> {
    let mut entries = Vec::new();
    let helium_d0 = [2.95e10, 3.24e10, 2.26e10, 1.68e10, 5.20e10, 2.03e10, 1.58e10];
    for n in 1..=8u32 {
        let d0 = helium_d0.get(n as usize - 1).copied().unwrap_or(0.0);
        let em = if d0 > 0.0 { 0.13 } else { f64::INFINITY };
        entries.push(ClusterSpec::new(
            Composition::pure(Species::He, n),
            6.15 * f64::from(n).powf(0.85),
            em,
            d0,
        ));
    }
    for m in 1..=3u32 {
        let (em, d0) = if m == 1 {
            (1.30, 1.8e12)
        } else {
            (f64::INFINITY, 0.0)
        };
        entries.push(ClusterSpec::new(
            Composition::pure(Species::V, m),
            3.6 * f64::from(m).powf(0.8),
            em,
            d0,
        ));
        for n in 1..=8 {
            let ef = 3.6 * f64::from(m).powf(0.8) + 1.5 * f64::from(n);
            entries.push(ClusterSpec::new(
                Composition::pure(Species::He, n).with(Species::V, m),
                ef,
                f64::INFINITY,
                0.0,
            ));
        }
    }
    entries.push(ClusterSpec::new(Composition::pure(Species::I, 1), 10.0, 0.01, 8.8e10));
    entries.push(ClusterSpec::new(
        Composition::pure(Species::I, 2),
        18.5,
        f64::INFINITY,
        0.0,
    ));
    ClusterCatalog::new(TUNGSTEN_LATTICE, entries)
}

/// Xe₁..Xe_max with Xe₁ mobile.
pub fn xenon_catalog(max: u32) -> Result<ClusterCatalog, NetworkError> {
    let entries = (1..=max)
        .map(|n| {
            let d0 = if n == 1 { 7.6e9 } else { 0.0 };
            let em = if n == 1 { 0.65 } else { f64::INFINITY };
            ClusterSpec::new(
                Composition::pure(Species::Xe, n),
                7.0 * f64::from(n).powf(2.0 / 3.0),
                em,
                d0,
            )
        })
        .collect();
    ClusterCatalog::new(0.547, entries)
}

/// Tungsten under helium plasma: `points` nodes 0.1 nm apart at 1000 K.
///
/// Pipeline: IncidentFlux → Diffusion → Advection(surface) →
/// TrapMutation, with a dislocation sink on the network.
pub fn tungsten_profile(points: usize) -> Result<SolverHandler, BoxError> {
    let network = ReactionNetwork::build(
        &tungsten_catalog()?,
        &NetworkConfig {
            grouping: None,
            dislocation_sink: Some(DislocationSink {
                strength: 1.0e-4,
                interstitial_bias: 1.05,
            }),
        },
    )?;
    let handlers: Vec<Handler> = vec![
        IncidentFluxHandler::builder()
            .amplitude(4.0e-2)
            .profile(DepthProfile::Polynomial {
                coefficients: vec![0.0, 1.2, -0.4],
                cutoff: 3.0,
            })
            .species(Species::He, 1.0)
            .build()?
            .into(),
        DiffusionHandler::new().into(),
        AdvectionHandler::builder()
            .table(SinkStrengthTable::w100())
            .build()?
            .into(),
        TrapMutationHandler::builder()
            .attenuation(0.5)
            .build()?
            .into(),
    ];
    let config = SolverConfig {
        grid: GridSpec::Uniform {
            points,
            spacing: 0.1,
        },
        temperature: TemperatureProfile::Constant(1000.0),
        initial_vacancy_concentration: 1.0e-6,
        ..SolverConfig::default()
    };
    Ok(SolverHandler::new(config, network, handlers)?)
}

/// Nuclear fuel: xenon up to `max_size`, grouped from size 20 in bins of
/// 10, on `points` nodes 5 nm apart with a 1800 K to 1200 K gradient.
pub fn fuel_profile(points: usize, max_size: u32) -> Result<SolverHandler, BoxError> {
    let network = ReactionNetwork::build(
        &xenon_catalog(max_size)?,
        &NetworkConfig {
            grouping: Some(GroupingConfig {
                species: Species::Xe,
                threshold: 20,
                width: 10,
            }),
            dislocation_sink: None,
        },
    )?;
    let handlers: Vec<Handler> = vec![
        IncidentFluxHandler::builder()
            .amplitude(1.0e-4)
            .profile(DepthProfile::Polynomial {
                coefficients: vec![1.0],
                cutoff: 5.0 * points as f64,
            })
            .species(Species::Xe, 1.0)
            .build()?
            .into(),
        DiffusionHandler::new().into(),
        ReSolutionHandler::builder()
            .threshold(1)
            .prefactor(1.0e-2)
            .stopping_power(2.0)
            .build()?
            .into(),
    ];
    let config = SolverConfig {
        grid: GridSpec::Uniform {
            points,
            spacing: 5.0,
        },
        temperature: TemperatureProfile::Gradient {
            surface: 1800.0,
            bulk: 1200.0,
        },
        ..SolverConfig::default()
    };
    Ok(SolverHandler::new(config, network, handlers)?)
}

/// Ghost-padded state with every cluster slot drawn uniformly from
/// `[0, max)` and temperatures taken from the solver's initial
/// conditions.
///
/// The same `seed` always produces the same state.
pub fn seeded_state(solver: &SolverHandler, seed: u64, max: f64) -> Result<Vec<f64>, SolverError> {
    let mut state = vec![0.0; solver.state_len()];
    solver.initialize_concentration(&mut state)?;
    let dof = solver.dof();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for chunk in state.chunks_mut(dof) {
        for v in &mut chunk[..dof - 1] {
            *v = max * unit(&mut rng);
        }
    }
    // Ghosts take the temperature of their neighbours.
    let len = state.len();
    state[dof - 1] = state[2 * dof - 1];
    state[len - 1] = state[len - dof - 1];
    Ok(state)
}

/// Uniform in `[0, 1)` from the top 53 bits.
fn unit(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tungsten_profile_builds() {
        let solver = tungsten_profile(40).unwrap();
        assert_eq!(solver.handlers().len(), 4);
        assert!(solver.network().dof() > 30);
    }

    #[test]
    fn fuel_profile_groups() {
        let solver = fuel_profile(16, 200).unwrap();
        assert_eq!(solver.network().normal_count(), 19);
        assert_eq!(solver.network().groups().len(), 19);
    }

    #[test]
    fn seeded_state_is_deterministic() {
        let solver = tungsten_profile(12).unwrap();
        let a = seeded_state(&solver, 42, 1.0e-3).unwrap();
        let b = seeded_state(&solver, 42, 1.0e-3).unwrap();
        let c = seeded_state(&solver, 7, 1.0e-3).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        let dof = solver.dof();
        assert!(a
            .chunks(dof)
            .all(|p| p[..dof - 1].iter().all(|&v| (0.0..1.0e-3).contains(&v))));
    }
}
