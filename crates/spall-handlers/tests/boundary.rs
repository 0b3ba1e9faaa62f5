//! Integration tests for the boundary-localized handlers.

use proptest::prelude::*;
use spall_core::{Composition, HandlerError, JacobianEntry, Species};
use spall_grid::{Grid1D, OwnedRange};
use spall_handler::{
    Aggregates, FillMaps, Neighborhood, PhysicsHandler, PointContext, SetupContext,
};
use spall_handlers::{
    DepthProfile, DesorptionHandler, IncidentFluxHandler, ReSolutionHandler, TrapMutationHandler,
    TrapMutationTable,
};
use spall_network::{ClusterCatalog, GroupingConfig, NetworkConfig, ReactionNetwork};
use spall_test_utils::catalogs::{
    he_v_catalog, helium_catalog, hydrogen_catalog, network, xenon_catalog,
};
use spall_test_utils::{location, uniform_grid, DenseJacobian};

const TEMPERATURE: f64 = 1000.0;

fn heated(net: &mut ReactionNetwork, points: usize) {
    for local in 0..points {
        net.set_temperature(local, TEMPERATURE);
    }
}

fn ctx<'a>(
    net: &'a ReactionNetwork,
    grid: &Grid1D,
    owned: OwnedRange,
    conc: &'a [f64],
    point: usize,
    surface: usize,
    trapped: f64,
) -> PointContext<'a> {
    let loc = location(grid, owned, point, surface);
    PointContext::new(
        net.bind(conc, loc.local),
        Neighborhood {
            left: conc,
            mid: conc,
            right: conc,
        },
        loc,
        0.0,
        Aggregates {
            trapped_concentration: trapped,
        },
    )
}

fn uniform_state(net: &ReactionNetwork, value: f64) -> Vec<f64> {
    let mut c = vec![value; net.dof()];
    c[net.temperature_slot()] = TEMPERATURE;
    c
}

// ── Trap mutation ──────────────────────────────────────────────────

fn slot(net: &ReactionNetwork, composition: Composition) -> usize {
    net.get_by_composition(&composition).unwrap().id().index()
}

#[test]
fn trap_mutation_follows_depth_table() {
    let grid = uniform_grid(12, 0.1);
    let owned = OwnedRange::whole(grid.len());
    let mut net = network(&he_v_catalog());
    heated(&mut net, owned.len());
    let setup = SetupContext::new(&net, &grid, owned, 0, TEMPERATURE);
    let mut fill = FillMaps::new(net.dof());
    let mut trap = TrapMutationHandler::builder().build().unwrap();
    trap.initialize(&setup, &mut fill).unwrap();

    // W100: He1 has no vacancy, the other six mutate.
    assert_eq!(trap.channel_count(), 6);
    assert_eq!(trap.active_count(0), 0);
    assert_eq!(trap.active_count(5), 6);
    assert_eq!(trap.active_count(7), 3);
    assert_eq!(trap.active_count(9), 0);

    let he2 = slot(&net, Composition::pure(Species::He, 2));
    let he2v = slot(&net, Composition::pure(Species::He, 2).with(Species::V, 1));
    let i1 = slot(&net, Composition::pure(Species::I, 1));
    assert!(fill.dfill.is_marked(he2v, he2));
    assert!(fill.dfill.is_marked(i1, he2));

    let conc = uniform_state(&net, 1.0e-3);
    let c = ctx(&net, &grid, owned, &conc, 5, 0, 0.0);
    let k = trap.mutation_rate(5);
    assert!(k > 0.0);
    assert_eq!(k, 1000.0 * net.largest_rate(5));

    let mut out = vec![0.0; net.dof()];
    trap.compute_flux(&c, &mut out);
    assert!((out[he2] + k * 1.0e-3).abs() <= 1e-12 * k * 1.0e-3);
    assert!((out[he2v] - k * 1.0e-3).abs() <= 1e-12 * k * 1.0e-3);
    // Six channels all emit I1.
    assert!((out[i1] - 6.0 * k * 1.0e-3).abs() <= 1e-12 * k);
    let helium = net.bind(&out, 5).total_atom_concentration(Species::He);
    assert!(helium.abs() <= 1e-12 * k);

    let n = trap.participant_count(&c);
    let mut indices = vec![0; 3 * n];
    let mut values = vec![0.0; 3 * n];
    assert_eq!(trap.compute_partials(&c, &mut indices, &mut values).unwrap(), 6);
    let mut jac = DenseJacobian::new();
    trap.emit_partials(&c, &indices, &values, n, &mut jac);
    assert_eq!(jac.get(5, he2, 5, he2), -k);
    assert_eq!(jac.get(5, he2v, 5, he2), k);
    assert!((jac.get(5, i1, 5, he2) - k).abs() <= 1e-12 * k);
}

#[test]
fn trap_mutation_attenuates_and_cuts_off() {
    let grid = uniform_grid(12, 0.1);
    let owned = OwnedRange::whole(grid.len());
    let mut net = network(&he_v_catalog());
    heated(&mut net, owned.len());
    let setup = SetupContext::new(&net, &grid, owned, 0, TEMPERATURE);
    let mut fill = FillMaps::new(net.dof());
    let mut trap = TrapMutationHandler::builder()
        .attenuation(2.0)
        .cutoff(50.0)
        .build()
        .unwrap();
    trap.initialize(&setup, &mut fill).unwrap();

    let conc = uniform_state(&net, 1.0e-3);
    let he2 = slot(&net, Composition::pure(Species::He, 2));
    let k = trap.mutation_rate(5);

    let mut out = vec![0.0; net.dof()];
    trap.compute_flux(&ctx(&net, &grid, owned, &conc, 5, 0, 0.5), &mut out);
    let expected = -k * (-1.0f64).exp() * 1.0e-3;
    assert!(((out[he2] - expected) / expected).abs() < 1e-12);

    // 2 · 30 > 50: switched off entirely.
    let off = ctx(&net, &grid, owned, &conc, 5, 0, 30.0);
    assert_eq!(trap.participant_count(&off), 0);
    let mut out = vec![0.0; net.dof()];
    trap.compute_flux(&off, &mut out);
    assert!(out.iter().all(|&v| v == 0.0));
    assert_eq!(trap.compute_partials(&off, &mut [], &mut []).unwrap(), 0);

    // 2 · 25 == 50 is already past the cutoff.
    let edge = ctx(&net, &grid, owned, &conc, 5, 0, 25.0);
    assert_eq!(trap.participant_count(&edge), 0);
    let mut out = vec![0.0; net.dof()];
    trap.compute_flux(&edge, &mut out);
    assert!(out.iter().all(|&v| v == 0.0));

    // Just below it mutation is still on.
    let below = ctx(&net, &grid, owned, &conc, 5, 0, 24.999);
    assert_eq!(trap.participant_count(&below), 6);
}

#[test]
fn w111_uses_setup_temperature() {
    let grid = uniform_grid(16, 0.1);
    let owned = OwnedRange::whole(grid.len());
    let mut net = network(&he_v_catalog());
    heated(&mut net, owned.len());
    let mut fill = FillMaps::new(net.dof());

    let mut cold = TrapMutationHandler::builder()
        .table(TrapMutationTable::W111)
        .build()
        .unwrap();
    cold.initialize(&SetupContext::new(&net, &grid, owned, 0, 900.0), &mut fill)
        .unwrap();
    let mut hot = cold.clone();
    hot.initialize(&SetupContext::new(&net, &grid, owned, 0, 1200.0), &mut fill)
        .unwrap();

    assert_eq!(cold.channel_count(), 7);
    // Depth 1.2 nm: He5 (1.2), He6 and He7 (1.3) when cold, nothing when hot.
    assert_eq!(cold.active_count(12), 3);
    assert_eq!(hot.active_count(12), 0);
    let he7v2 = slot(&net, Composition::pure(Species::He, 7).with(Species::V, 2));
    let he7 = slot(&net, Composition::pure(Species::He, 7));
    assert!(fill.dfill.is_marked(he7v2, he7));
}

/// He₁ loss at point 5 split into `(lost, mutated)`, from both the
/// flux and the Jacobian.
fn he1_split(
    trap: &TrapMutationHandler,
    net: &ReactionNetwork,
    grid: &Grid1D,
    owned: OwnedRange,
    conc: &[f64],
) -> ((f64, f64), (f64, f64)) {
    let he1 = slot(net, Composition::pure(Species::He, 1));
    let he1v = slot(net, Composition::pure(Species::He, 1).with(Species::V, 1));
    let c = ctx(net, grid, owned, conc, 5, 0, 0.0);
    let mut out = vec![0.0; net.dof()];
    trap.compute_flux(&c, &mut out);
    let n = trap.participant_count(&c);
    let mut indices = vec![0; 3 * n];
    let mut values = vec![0.0; 3 * n];
    let count = trap.compute_partials(&c, &mut indices, &mut values).unwrap();
    let mut jac = DenseJacobian::new();
    trap.emit_partials(&c, &indices, &values, count, &mut jac);
    (
        (-out[he1], out[he1v]),
        (-jac.get(5, he1, 5, he1), jac.get(5, he1v, 5, he1)),
    )
}

#[test]
fn w111_he1_partly_desorbs_on_both_sides_of_transition() {
    let grid = uniform_grid(12, 0.1);
    let owned = OwnedRange::whole(grid.len());
    let mut net = network(&he_v_catalog());
    heated(&mut net, owned.len());
    let mut fill = FillMaps::new(net.dof());
    let mut trap = TrapMutationHandler::builder()
        .table(TrapMutationTable::W111)
        .build()
        .unwrap();
    trap.initialize(&SetupContext::new(&net, &grid, owned, 0, TEMPERATURE), &mut fill)
        .unwrap();
    let conc = uniform_state(&net, 1.0e-3);
    let close = |a: f64, b: f64| (a - b).abs() <= 1e-12 * b.abs();

    // 1000 K: 61 % of the He₁ leaving through the channel desorbs.
    assert_eq!(trap.desorbed_fraction(5), 0.61);
    let k = trap.mutation_rate(5);
    let ((lost, mutated), (d_lost, d_mutated)) = he1_split(&trap, &net, &grid, owned, &conc);
    assert!(close(lost, k * 1.0e-3));
    assert!(close(mutated, 0.39 * k * 1.0e-3));
    assert!(close(d_lost, k));
    assert!(close(d_mutated, 0.39 * k));

    // 1100 K: only 35 % desorbs.
    net.set_temperature(5, 1100.0);
    trap.refresh_temperature(5, 1100.0, &net);
    assert_eq!(trap.desorbed_fraction(5), 0.35);
    assert_eq!(trap.desorbed_fraction(4), 0.61);
    let k = trap.mutation_rate(5);
    let ((lost, mutated), (d_lost, d_mutated)) = he1_split(&trap, &net, &grid, owned, &conc);
    assert!(close(lost, k * 1.0e-3));
    assert!(close(mutated, 0.65 * k * 1.0e-3));
    assert!(close(d_lost, k));
    assert!(close(d_mutated, 0.65 * k));
}

#[test]
fn w100_has_no_helium_desorption() {
    let grid = uniform_grid(12, 0.1);
    let owned = OwnedRange::whole(grid.len());
    let mut net = network(&he_v_catalog());
    heated(&mut net, owned.len());
    let mut fill = FillMaps::new(net.dof());
    let mut trap = TrapMutationHandler::builder().build().unwrap();
    trap.initialize(&SetupContext::new(&net, &grid, owned, 0, TEMPERATURE), &mut fill)
        .unwrap();
    assert_eq!(trap.desorbed_fraction(5), 0.0);
}

// ── Desorption ─────────────────────────────────────────────────────

fn desorption_setup() -> (Grid1D, OwnedRange, ReactionNetwork, DesorptionHandler) {
    let grid = uniform_grid(6, 0.5);
    let owned = OwnedRange::whole(grid.len());
    let mut net = network(&hydrogen_catalog());
    heated(&mut net, owned.len());
    let mut desorption = DesorptionHandler::builder()
        .recombination(1.0e-2, 0.2)
        .equilibrium(1.0e-4)
        .build()
        .unwrap();
    let mut fill = FillMaps::new(net.dof());
    desorption
        .initialize(&SetupContext::new(&net, &grid, owned, 1, TEMPERATURE), &mut fill)
        .unwrap();
    (grid, owned, net, desorption)
}

#[test]
fn desorption_only_next_to_surface() {
    let (grid, owned, net, desorption) = desorption_setup();
    let d1 = slot(&net, Composition::pure(Species::D, 1));
    let t1 = slot(&net, Composition::pure(Species::T, 1));
    assert_eq!(desorption.desorbing_slots(), &[d1, t1]);

    let conc = uniform_state(&net, 1.0e-2);
    for point in [0, 1, 3, 4] {
        let c = ctx(&net, &grid, owned, &conc, point, 1, 0.0);
        assert_eq!(desorption.participant_count(&c), 0);
    }
    let c = ctx(&net, &grid, owned, &conc, 2, 1, 0.0);
    assert_eq!(desorption.participant_count(&c), 2);

    let k = desorption.rate(2);
    assert!(k > 0.0);
    let mut out = vec![0.0; net.dof()];
    desorption.compute_flux(&c, &mut out);
    let excess = 1.0e-2 - 1.0e-4;
    assert!((out[d1] + k * excess * excess).abs() <= 1e-12 * k);
    let d2 = slot(&net, Composition::pure(Species::D, 2));
    assert_eq!(out[d2], 0.0);

    let mut indices = vec![0; 2];
    let mut values = vec![0.0; 2];
    desorption.compute_partials(&c, &mut indices, &mut values).unwrap();
    assert_eq!(indices, vec![d1, t1]);
    assert!((values[0] + 2.0 * k * excess).abs() <= 1e-12 * k);
}

#[test]
fn desorption_counts_only_above_floor() {
    let (grid, owned, net, desorption) = desorption_setup();
    let d1 = slot(&net, Composition::pure(Species::D, 1));
    let mut conc = uniform_state(&net, 1.0e-4);
    conc[d1] = 1.0;
    let c = ctx(&net, &grid, owned, &conc, 2, 1, 0.0);
    assert_eq!(desorption.participant_count(&c), 1);
    let mut indices = vec![0; 2];
    let mut values = vec![0.0; 2];
    assert_eq!(desorption.compute_partials(&c, &mut indices, &mut values).unwrap(), 1);
    assert_eq!(indices[0], d1);
}

proptest! {
    #[test]
    fn desorption_monotone_above_floor(low in 1.0e-4f64..1.0, gap in 1.0e-6f64..1.0) {
        let (grid, owned, net, desorption) = desorption_setup();
        let d1 = slot(&net, Composition::pure(Species::D, 1));
        let flux_at = |c: f64| {
            let mut conc = uniform_state(&net, 0.0);
            conc[d1] = c;
            let mut out = vec![0.0; net.dof()];
            desorption.compute_flux(&ctx(&net, &grid, owned, &conc, 2, 1, 0.0), &mut out);
            out[d1]
        };
        let eq = desorption.equilibrium();
        prop_assert_eq!(flux_at(eq), 0.0);
        prop_assert_eq!(flux_at(eq * 0.5), 0.0);
        let a = flux_at(eq + low);
        let b = flux_at(eq + low + gap);
        prop_assert!(a < 0.0);
        prop_assert!(b < a);
    }
}

// ── Re-solution ────────────────────────────────────────────────────

fn grouped_xenon() -> ReactionNetwork {
    let config = NetworkConfig {
        grouping: Some(GroupingConfig {
            species: Species::Xe,
            threshold: 5,
            width: 4,
        }),
        dislocation_sink: None,
    };
    ReactionNetwork::build(&xenon_catalog(20), &config).unwrap()
}

fn resolution_setup() -> (Grid1D, OwnedRange, ReactionNetwork, ReSolutionHandler, FillMaps) {
    let grid = uniform_grid(4, 1.0);
    let owned = OwnedRange::whole(grid.len());
    let mut net = grouped_xenon();
    heated(&mut net, owned.len());
    let mut fill = FillMaps::new(net.dof());
    let mut resolution = ReSolutionHandler::builder()
        .prefactor(1.0e-3)
        .stopping_power(2.0)
        .build()
        .unwrap();
    resolution
        .initialize(&SetupContext::new(&net, &grid, owned, 0, TEMPERATURE), &mut fill)
        .unwrap();
    resolution.set_flux_amplitude(5.0);
    (grid, owned, net, resolution, fill)
}

#[test]
fn resolution_conserves_atoms() {
    let (grid, owned, net, resolution, _) = resolution_setup();
    assert!(resolution.channel_count() > 0);
    assert!((resolution.rate() - 1.0e-2).abs() < 1e-15);

    let mut conc: Vec<f64> = (0..net.dof()).map(|i| 1.0e-3 * (1.0 + i as f64)).collect();
    for g in net.groups() {
        conc[g.moment_slot()] = 2.0e-6;
    }
    conc[net.temperature_slot()] = TEMPERATURE;

    let mut out = vec![0.0; net.dof()];
    resolution.compute_flux(&ctx(&net, &grid, owned, &conc, 1, 0, 0.0), &mut out);
    let xe1 = slot(&net, Composition::pure(Species::Xe, 1));
    assert!(out[xe1] > 0.0);
    let atoms = net.bind(&out, 1).total_atom_concentration(Species::Xe);
    let scale: f64 = out.iter().map(|v| v.abs()).sum();
    assert!(atoms.abs() <= 1e-12 * scale, "atom drift {atoms}");
}

#[test]
fn resolution_partials_are_the_linear_map() {
    let (grid, owned, net, resolution, fill) = resolution_setup();
    let dof = net.dof();
    let zero = uniform_state(&net, 0.0);
    let c = ctx(&net, &grid, owned, &zero, 1, 0, 0.0);

    let n = resolution.participant_count(&c);
    let shape = resolution.partials_shape();
    let (ni, nv) = shape.required(n);
    let mut indices = vec![0; ni];
    let mut values = vec![0.0; nv];
    assert_eq!(resolution.compute_partials(&c, &mut indices, &mut values).unwrap(), n);
    let mut jac = DenseJacobian::new();
    resolution.emit_partials(&c, &indices, &values, n, &mut jac);

    // The flux is linear: column `col` of the Jacobian is the flux of
    // the unit vector along `col`.
    for col in 0..net.temperature_slot() {
        let mut unit = zero.clone();
        unit[col] = 1.0;
        let mut column = vec![0.0; dof];
        resolution.compute_flux(&ctx(&net, &grid, owned, &unit, 1, 0, 0.0), &mut column);
        let scale = column.iter().map(|v| v.abs()).fold(1.0e-30, f64::max);
        for (row, &expected) in column.iter().enumerate() {
            let got = jac.get(1, row, 1, col);
            assert!(
                (got - expected).abs() <= 1e-12 * scale,
                "({row}, {col}): {got} vs {expected}"
            );
            if got != 0.0 {
                assert!(fill.dfill.is_marked(row, col), "({row}, {col}) not in dfill");
            }
        }
    }
}

#[test]
fn resolution_emits_same_entries_at_zero_rate() {
    let (grid, owned, net, mut resolution, fill) = resolution_setup();
    let zero = uniform_state(&net, 0.0);
    let n = resolution.participant_count(&ctx(&net, &grid, owned, &zero, 1, 0, 0.0));
    let (ni, nv) = resolution.partials_shape().required(n);

    let emit = |resolution: &ReSolutionHandler| {
        let c = ctx(&net, &grid, owned, &zero, 1, 0, 0.0);
        let mut indices = vec![0; ni];
        let mut values = vec![0.0; nv];
        let count = resolution.compute_partials(&c, &mut indices, &mut values).unwrap();
        let mut entries: Vec<JacobianEntry> = Vec::new();
        resolution.emit_partials(&c, &indices, &values, count, &mut entries);
        entries
    };
    let live = emit(&resolution);
    resolution.set_flux_amplitude(0.0);
    let idle = emit(&resolution);

    assert!(!live.is_empty());
    assert_eq!(live.len(), idle.len());
    for (a, b) in live.iter().zip(&idle) {
        assert_eq!((a.row, a.col), (b.row, b.col));
        assert_eq!(b.value, 0.0);
        assert!(fill.dfill.is_marked(a.row, a.col), "({}, {}) not in dfill", a.row, a.col);
    }
}

#[test]
fn resolution_needs_single_atom() {
    let catalog = ClusterCatalog::new(
        0.5,
        xenon_catalog(6).entries()[1..].to_vec(),
    )
    .unwrap();
    let net = network(&catalog);
    let grid = uniform_grid(4, 1.0);
    let owned = OwnedRange::whole(grid.len());
    let mut resolution = ReSolutionHandler::builder().build().unwrap();
    let err = resolution
        .initialize(
            &SetupContext::new(&net, &grid, owned, 0, TEMPERATURE),
            &mut FillMaps::new(net.dof()),
        )
        .unwrap_err();
    assert!(matches!(err, HandlerError::MissingCluster { .. }));
}

// ── Incident flux ──────────────────────────────────────────────────

#[test]
fn incident_flux_profile_is_normalized() {
    let grid = uniform_grid(10, 0.5);
    let owned = OwnedRange::whole(grid.len());
    let mut net = network(&helium_catalog());
    heated(&mut net, owned.len());
    let mut flux = IncidentFluxHandler::builder()
        .amplitude(2.0)
        .profile(DepthProfile::Polynomial {
            coefficients: vec![1.0, -0.2],
            cutoff: 3.0,
        })
        .species(Species::He, 1.0)
        .build()
        .unwrap();
    flux.initialize(
        &SetupContext::new(&net, &grid, owned, 2, TEMPERATURE),
        &mut FillMaps::new(net.dof()),
    )
    .unwrap();

    let integral: f64 = owned
        .iter()
        .map(|p| flux.weight(p) * grid.step_sizes(p).cell_width())
        .sum();
    assert!((integral - 1.0).abs() < 1e-12);
    assert_eq!(flux.weight(2), 0.0);
    assert_eq!(flux.weight(1), 0.0);

    let conc = uniform_state(&net, 0.0);
    let c = ctx(&net, &grid, owned, &conc, 4, 2, 0.0);
    let mut out = vec![0.0; net.dof()];
    flux.compute_flux(&c, &mut out);
    let he1 = slot(&net, Composition::pure(Species::He, 1));
    assert!((out[he1] - 2.0 * flux.weight(4)).abs() < 1e-12);
    assert!(out.iter().enumerate().all(|(i, &v)| i == he1 || v == 0.0));
    assert_eq!(flux.participant_count(&c), 0);
}

#[test]
fn incident_flux_requires_single_atom() {
    let net = network(&xenon_catalog(4));
    let grid = uniform_grid(4, 1.0);
    let mut flux = IncidentFluxHandler::builder()
        .amplitude(1.0)
        .profile(DepthProfile::Polynomial {
            coefficients: vec![1.0],
            cutoff: 5.0,
        })
        .species(Species::He, 1.0)
        .build()
        .unwrap();
    let err = flux
        .initialize(
            &SetupContext::new(&net, &grid, OwnedRange::whole(4), 0, TEMPERATURE),
            &mut FillMaps::new(net.dof()),
        )
        .unwrap_err();
    assert_eq!(
        err,
        HandlerError::MissingCluster {
            handler: "incident flux".into(),
            composition: Composition::pure(Species::He, 1),
        }
    );
}
