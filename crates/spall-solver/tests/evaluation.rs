//! End-to-end evaluation through `SolverHandler`.

use spall_core::{Composition, LinearTable, LocalReduction, Species};
use spall_grid::GridSpec;
use spall_handler::{Aggregates, JacobianPass};
use spall_handlers::{
    AdvectionHandler, DepthProfile, DesorptionHandler, DiffusionHandler, Handler,
    IncidentFluxHandler, ReSolutionHandler, SinkStrengthTable, TrapMutationHandler,
};
use spall_network::ReactionNetwork;
use spall_solver::{SolverConfig, SolverError, SolverHandler, TemperatureProfile};
use spall_test_utils::catalogs::{he_v_catalog, helium_catalog, network, xenon_catalog};
use spall_test_utils::{DenseJacobian, FailingReduction, OffsetReduction, PaddedState};

fn uniform(points: usize, spacing: f64) -> SolverConfig {
    SolverConfig {
        grid: GridSpec::Uniform { points, spacing },
        ..SolverConfig::default()
    }
}

fn transport() -> Vec<Handler> {
    vec![
        DiffusionHandler::new().into(),
        AdvectionHandler::builder()
            .table(SinkStrengthTable::w100())
            .build()
            .unwrap()
            .into(),
    ]
}

/// Smooth positive profile; ghosts get the same formula.
fn profile(solver: &SolverHandler) -> PaddedState {
    let t = solver.dof() - 1;
    PaddedState::new(solver.dof(), solver.owned()).fill(|point, slot| {
        if slot == t {
            1000.0
        } else {
            1.0e-3 * (1.0 + 0.1 * slot as f64) * (1.0 + 0.05 * point as f64)
        }
    })
}

// ── Ordering and exclusion ─────────────────────────────────────────

#[test]
fn out_of_order_handlers_are_rejected() {
    let handlers: Vec<Handler> = vec![
        AdvectionHandler::builder()
            .table(SinkStrengthTable::w100())
            .build()
            .unwrap()
            .into(),
        DiffusionHandler::new().into(),
    ];
    let err = SolverHandler::new(uniform(8, 1.0), network(&helium_catalog()), handlers)
        .unwrap_err();
    assert!(matches!(err, SolverError::Pipeline(_)));
}

#[test]
fn excluded_points_produce_no_output() {
    let mut config = uniform(10, 1.0);
    config.surface = 2;
    config.grain_boundaries = vec![6];
    let mut solver =
        SolverHandler::new(config, network(&helium_catalog()), transport()).unwrap();
    let state = profile(&solver);
    let mut out = vec![0.0; solver.output_len()];
    let metrics = solver
        .compute_rhs(0.0, state.as_slice(), Aggregates::default(), &mut out)
        .unwrap();
    assert_eq!(metrics.points_visited, 5);
    assert_eq!(metrics.points_skipped, 5);

    let dof = solver.dof();
    for point in 0..10 {
        let rates = &out[point * dof..(point + 1) * dof];
        if solver.is_excluded(point) {
            assert!(rates.iter().all(|&v| v == 0.0), "point {point}");
        } else {
            assert!(rates.iter().any(|&v| v != 0.0), "point {point}");
        }
    }
}

#[test]
fn network_only_rhs_matches_bound_network() {
    let net = network(&helium_catalog());
    let mut solver = SolverHandler::new(uniform(6, 1.0), net, Vec::new()).unwrap();
    let state = profile(&solver);
    let mut out = vec![0.0; solver.output_len()];
    solver
        .compute_rhs(0.0, state.as_slice(), Aggregates::default(), &mut out)
        .unwrap();

    let dof = solver.dof();
    let mut expected = vec![0.0; dof];
    solver
        .network()
        .bind(state.point(3), 3)
        .compute_all_fluxes(&mut expected);
    assert_eq!(&out[3 * dof..4 * dof], expected.as_slice());
}

// ── Temperature ────────────────────────────────────────────────────

#[test]
fn temperature_refreshes_only_beyond_tolerance() {
    let mut config = uniform(6, 1.0);
    config.temperature = TemperatureProfile::FromState { initial: 1000.0 };
    let mut solver = SolverHandler::new(config, network(&helium_catalog()), transport()).unwrap();
    let t = solver.dof() - 1;
    let mut out = vec![0.0; solver.output_len()];

    let state = profile(&solver).with_slot(t, 1000.05);
    let m = solver
        .compute_rhs(0.0, state.as_slice(), Aggregates::default(), &mut out)
        .unwrap();
    assert_eq!(m.temperature_refreshes, 0);
    assert_eq!(solver.temperature(2), Some(1000.0));

    let state = profile(&solver).with_slot(t, 1200.0);
    let m = solver
        .compute_rhs(0.0, state.as_slice(), Aggregates::default(), &mut out)
        .unwrap();
    assert_eq!(m.temperature_refreshes, m.points_visited);
    assert_eq!(solver.temperature(2), Some(1200.0));
    // Excluded points keep their old caches.
    assert_eq!(solver.temperature(0), Some(1000.0));

    let m = solver
        .compute_rhs(0.0, state.as_slice(), Aggregates::default(), &mut out)
        .unwrap();
    assert_eq!(m.temperature_refreshes, 0);
}

#[test]
fn gradient_sets_initial_temperatures() {
    let mut config = uniform(11, 1.0);
    config.temperature = TemperatureProfile::Gradient {
        surface: 1000.0,
        bulk: 500.0,
    };
    let solver = SolverHandler::new(config, network(&helium_catalog()), Vec::new()).unwrap();
    assert_eq!(solver.temperature(0), Some(1000.0));
    assert_eq!(solver.temperature(10), Some(500.0));
    assert_eq!(solver.network().temperature(5), 750.0);

    let mut state = vec![0.0; solver.state_len()];
    solver.initialize_concentration(&mut state).unwrap();
    let dof = solver.dof();
    // Owned point 5 sits at padded index 6.
    assert_eq!(state[7 * dof - 1], 750.0);
}

// ── Jacobian ───────────────────────────────────────────────────────

#[test]
fn jacobian_matches_finite_differences() {
    let mut solver =
        SolverHandler::new(uniform(6, 0.5), network(&helium_catalog()), transport()).unwrap();
    let dof = solver.dof();
    let state = profile(&solver);
    let aggregates = Aggregates::default();

    let mut jac = DenseJacobian::new();
    let off = solver
        .compute_off_diagonal_jacobian(0.0, state.as_slice(), aggregates, &mut jac)
        .unwrap();
    let diag = solver
        .compute_diagonal_jacobian(0.0, state.as_slice(), aggregates, &mut jac)
        .unwrap();
    assert!(off.partial_entries > 0);
    assert!(diag.partial_entries >= 4 * solver.network().partials_layout().len());
    assert_eq!(jac.added(), off.partial_entries + diag.partial_entries);

    let rhs = |s: &PaddedState, solver: &mut SolverHandler| {
        let mut out = vec![0.0; solver.output_len()];
        solver
            .compute_rhs(0.0, s.as_slice(), aggregates, &mut out)
            .unwrap();
        out
    };
    let scale = (0..6)
        .flat_map(|p| (0..dof).map(move |r| (p, r)))
        .flat_map(|(p, r)| (0..dof).map(move |c| (p, r, c)))
        .map(|(p, r, c)| jac.get(p, r, p, c).abs())
        .fold(0.0, f64::max);
    assert!(scale > 0.0);

    for col_point in 0..6usize {
        for col in 0..dof - 1 {
            let c = state.point(col_point)[col];
            let eps = 1.0e-6 * c;
            let mut up = state.clone();
            up.point_mut(col_point)[col] += eps;
            let mut down = state.clone();
            down.point_mut(col_point)[col] -= eps;
            let hi = rhs(&up, &mut solver);
            let lo = rhs(&down, &mut solver);
            for row_point in 1..5usize {
                for row in 0..dof - 1 {
                    let i = row_point * dof + row;
                    let fd = (hi[i] - lo[i]) / (2.0 * eps);
                    let analytic = jac.get(
                        row_point as isize,
                        row,
                        col_point as isize,
                        col,
                    );
                    assert!(
                        (fd - analytic).abs() <= 1e-5 * scale,
                        "d({row_point},{row})/d({col_point},{col}): fd {fd} vs {analytic}"
                    );
                }
            }
        }
    }
}

#[test]
fn diagonal_pass_includes_boundary_handlers() {
    let mut config = uniform(20, 0.1);
    config.surface = 0;
    let handlers: Vec<Handler> = vec![
        DiffusionHandler::new().into(),
        TrapMutationHandler::builder().build().unwrap().into(),
    ];
    let mut solver = SolverHandler::new(config, network(&he_v_catalog()), handlers).unwrap();
    assert_eq!(solver.plan().pass(JacobianPass::Diagonal), &[1]);
    let state = profile(&solver);

    let mut network_only = DenseJacobian::new();
    let mut plain = SolverHandler::new(uniform(20, 0.1), network(&he_v_catalog()), Vec::new())
        .unwrap();
    plain
        .compute_diagonal_jacobian(0.0, state.as_slice(), Aggregates::default(), &mut network_only)
        .unwrap();

    let mut jac = DenseJacobian::new();
    let m = solver
        .compute_diagonal_jacobian(0.0, state.as_slice(), Aggregates::default(), &mut jac)
        .unwrap();
    assert!(m.partial_entries > network_only.added());

    // The He₂ → He₂V + I channel is active at depth 0.5 nm (point 5).
    let net = solver.network();
    let he2 = net.get(Species::He, 2).unwrap().id().index();
    let he2v = net
        .get_by_composition(&Composition::pure(Species::He, 2).with(Species::V, 1))
        .unwrap()
        .id()
        .index();
    assert!(jac.get(5, he2v, 5, he2) > network_only.get(5, he2v, 5, he2));
    assert_eq!(jac.get(9, he2v, 9, he2), network_only.get(9, he2v, 9, he2));
}

// ── Aggregates ─────────────────────────────────────────────────────

#[test]
fn aggregates_sum_near_surface_trapped_atoms() {
    let mut config = uniform(11, 0.5);
    config.near_surface_depth = 1.0;
    let solver = SolverHandler::new(config, network(&he_v_catalog()), Vec::new()).unwrap();
    let net = solver.network();
    let he3v = net
        .get_by_composition(&Composition::pure(Species::He, 3).with(Species::V, 1))
        .unwrap()
        .id()
        .index();
    let state = PaddedState::new(solver.dof(), solver.owned()).with_slot(he3v, 2.0);

    // Points 0, 1, 2 (depth ≤ 1 nm): 3 He per cluster, spacing 0.5.
    let local = solver.aggregates(state.as_slice(), &LocalReduction).unwrap();
    assert!((local.trapped_concentration - 3.0 * 3.0 * 2.0 * 0.5).abs() < 1e-12);

    let global = solver
        .aggregates(state.as_slice(), &OffsetReduction::new(1.5))
        .unwrap();
    assert!((global.trapped_concentration - local.trapped_concentration - 1.5).abs() < 1e-12);

    let err = solver
        .aggregates(state.as_slice(), &FailingReduction::new("link down"))
        .unwrap_err();
    assert!(matches!(err, SolverError::Reduction(_)));
}

// ── Surface, re-solution and restore ───────────────────────────────

fn implantation() -> IncidentFluxHandler {
    IncidentFluxHandler::builder()
        .amplitude(4.0)
        .profile(DepthProfile::Polynomial {
            coefficients: vec![1.0],
            cutoff: 3.0,
        })
        .species(Species::He, 1.0)
        .build()
        .unwrap()
}

#[test]
fn set_surface_rebuilds_participants() {
    let handlers: Vec<Handler> = vec![implantation().into(), DiffusionHandler::new().into()];
    let mut solver = SolverHandler::new(uniform(12, 0.5), network(&helium_catalog()), handlers)
        .unwrap();
    assert!(!solver.is_excluded(1));
    let weight = |s: &SolverHandler, p: usize| {
        s.handlers()[0].as_incident_flux().unwrap().weight(p)
    };
    assert!(weight(&solver, 1) > 0.0);

    solver.set_surface(3).unwrap();
    assert_eq!(solver.surface(), 3);
    assert!(solver.is_excluded(3));
    assert!(!solver.is_excluded(4));
    assert_eq!(weight(&solver, 3), 0.0);
    assert!(weight(&solver, 4) > 0.0);

    assert!(matches!(
        solver.set_surface(11),
        Err(SolverError::Config(_))
    ));
    assert_eq!(solver.surface(), 3);
}

#[test]
fn resolution_follows_time_profile() {
    let flux = IncidentFluxHandler::builder()
        .amplitude(2.0)
        .profile(DepthProfile::Polynomial {
            coefficients: vec![1.0],
            cutoff: 3.0,
        })
        .species(Species::Xe, 1.0)
        .time_profile(LinearTable::new(vec![(0.0, 0.0), (10.0, 1.0)]).unwrap())
        .build()
        .unwrap();
    let handlers: Vec<Handler> = vec![
        flux.into(),
        ReSolutionHandler::builder().build().unwrap().into(),
    ];
    let catalog = xenon_catalog(6);
    let net = ReactionNetwork::build(&catalog, &Default::default()).unwrap();
    let mut solver = SolverHandler::new(uniform(8, 1.0), net, handlers).unwrap();
    let rate = |s: &SolverHandler| match &s.handlers()[1] {
        Handler::ReSolution(r) => r.rate(),
        _ => unreachable!(),
    };
    assert_eq!(rate(&solver), 0.0);

    let state = profile(&solver);
    let mut out = vec![0.0; solver.output_len()];
    solver
        .compute_rhs(5.0, state.as_slice(), Aggregates::default(), &mut out)
        .unwrap();
    assert!((rate(&solver) - 1.0).abs() < 1e-12);
}

#[test]
fn restore_round_trip() {
    let handlers: Vec<Handler> = vec![
        implantation().into(),
        DiffusionHandler::new().into(),
        DesorptionHandler::builder()
            .recombination(1.0e-2, 0.2)
            .build()
            .unwrap()
            .into(),
    ];
    let mut solver = SolverHandler::new(uniform(10, 0.5), network(&helium_catalog()), handlers)
        .unwrap();
    let dof = solver.dof();

    let mut checkpoint = spall_solver::Checkpoint::uniform(2, 10, 850.0);
    checkpoint.set(4, 0, 0.25);
    checkpoint.set(4, 3, 0.5);
    checkpoint.points[6].temperature = 900.0;

    let mut state = vec![0.0; solver.state_len()];
    solver.restore(&checkpoint, &mut state).unwrap();
    assert_eq!(solver.surface(), 2);
    assert_eq!(solver.temperature(6), Some(900.0));
    assert_eq!(solver.network().temperature(6), 900.0);
    // Owned point 4 sits at padded index 5.
    let p4 = &state[5 * dof..6 * dof];
    assert_eq!(p4[0], 0.25);
    assert_eq!(p4[3], 0.5);
    assert_eq!(p4[1], 0.0);
    assert_eq!(p4[dof - 1], 850.0);
    // Ghosts untouched.
    assert!(state[..dof].iter().all(|&v| v == 0.0));
    // Excluded points get the saved state but keep their cached temperature.
    assert!(solver.is_excluded(1));
    assert_eq!(state[3 * dof - 1], 850.0);
    assert_eq!(solver.temperature(1), Some(1000.0));
    assert_eq!(solver.network().temperature(1), 1000.0);

    let mut bad = checkpoint.clone();
    bad.set(5, dof - 1, 1.0);
    assert!(matches!(
        solver.restore(&bad, &mut state),
        Err(SolverError::Checkpoint { .. })
    ));
    let short = spall_solver::Checkpoint::uniform(2, 4, 850.0);
    assert!(matches!(
        solver.restore(&short, &mut state),
        Err(SolverError::Checkpoint { .. })
    ));
}

#[test]
fn initial_vacancies_only_at_active_points() {
    let mut config = uniform(8, 1.0);
    config.initial_vacancy_concentration = 1.0e-4;
    let solver = SolverHandler::new(config, network(&he_v_catalog()), Vec::new()).unwrap();
    let v1 = solver.network().get(Species::V, 1).unwrap().id().index();
    let mut state = PaddedState::new(solver.dof(), solver.owned()).fill(|_, _| 7.0);
    solver
        .initialize_concentration(state.as_mut_slice())
        .unwrap();
    assert_eq!(state.point(0)[v1], 0.0);
    assert_eq!(state.point(3)[v1], 1.0e-4);
    assert_eq!(state.point(7)[v1], 0.0);
    assert_eq!(state.point(3)[0], 0.0);
    assert_eq!(state.point(3)[solver.dof() - 1], 1000.0);
}
