//! Criterion benchmarks for full grid evaluations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spall_bench::{fuel_profile, seeded_state, tungsten_profile};
use spall_core::{JacobianEntry, LocalReduction};
use spall_solver::SolverHandler;

fn setup(mut solver: SolverHandler) -> (SolverHandler, Vec<f64>, Vec<f64>) {
    let state = seeded_state(&solver, 42, 1.0e-4).unwrap();
    let out = vec![0.0; solver.output_len()];
    // Warm the temperature caches so every iteration measures the same work.
    let agg = solver.aggregates(&state, &LocalReduction).unwrap();
    let mut warm = out.clone();
    solver.compute_rhs(0.0, &state, agg, &mut warm).unwrap();
    (solver, state, out)
}

/// Benchmark: residual of the tungsten profile on 200 points.
fn bench_rhs_tungsten(c: &mut Criterion) {
    let (mut solver, state, mut out) = setup(tungsten_profile(200).unwrap());

    c.bench_function("rhs_tungsten_200", |b| {
        b.iter(|| {
            let agg = solver.aggregates(&state, &LocalReduction).unwrap();
            solver
                .compute_rhs(1.0, black_box(&state), agg, &mut out)
                .unwrap();
            black_box(&out);
        });
    });
}

/// Benchmark: residual of the grouped fuel profile on 50 points.
fn bench_rhs_fuel(c: &mut Criterion) {
    let (mut solver, state, mut out) = setup(fuel_profile(50, 500).unwrap());

    c.bench_function("rhs_fuel_50", |b| {
        b.iter(|| {
            let agg = solver.aggregates(&state, &LocalReduction).unwrap();
            solver
                .compute_rhs(1.0, black_box(&state), agg, &mut out)
                .unwrap();
            black_box(&out);
        });
    });
}

/// Benchmark: both Jacobian passes of the tungsten profile on 200 points.
fn bench_jacobian_tungsten(c: &mut Criterion) {
    let (mut solver, state, _) = setup(tungsten_profile(200).unwrap());
    let mut sink: Vec<JacobianEntry> = Vec::new();

    c.bench_function("jacobian_tungsten_200", |b| {
        b.iter(|| {
            sink.clear();
            let agg = solver.aggregates(&state, &LocalReduction).unwrap();
            solver
                .compute_off_diagonal_jacobian(1.0, black_box(&state), agg, &mut sink)
                .unwrap();
            solver
                .compute_diagonal_jacobian(1.0, black_box(&state), agg, &mut sink)
                .unwrap();
            black_box(sink.len());
        });
    });
}

/// Benchmark: diagonal Jacobian pass of the grouped fuel profile.
fn bench_jacobian_fuel(c: &mut Criterion) {
    let (mut solver, state, _) = setup(fuel_profile(50, 500).unwrap());
    let mut sink: Vec<JacobianEntry> = Vec::new();

    c.bench_function("diagonal_jacobian_fuel_50", |b| {
        b.iter(|| {
            sink.clear();
            let agg = solver.aggregates(&state, &LocalReduction).unwrap();
            solver
                .compute_diagonal_jacobian(1.0, black_box(&state), agg, &mut sink)
                .unwrap();
            black_box(sink.len());
        });
    });
}

criterion_group!(
    benches,
    bench_rhs_tungsten,
    bench_rhs_fuel,
    bench_jacobian_tungsten,
    bench_jacobian_fuel
);
criterion_main!(benches);
