//! Benchmarks for the FABRIK solve hot path.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use fabrik_solver::{Bone, Chain, Joint, Structure, Vec3};
use std::collections::HashMap;

fn build_chain(name: &str, bone_count: usize) -> Chain {
    let mut chain = Chain::new(name);
    chain.add_bone(Bone::from_direction(Vec3::ZERO, Vec3::Y, 1.0).unwrap());
    for _ in 1..bone_count {
        chain
            .add_consecutive_bone(Vec3::Y, 1.0, Joint::ball(45.0).unwrap())
            .unwrap();
    }
    chain
}

// `solve_for_target` short-circuits when the target and base match the
// previous call's, so each iteration rebuilds a fresh chain rather than
// reusing one mutated chain across the whole batch.
fn solve_short_chain_benchmark(c: &mut Criterion) {
    c.bench_function("solve_short_chain_3_bones", |b| {
        b.iter_batched(
            || build_chain("arm", 3),
            |mut chain| black_box(chain.solve_for_target(black_box(Vec3::new(1.5, 1.5, 0.0)))),
            BatchSize::SmallInput,
        );
    });
}

fn solve_long_chain_benchmark(c: &mut Criterion) {
    c.bench_function("solve_long_chain_50_bones", |b| {
        b.iter_batched(
            || build_chain("spine", 50),
            |mut chain| black_box(chain.solve_for_target(black_box(Vec3::new(20.0, 10.0, 5.0)))),
            BatchSize::SmallInput,
        );
    });
}

fn solve_unreachable_target_benchmark(c: &mut Criterion) {
    c.bench_function("solve_unreachable_target_worst_case_iterations", |b| {
        b.iter_batched(
            || {
                let mut chain = build_chain("tentacle", 10);
                chain.set_max_iterations(20).unwrap();
                chain
            },
            |mut chain| black_box(chain.solve_for_target(black_box(Vec3::new(1000.0, 0.0, 0.0)))),
            BatchSize::SmallInput,
        );
    });
}

fn build_rig() -> Structure {
    let mut structure = Structure::new("rig");
    structure.add_chain(build_chain("spine", 5)).unwrap();
    let mut arm = Chain::new("arm");
    arm.add_bone(Bone::from_direction(Vec3::ZERO, Vec3::X, 1.0).unwrap());
    for _ in 1..4 {
        arm.add_consecutive_bone(Vec3::X, 1.0, Joint::ball(60.0).unwrap())
            .unwrap();
    }
    structure
        .connect_chain(&arm, 0, 4, fabrik_solver::ConnectionPoint::End)
        .unwrap();
    structure
}

fn structure_solve_benchmark(c: &mut Criterion) {
    let mut targets = HashMap::new();
    targets.insert("spine".to_string(), Vec3::new(0.0, 5.0, 0.0));
    targets.insert("arm".to_string(), Vec3::new(3.0, 5.0, 1.0));

    c.bench_function("structure_solve_two_chains", |b| {
        b.iter_batched(
            build_rig,
            |mut structure| structure.solve_for_targets(black_box(&targets)).unwrap(),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    solve_short_chain_benchmark,
    solve_long_chain_benchmark,
    solve_unreachable_target_benchmark,
    structure_solve_benchmark
);
criterion_main!(benches);
