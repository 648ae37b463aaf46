/*
 * Flocking Engine Benchmark
 *
 * Measures the pieces that dominate a frame: building the quadtree, radius
 * queries against it, and whole frames across worker counts.
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flocking::{AgentId, QuadTree, Simulation, SimulationParams, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const WORLD_HALF_SIZE: f32 = 2560.0;

fn random_positions(n: usize) -> Vec<Vec2> {
    let mut rng = StdRng::seed_from_u64(9);
    (0..n)
        .map(|_| {
            Vec2::new(
                rng.gen_range(-WORLD_HALF_SIZE..WORLD_HALF_SIZE),
                rng.gen_range(-WORLD_HALF_SIZE..WORLD_HALF_SIZE),
            )
        })
        .collect()
}

fn build_tree(positions: &[Vec2]) -> QuadTree {
    let mut tree = QuadTree::new(Vec2::ZERO, WORLD_HALF_SIZE, 8).expect("valid tree");
    for (i, &p) in positions.iter().enumerate() {
        tree.insert(p, AgentId(i as u32), Vec2::ZERO);
    }
    tree
}

fn bench_quadtree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadtree_build");

    for num_agents in [1_000, 10_000, 50_000].iter() {
        let positions = random_positions(*num_agents);
        group.bench_with_input(BenchmarkId::from_parameter(num_agents), &positions, |b, positions| {
            let mut tree = QuadTree::new(Vec2::ZERO, WORLD_HALF_SIZE, 8).expect("valid tree");
            b.iter(|| {
                tree.reset(Vec2::ZERO, WORLD_HALF_SIZE).expect("valid bounds");
                for (i, &p) in positions.iter().enumerate() {
                    tree.insert(p, AgentId(i as u32), Vec2::ZERO);
                }
                black_box(tree.len())
            });
        });
    }

    group.finish();
}

fn bench_quadtree_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadtree_query");

    for radius in [10.0f32, 20.0, 80.0].iter() {
        let positions = random_positions(10_000);
        let tree = build_tree(&positions);
        group.bench_with_input(BenchmarkId::from_parameter(radius), radius, |b, &radius| {
            let mut out = Vec::with_capacity(64);
            b.iter(|| {
                let mut total = 0;
                for &p in positions.iter().take(1_000) {
                    out.clear();
                    total += tree.query_radius(p, radius, &mut out);
                }
                black_box(total)
            });
        });
    }

    group.finish();
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");
    group.measurement_time(Duration::from_secs(10));

    for workers in [1, 2, 4, 8].iter() {
        let params = SimulationParams {
            num_agents: 10_000,
            worker_count: *workers,
            ..SimulationParams::default()
        };
        let mut sim = Simulation::new(params).expect("valid params");

        group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, _| {
            b.iter(|| black_box(sim.step(Vec2::new(300.0, 0.0), 1.0 / 60.0).expect("frame runs")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_quadtree_build, bench_quadtree_query, bench_frame);
criterion_main!(benches);
