// Criterion benchmarks for nearest-node lookup.
//
// Compares the k-d tree against the linear scan it replaces, and the batched
// rayon query against a serial loop over the same sample points (a default
// near frustum produces a few thousand of them).
//
// Run with:
//   cargo bench -p lurker_nav --bench nearest_node

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lurker_nav::config::MenaceParams;
use lurker_nav::kdtree::KdTree;
use lurker_nav::menace::frustum_points;
use lurker_nav::prng::NavRng;
use lurker_nav::{NavGraph, Vec3};
use std::hint::black_box;

fn random_point(rng: &mut NavRng) -> Vec3 {
    Vec3::new(
        rng.range_f32(-200.0, 200.0),
        rng.range_f32(-20.0, 20.0),
        rng.range_f32(-200.0, 200.0),
    )
}

fn random_graph(rng: &mut NavRng, count: usize) -> NavGraph {
    let mut graph = NavGraph::new();
    for _ in 0..count {
        graph.add_node(random_point(rng));
    }
    graph
}

fn bench_single_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest/single");
    for &count in &[50usize, 500, 5000] {
        let mut rng = NavRng::new(count as u64);
        let graph = random_graph(&mut rng, count);
        let tree = KdTree::from_graph(&graph);
        let queries: Vec<Vec3> = (0..256).map(|_| random_point(&mut rng)).collect();

        group.bench_with_input(BenchmarkId::new("kdtree", count), &queries, |b, queries| {
            b.iter(|| {
                for &q in queries {
                    black_box(tree.nearest(q).ok());
                }
            });
        });
        group.bench_with_input(BenchmarkId::new("linear", count), &queries, |b, queries| {
            b.iter(|| {
                for &q in queries {
                    black_box(graph.nearest_node_linear(q));
                }
            });
        });
    }
    group.finish();
}

fn bench_frustum_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest/frustum");
    let mut rng = NavRng::new(7);
    let graph = random_graph(&mut rng, 2000);
    let tree = KdTree::from_graph(&graph);
    let params = MenaceParams::default();
    let points = frustum_points(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0), &params.near_frustum);

    group.bench_function("batch", |b| {
        b.iter(|| black_box(tree.nearest_batch(&points).ok()));
    });
    group.bench_function("serial", |b| {
        b.iter(|| {
            let ids: Vec<_> = points.iter().filter_map(|&p| tree.nearest(p).ok()).collect();
            black_box(ids)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_single_query, bench_frustum_batch);
criterion_main!(benches);
