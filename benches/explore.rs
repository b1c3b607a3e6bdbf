//! Benchmarks for rotation search
//!
//! Measures performance of:
//! - Full searches at increasing horizons (serial and parallel)
//! - Branching a single node

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rotation_search::kits::SimpleKit;
use rotation_search::search::{Explorer, SearchConfig, SimTree};
use rotation_search::RotationRules;

/// Benchmark a complete search with the simple kit
fn bench_full_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_search");
    group.sample_size(10);

    for &horizon in &[5.0f64, 7.5, 10.0] {
        for &workers in &[0usize, 4] {
            let rules = Arc::new(SimpleKit::builder().horizon(horizon).opening_depth(1).build());
            group.bench_with_input(
                BenchmarkId::new(format!("workers_{workers}"), horizon),
                &horizon,
                |b, _| {
                    b.iter(|| {
                        let config = SearchConfig::default()
                            .with_workers(workers)
                            .with_top_results(10);
                        let explorer = Explorer::new(rules.clone(), config).unwrap();
                        black_box(explorer.run().unwrap())
                    })
                },
            );
        }
    }
    group.finish();
}

/// Benchmark branching the root with every suggested action
fn bench_branch_root(c: &mut Criterion) {
    let kit = SimpleKit::new();

    c.bench_function("branch_root", |b| {
        b.iter(|| {
            let tree = SimTree::new();
            let root = tree.node(tree.root()).unwrap();
            let actions = kit
                .suggest_actions(&rotation_search::Timeline::new(&tree, &root))
                .unwrap();
            black_box(tree.branch(tree.root(), &actions, &kit).unwrap())
        })
    });
}

criterion_group!(benches, bench_full_search, bench_branch_root);
criterion_main!(benches);
