//! Explorer integration tests using SimpleKit.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rotation_search::core::{Action, PeriodicEffect};
use rotation_search::error::{SearchError, SimError, SimResult};
use rotation_search::kits::SimpleKit;
use rotation_search::rules::{RotationRules, Verdict};
use rotation_search::search::{
    Explorer, SearchConfig, SearchObserver, SearchStats, SimTree, TopResults,
};
use rotation_search::sim::{NodeId, Timeline};

fn short_kit() -> Arc<SimpleKit> {
    Arc::new(SimpleKit::builder().horizon(7.5).opening_depth(1).build())
}

// =============================================================================
// Basic Search Tests
// =============================================================================

#[test]
fn test_serial_search_returns_ranked_results() {
    let explorer = Explorer::new(short_kit(), SearchConfig::serial().with_top_results(5)).unwrap();

    let results = explorer.run().unwrap();

    assert_eq!(results.len(), 5);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(explorer.best(), results.first().copied());
    assert_eq!(explorer.top_results(), results);
}

#[test]
fn test_results_reach_the_horizon() {
    let kit = short_kit();
    let explorer = Explorer::new(kit.clone(), SearchConfig::serial().with_top_results(3)).unwrap();

    for result in explorer.run().unwrap() {
        let node = explorer.tree().node(result.node).unwrap();
        let view = Timeline::new(explorer.tree(), &node);
        assert!(view.time() >= kit.horizon());
        assert_eq!(view.damage().dps(), result.score);
        assert!(!explorer.tree().action_path(result.node).unwrap().is_empty());
    }
}

#[test]
fn test_parallel_matches_serial_best() {
    let serial = Explorer::new(short_kit(), SearchConfig::serial().with_top_results(3)).unwrap();
    let parallel = Explorer::new(
        short_kit(),
        SearchConfig::default().with_workers(4).with_top_results(3),
    )
    .unwrap();

    let serial_best = serial.run().unwrap()[0].score;
    let parallel_best = parallel.run().unwrap()[0].score;

    assert_eq!(serial_best, parallel_best);
}

#[test]
fn test_tiny_queue_still_completes() {
    let explorer = Explorer::new(
        short_kit(),
        SearchConfig::default()
            .with_workers(3)
            .with_queue_capacity(1)
            .with_top_results(3),
    )
    .unwrap();

    let results = explorer.run().unwrap();
    let stats = explorer.progress();

    assert_eq!(results.len(), 3);
    assert_eq!(stats.seeds_completed, stats.seeds_total);
}

#[test]
fn test_serial_search_is_deterministic() {
    let render = || {
        let explorer =
            Explorer::new(short_kit(), SearchConfig::serial().with_top_results(4)).unwrap();
        explorer
            .run()
            .unwrap()
            .iter()
            .map(|r| explorer.tree().render_history(r.node).unwrap())
            .collect::<Vec<_>>()
    };

    assert_eq!(render(), render());
}

#[test]
fn test_only_ranked_leaves_survive() {
    let explorer = Explorer::new(short_kit(), SearchConfig::serial().with_top_results(4)).unwrap();

    let results = explorer.run().unwrap();
    let stats = explorer.tree().stats();

    assert_eq!(stats.leaf_count, results.len());
    for result in &results {
        assert!(explorer.tree().node(result.node).unwrap().is_leaf());
    }
}

#[test]
fn test_starting_resources_unlock_spend() {
    let kit = Arc::new(SimpleKit::builder().horizon(2.5).opening_depth(1).build());
    let tree = SimTree::with_resources([("Focus", 100)]);
    let explorer =
        Explorer::with_tree(kit, SearchConfig::serial().with_top_results(1), tree).unwrap();

    let results = explorer.run().unwrap();
    let best = explorer.tree().render_history(results[0].node).unwrap();

    // Surge is woven between the two Spends without delaying the second.
    assert_eq!(best, "Spend > [Surge] > Spend");
    assert!((results[0].score - (400.0 + 480.0) / 2.5).abs() < 1e-9);
}

#[test]
fn test_run_twice_starts_over() {
    let explorer = Explorer::new(short_kit(), SearchConfig::serial().with_top_results(2)).unwrap();

    let first = explorer.run().unwrap();
    let first_stats = explorer.progress();
    let second = explorer.run().unwrap();
    let second_stats = explorer.progress();

    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].score, second[0].score);
    assert_eq!(first_stats.completed_paths, second_stats.completed_paths);
    assert!(second.iter().all(|r| explorer.tree().contains(r.node)));
}

#[test]
fn test_final_seeds_are_ranked() {
    // The opening pass runs all the way to the horizon, so every seed is
    // already final when the search starts.
    let kit = Arc::new(SimpleKit::builder().horizon(6.0).opening_depth(50).build());
    let explorer = Explorer::new(kit.clone(), SearchConfig::serial().with_top_results(5)).unwrap();

    let results = explorer.run().unwrap();
    let stats = explorer.progress();

    assert_eq!(results.len(), 5);
    assert_eq!(stats.completed_paths, stats.seeds_total);
    assert_eq!(explorer.tree().stats().leaf_count, results.len());
    for result in &results {
        let node = explorer.tree().node(result.node).unwrap();
        let view = Timeline::new(explorer.tree(), &node);
        assert!(view.time() >= kit.horizon());
        assert_eq!(view.damage().dps(), result.score);
    }
}

#[test]
fn test_config_validated() {
    let result = Explorer::new(short_kit(), SearchConfig::serial().with_queue_capacity(0));
    assert!(matches!(result, Err(SearchError::Config(_))));
}

// =============================================================================
// Progress and observers
// =============================================================================

#[derive(Default)]
struct Recorder {
    bests: Mutex<Vec<f64>>,
    progress: AtomicUsize,
}

impl SearchObserver for Recorder {
    fn on_new_best(&self, score: f64, _node: NodeId) {
        self.bests.lock().unwrap().push(score);
    }

    fn on_progress(&self, _stats: &SearchStats) {
        self.progress.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn test_observer_sees_strictly_improving_bests() {
    let recorder = Arc::new(Recorder::default());
    let explorer = Explorer::new(short_kit(), SearchConfig::serial().with_top_results(3))
        .unwrap()
        .with_observer(recorder.clone());

    let results = explorer.run().unwrap();
    let bests = recorder.bests.lock().unwrap().clone();

    assert!(!bests.is_empty());
    assert!(bests.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(bests.last().copied(), Some(results[0].score));
    assert!(recorder.progress.load(Ordering::Relaxed) > 0);
}

#[test]
fn test_progress_counters() {
    let explorer = Explorer::new(short_kit(), SearchConfig::serial().with_top_results(3)).unwrap();
    explorer.run().unwrap();

    let stats = explorer.progress();

    assert_eq!(stats.seeds_total, 4);
    assert_eq!(stats.seeds_completed, 4);
    assert_eq!(stats.seed_length, 4);
    assert!(stats.completed_paths >= 3);
    assert!(stats.expansions > 0);
    assert!(stats.avg_branching() > 1.0);
    assert_eq!(stats.completion(), 1.0);
}

// =============================================================================
// Failure propagation
// =============================================================================

/// SimpleKit that breaks once the search gets deep enough.
struct Breaking {
    inner: SimpleKit,
    at_depth: u32,
    panic: bool,
}

impl RotationRules for Breaking {
    fn suggest_actions(&self, node: &Timeline<'_>) -> SimResult<Vec<Arc<Action>>> {
        self.inner.suggest_actions(node)
    }

    fn classify(&self, node: &Timeline<'_>) -> SimResult<Verdict> {
        if node.depth() >= self.at_depth {
            if self.panic {
                panic!("classifier blew up at depth {}", node.depth());
            }
            return Err(SimError::provider("classifier unavailable"));
        }
        self.inner.classify(node)
    }

    fn classify_opening(&self, node: &Timeline<'_>) -> SimResult<Verdict> {
        self.inner.classify_opening(node)
    }

    fn action_damage(&self, action: &Action, node: &Timeline<'_>) -> SimResult<f64> {
        self.inner.action_damage(action, node)
    }

    fn periodic_tick_damage(&self, effect: &PeriodicEffect, node: &Timeline<'_>) -> SimResult<f64> {
        self.inner.periodic_tick_damage(effect, node)
    }
}

fn breaking(panic: bool) -> Arc<Breaking> {
    Arc::new(Breaking {
        inner: SimpleKit::builder().horizon(10.0).opening_depth(1).build(),
        at_depth: 3,
        panic,
    })
}

#[test]
fn test_provider_error_aborts_run() {
    let explorer = Explorer::new(breaking(false), SearchConfig::serial()).unwrap();

    let err = explorer.run().unwrap_err();

    assert!(matches!(
        err,
        SearchError::Simulation(SimError::Provider { .. })
    ));
    assert!(explorer.top_results().is_empty());
}

#[test]
fn test_provider_error_aborts_parallel_run() {
    let explorer =
        Explorer::new(breaking(false), SearchConfig::default().with_workers(4)).unwrap();

    assert!(matches!(
        explorer.run(),
        Err(SearchError::Simulation(SimError::Provider { .. }))
    ));
}

#[test]
fn test_panicking_unit_reported() {
    let explorer =
        Explorer::new(breaking(true), SearchConfig::default().with_workers(2)).unwrap();

    match explorer.run() {
        Err(SearchError::WorkerPanicked { message }) => {
            assert!(message.contains("classifier blew up"));
        }
        other => panic!("expected a panicked unit, got {other:?}"),
    }
}

// =============================================================================
// Top results
// =============================================================================

#[test]
fn test_equal_scores_keep_first_inserted() {
    let kit = SimpleKit::new();
    let tree = SimTree::new();
    let strike = kit.catalog().action("Strike").unwrap().clone();
    let children = tree
        .branch(tree.root(), &[strike.clone(), strike], &kit)
        .unwrap();
    let top = TopResults::new(1).unwrap();

    top.insert(&tree, children[0], 80.0);
    let outcome = top.insert(&tree, children[1], 80.0);

    assert_eq!(outcome.rank, None);
    assert_eq!(top.best().map(|e| e.node), Some(children[0]));
    assert!(!tree.contains(children[1]));
}
