//! Branch-and-bound exploration of the rotation tree.
//!
//! The explorer seeds the search with the opening pass, then expands every
//! seed depth-first as a unit of work on the pool. A unit branches its node,
//! classifies the children, ranks conclusive ones, spawns a unit per
//! inconclusive child and joins them. Once its subtree has been explored it
//! prunes every leaf that is not a ranked result, so memory stays bounded by
//! the top results plus the live frontier.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::config::SearchConfig;
use super::pool::{Scope, WorkerPool};
use super::stats::{SearchCounters, SearchStats};
use super::top::{ScoredNode, TopResults};
use super::tree::SimTree;
use crate::error::{SearchError, SearchResult};
use crate::rules::{Opening, RotationRules, Status};
use crate::sim::{NodeId, Timeline};

/// Callbacks fired while a search runs.
///
/// Callbacks run on whichever worker produced the event and must not block
/// for long.
pub trait SearchObserver: Send + Sync {
    /// A result outranked every result seen so far.
    fn on_new_best(&self, _score: f64, _node: NodeId) {}

    /// Progress counters changed.
    fn on_progress(&self, _stats: &SearchStats) {}
}

struct Shared {
    tree: SimTree,
    rules: Arc<dyn RotationRules>,
    top: TopResults,
    counters: SearchCounters,
    observer: Option<Arc<dyn SearchObserver>>,
    failure: Mutex<Option<SearchError>>,
    aborted: AtomicBool,
}

/// Depth-first search driver.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rotation_search::kits::simple::SimpleKit;
/// use rotation_search::search::{Explorer, SearchConfig};
///
/// let rules = Arc::new(SimpleKit::builder().horizon(6.0).opening_depth(1).build());
/// let explorer = Explorer::new(rules, SearchConfig::serial().with_top_results(3)).unwrap();
/// let results = explorer.run().unwrap();
///
/// assert!(!results.is_empty());
/// let best = explorer.tree().render_history(results[0].node).unwrap();
/// assert!(!best.is_empty());
/// ```
pub struct Explorer {
    config: SearchConfig,
    shared: Arc<Shared>,
}

impl Explorer {
    /// Create an explorer over a fresh tree.
    pub fn new(rules: Arc<dyn RotationRules>, config: SearchConfig) -> SearchResult<Self> {
        Self::with_tree(rules, config, SimTree::new())
    }

    /// Create an explorer over `tree`, for example one with starting
    /// resources.
    pub fn with_tree(
        rules: Arc<dyn RotationRules>,
        config: SearchConfig,
        tree: SimTree,
    ) -> SearchResult<Self> {
        config.validate()?;
        let journal = config.journal || tree.journals();
        let top = TopResults::new(config.top_results)?;

        Ok(Self {
            config,
            shared: Arc::new(Shared {
                tree: tree.with_journal(journal),
                rules,
                top,
                counters: SearchCounters::default(),
                observer: None,
                failure: Mutex::new(None),
                aborted: AtomicBool::new(false),
            }),
        })
    }

    /// Attach an observer. Has no effect while a search is running.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.observer = Some(observer);
        }
        self
    }

    #[must_use]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    #[must_use]
    pub fn tree(&self) -> &SimTree {
        &self.shared.tree
    }

    /// Best results found so far, best first.
    #[must_use]
    pub fn top_results(&self) -> Vec<ScoredNode> {
        self.shared.top.entries()
    }

    #[must_use]
    pub fn best(&self) -> Option<ScoredNode> {
        self.shared.top.best()
    }

    /// Current progress counters.
    #[must_use]
    pub fn progress(&self) -> SearchStats {
        self.shared.counters.snapshot()
    }

    /// Run the search to completion and return the best results.
    ///
    /// If any unit fails, outstanding units stop expanding and the first
    /// error is returned once all of them have finished. Results ranked
    /// before the failure stay available through [`Self::top_results`].
    pub fn run(&self) -> SearchResult<Vec<ScoredNode>> {
        let shared = &self.shared;
        shared.counters.start();
        shared.aborted.store(false, Ordering::Release);
        shared.lock_failure().take();
        shared.top.clear();

        let root = shared.tree.root();
        let opening = Opening::new(&shared.tree, shared.rules.as_ref(), root);
        let mut seeds = shared.rules.initial_states(&opening)?;
        seeds.sort_by(|a, b| b.verdict.score.total_cmp(&a.verdict.score));

        for seed in &seeds {
            let depth = shared.tree.get(seed.node).map_or(0, |node| node.depth());
            shared.counters.record_seed(depth);
        }
        info!(
            seeds = seeds.len(),
            workers = self.config.workers,
            "Starting rotation search"
        );
        shared.notify_progress();

        let pool = Arc::new(WorkerPool::start(
            self.config.workers,
            self.config.queue_capacity,
        )?);
        let scope = Scope::new();
        for seed in seeds {
            let unit = Arc::clone(shared);
            let unit_pool = Arc::clone(&pool);
            pool.spawn(&scope, move || {
                unit.expand_guarded(&unit_pool, seed.node);
                unit.counters.record_seed_completed();
                unit.notify_progress();
            });
        }
        pool.join(&scope);
        pool.shutdown();

        let stats = self.progress();
        info!(
            completed = stats.completed_paths,
            dead = stats.dead_paths,
            expansions = stats.expansions,
            results = shared.top.len(),
            elapsed_ms = stats.elapsed().as_millis() as u64,
            "Rotation search finished"
        );

        match shared.lock_failure().take() {
            Some(error) => Err(error),
            None => Ok(shared.top.entries()),
        }
    }
}

impl Shared {
    fn lock_failure(&self) -> std::sync::MutexGuard<'_, Option<SearchError>> {
        self.failure.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one unit, turning errors and panics into a recorded failure.
    fn expand_guarded(self: &Arc<Self>, pool: &Arc<WorkerPool>, id: NodeId) {
        let error = match panic::catch_unwind(AssertUnwindSafe(|| self.expand(pool, id))) {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(payload) => SearchError::WorkerPanicked {
                message: panic_message(payload.as_ref()),
            },
        };
        self.fail(error);
    }

    fn fail(&self, error: SearchError) {
        warn!(%error, "Search unit failed; aborting search");
        self.aborted.store(true, Ordering::Release);
        let mut failure = self.lock_failure();
        if failure.is_none() {
            *failure = Some(error);
        }
    }

    fn expand(self: &Arc<Self>, pool: &Arc<WorkerPool>, id: NodeId) -> SearchResult<()> {
        if self.aborted.load(Ordering::Acquire) {
            return Ok(());
        }
        let rules = self.rules.as_ref();

        let Some(node) = self.tree.get(id) else {
            return Ok(());
        };
        let actions = rules.suggest_actions(&Timeline::new(&self.tree, &node))?;
        if actions.is_empty() {
            // A seed can already be final; rank it rather than drop it.
            let verdict = rules.classify(&Timeline::new(&self.tree, &node))?;
            node.set_verdict(verdict);
            match verdict.status {
                Status::Conclusive => {
                    self.counters.record_completed(node.depth());
                    self.rank(id, verdict.score);
                }
                Status::Inconclusive | Status::Dead => {
                    self.counters.record_dead();
                    self.tree.prune(id);
                }
            }
            self.notify_progress();
            return Ok(());
        }

        let children = self.tree.branch(id, &actions, rules)?;
        self.counters.record_expansion(children.len());

        let mut ranked = Vec::with_capacity(children.len());
        for child in children {
            let Some(node) = self.tree.get(child) else {
                continue;
            };
            let verdict = rules.classify(&Timeline::new(&self.tree, &node))?;
            node.set_verdict(verdict);
            ranked.push((child, verdict, node.depth()));
        }
        ranked.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));

        let scope = Scope::new();
        for (child, verdict, depth) in ranked {
            match verdict.status {
                Status::Conclusive => {
                    self.counters.record_completed(depth);
                    self.rank(child, verdict.score);
                }
                Status::Inconclusive => {
                    let unit = Arc::clone(self);
                    let unit_pool = Arc::clone(pool);
                    pool.spawn(&scope, move || unit.expand_guarded(&unit_pool, child));
                }
                Status::Dead => self.counters.record_dead(),
            }
        }
        pool.join(&scope);

        let leaves: Vec<NodeId> = self.tree.leaves(id).collect();
        for leaf in leaves {
            let ranked = self
                .tree
                .get(leaf)
                .and_then(|node| node.verdict())
                .is_some_and(|verdict| verdict.is_conclusive());
            if !ranked {
                self.tree.prune(leaf);
            }
        }

        self.notify_progress();
        Ok(())
    }

    fn rank(&self, node: NodeId, score: f64) {
        let outcome = self.top.insert(&self.tree, node, score);
        if outcome.is_new_best() {
            debug!(score, %node, "New best result");
            if let Some(observer) = &self.observer {
                observer.on_new_best(score, node);
            }
        }
    }

    fn notify_progress(&self) {
        if let Some(observer) = &self.observer {
            observer.on_progress(&self.counters.snapshot());
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
