//! Search progress statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Snapshot of search progress.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Paths that ended in a conclusive node.
    pub completed_paths: u64,

    /// Paths abandoned as dead.
    pub dead_paths: u64,

    /// Nodes branched.
    pub expansions: u64,

    /// Children created across all expansions.
    pub splits: u64,

    /// Sum of conclusive node depths.
    pub complete_length: u64,

    /// Seeds produced by the opening pass.
    pub seeds_total: u64,

    /// Seeds whose subtree has been fully explored.
    pub seeds_completed: u64,

    /// Sum of seed depths.
    pub seed_length: u64,

    /// Wall time since the search started (microseconds).
    pub elapsed_us: u64,
}

impl SearchStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all statistics to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Average number of children per expansion.
    #[must_use]
    pub fn avg_branching(&self) -> f64 {
        if self.expansions == 0 {
            0.0
        } else {
            self.splits as f64 / self.expansions as f64
        }
    }

    /// Average depth of a conclusive node.
    #[must_use]
    pub fn avg_path_length(&self) -> f64 {
        if self.completed_paths == 0 {
            0.0
        } else {
            self.complete_length as f64 / self.completed_paths as f64
        }
    }

    /// Average depth of a seed.
    #[must_use]
    pub fn avg_seed_length(&self) -> f64 {
        if self.seeds_total == 0 {
            0.0
        } else {
            self.seed_length as f64 / self.seeds_total as f64
        }
    }

    /// Projected number of endpoints in the whole search space.
    ///
    /// Assumes every seed grows a uniform tree with the average branching
    /// factor down to the average conclusive depth.
    #[must_use]
    pub fn estimated_total_endpoints(&self) -> f64 {
        let remaining_depth = (self.avg_path_length() - self.avg_seed_length()).max(0.0);
        self.avg_branching().powf(remaining_depth) * self.seeds_total as f64
    }

    /// Endpoints reached so far, conclusive or dead.
    #[must_use]
    pub fn estimated_completed_endpoints(&self) -> u64 {
        self.completed_paths + self.dead_paths
    }

    /// Fraction of the projected search space covered, in `[0, 1]`.
    #[must_use]
    pub fn completion(&self) -> f64 {
        if self.seeds_total > 0 && self.seeds_completed == self.seeds_total {
            return 1.0;
        }
        let total = self.estimated_total_endpoints();
        if total <= 0.0 {
            0.0
        } else {
            (self.estimated_completed_endpoints() as f64 / total).min(1.0)
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_us)
    }

    /// Projected wall time until the search finishes.
    ///
    /// `None` until any progress has been made.
    #[must_use]
    pub fn estimated_remaining(&self) -> Option<Duration> {
        let completion = self.completion();
        if completion <= 0.0 {
            return None;
        }
        let elapsed = self.elapsed().as_secs_f64();
        Some(Duration::from_secs_f64(elapsed * (1.0 - completion) / completion))
    }
}

/// Counters updated concurrently by expansion units.
#[derive(Debug, Default)]
pub(crate) struct SearchCounters {
    completed: AtomicU64,
    dead: AtomicU64,
    expansions: AtomicU64,
    splits: AtomicU64,
    complete_length: AtomicU64,
    seeds_total: AtomicU64,
    seeds_completed: AtomicU64,
    seed_length: AtomicU64,
    started: Mutex<Option<Instant>>,
}

impl SearchCounters {
    /// Zero everything and start the clock.
    pub(crate) fn start(&self) {
        for counter in [
            &self.completed,
            &self.dead,
            &self.expansions,
            &self.splits,
            &self.complete_length,
            &self.seeds_total,
            &self.seeds_completed,
            &self.seed_length,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self.started.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    pub(crate) fn record_seed(&self, depth: u32) {
        self.seeds_total.fetch_add(1, Ordering::Relaxed);
        self.seed_length.fetch_add(u64::from(depth), Ordering::Relaxed);
    }

    pub(crate) fn record_seed_completed(&self) {
        self.seeds_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expansion(&self, children: usize) {
        self.expansions.fetch_add(1, Ordering::Relaxed);
        self.splits.fetch_add(children as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self, depth: u32) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.complete_length.fetch_add(u64::from(depth), Ordering::Relaxed);
    }

    pub(crate) fn record_dead(&self) {
        self.dead.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SearchStats {
        let elapsed = self
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map_or(Duration::ZERO, |start| start.elapsed());

        SearchStats {
            completed_paths: self.completed.load(Ordering::Relaxed),
            dead_paths: self.dead.load(Ordering::Relaxed),
            expansions: self.expansions.load(Ordering::Relaxed),
            splits: self.splits.load(Ordering::Relaxed),
            complete_length: self.complete_length.load(Ordering::Relaxed),
            seeds_total: self.seeds_total.load(Ordering::Relaxed),
            seeds_completed: self.seeds_completed.load(Ordering::Relaxed),
            seed_length: self.seed_length.load(Ordering::Relaxed),
            elapsed_us: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = SearchStats::new();
        assert_eq!(stats.completed_paths, 0);
        assert_eq!(stats.avg_branching(), 0.0);
        assert_eq!(stats.estimated_remaining(), None);
    }

    #[test]
    fn test_stats_estimates() {
        let stats = SearchStats {
            completed_paths: 3,
            dead_paths: 1,
            expansions: 4,
            splits: 8,
            complete_length: 15,
            seeds_total: 2,
            seed_length: 4,
            elapsed_us: 1_000_000,
            ..SearchStats::default()
        };

        assert_eq!(stats.avg_branching(), 2.0);
        assert_eq!(stats.avg_path_length(), 5.0);
        assert_eq!(stats.avg_seed_length(), 2.0);
        // 2^(5 - 2) * 2 seeds
        assert_eq!(stats.estimated_total_endpoints(), 16.0);
        assert_eq!(stats.estimated_completed_endpoints(), 4);
        assert_eq!(stats.completion(), 0.25);
        assert_eq!(stats.estimated_remaining(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_all_seeds_done_is_complete() {
        let stats = SearchStats {
            seeds_total: 3,
            seeds_completed: 3,
            ..SearchStats::default()
        };
        assert_eq!(stats.completion(), 1.0);
        assert_eq!(stats.estimated_remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_stats_reset() {
        let mut stats = SearchStats::new();
        stats.completed_paths = 100;
        stats.dead_paths = 50;

        stats.reset();

        assert_eq!(stats, SearchStats::default());
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = SearchCounters::default();
        counters.start();
        counters.record_seed(2);
        counters.record_expansion(3);
        counters.record_completed(4);
        counters.record_dead();
        counters.record_seed_completed();

        let stats = counters.snapshot();
        assert_eq!(stats.seeds_total, 1);
        assert_eq!(stats.seed_length, 2);
        assert_eq!(stats.splits, 3);
        assert_eq!(stats.complete_length, 4);
        assert_eq!(stats.dead_paths, 1);
        assert_eq!(stats.seeds_completed, 1);

        counters.start();
        assert_eq!(counters.snapshot().completed_paths, 0);
    }

    #[test]
    fn test_stats_serialization() {
        let mut stats = SearchStats::new();
        stats.completed_paths = 42;

        let json = serde_json::to_string(&stats).unwrap();
        let deserialized: SearchStats = serde_json::from_str(&json).unwrap();

        assert_eq!(stats, deserialized);
    }
}
