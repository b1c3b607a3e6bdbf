//! Explorer configuration parameters.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Explorer configuration parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Worker threads (0 = run everything on the calling thread).
    /// A serial search explores depth-first in a fixed order.
    pub workers: usize,

    /// Length of the bounded job queue.
    /// When it is full, new units run on the submitting thread.
    pub queue_capacity: usize,

    /// Number of best results kept.
    pub top_results: usize,

    /// Record per-node journals.
    pub journal: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
            queue_capacity: 1024,
            top_results: 100,
            journal: false,
        }
    }
}

impl SearchConfig {
    /// Configuration for a single-threaded, deterministic search.
    #[must_use]
    pub fn serial() -> Self {
        Self::default().with_workers(0)
    }

    /// Create a new config with a custom worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Create a new config with a custom queue length.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Create a new config keeping `count` best results.
    #[must_use]
    pub fn with_top_results(mut self, count: usize) -> Self {
        self.top_results = count;
        self
    }

    /// Create a new config with journaling switched on or off.
    #[must_use]
    pub fn with_journal(mut self, journal: bool) -> Self {
        self.journal = journal;
        self
    }

    /// Reject settings the explorer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "queue_capacity",
            });
        }
        if self.top_results == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "top_results",
            });
        }
        Ok(())
    }
}
