//! Tree storage and parallel branch-and-bound search.
//!
//! ## Overview
//!
//! - **`SimTree`**: generational arena of simulation nodes shared by all
//!   workers
//! - **`Explorer`**: seeds the search with the opening pass, then expands
//!   every inconclusive node depth-first on a worker pool
//! - **`TopResults`**: bounded ranking of conclusive nodes; anything pushed
//!   out is detached immediately
//! - **`SearchStats`**: progress counters and a completion estimate
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use rotation_search::kits::SimpleKit;
//! use rotation_search::search::{Explorer, SearchConfig};
//!
//! let rules = Arc::new(SimpleKit::builder().horizon(5.0).opening_depth(1).build());
//! let config = SearchConfig::default().with_workers(2).with_top_results(5);
//! let explorer = Explorer::new(rules, config).unwrap();
//!
//! for result in explorer.run().unwrap() {
//!     let history = explorer.tree().render_history(result.node).unwrap();
//!     println!("{:.1} dps: {}", result.score, history);
//! }
//! ```

pub mod config;
pub mod explorer;
pub mod pool;
pub mod stats;
pub mod top;
pub mod tree;

pub use config::SearchConfig;
pub use explorer::{Explorer, SearchObserver};
pub use pool::{Scope, WorkerPool};
pub use stats::SearchStats;
pub use top::{InsertOutcome, ScoredNode, TopResults};
pub use tree::{Leaves, PathStep, SimTree, TreeStats};
