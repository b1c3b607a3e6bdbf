//! # rotation-search
//!
//! An exhaustive, parallel search engine for action rotations in a
//! deterministic, time-stepped combat simulation.
//!
//! ## Design Principles
//!
//! 1. **Content-Agnostic**: The engine knows timing rules (cast times,
//!    cooldowns, locks, combos, periodic ticks) but no actions. Everything
//!    else comes from a `RotationRules` provider.
//!
//! 2. **Incremental State**: A node stores only what happened while it was
//!    current. Histories are rebuilt lazily along the root path, and
//!    resources live in an `im::OrdMap` so branching is O(1).
//!
//! 3. **Bounded Memory**: Only ranked results and the live frontier are kept.
//!    Everything else is pruned as soon as its subtree has been explored.
//!
//! ## Modules
//!
//! - `core`: Action descriptors, status effects, the name catalog
//! - `log`: Per-node event logs and lineage iterators
//! - `trackers`: Read views over logs (actions, cooldowns, effects, damage)
//! - `sim`: Nodes, the in-progress `Step`, the read-only `Timeline`
//! - `rules`: `RotationRules` provider trait and registry
//! - `search`: Tree arena, worker pool, top results, `Explorer`
//! - `kits`: Ready-made rule kits
//! - `error`: Error types

pub mod core;
pub mod error;
pub mod kits;
pub mod log;
pub mod rules;
pub mod search;
pub mod sim;
pub mod trackers;

// Re-export commonly used types
pub use crate::core::{Action, Catalog, Cooldown, EffectKind, PeriodicEffect, StatusEffect};

pub use crate::error::{ConfigError, RegistryError, SearchError, SearchResult, SimError, SimResult};

pub use crate::rules::{Opening, RotationRules, RulesRegistry, Seed, Status, Verdict};

pub use crate::sim::{NodeId, SimNode, Step, Timeline, TICK_INTERVAL};

pub use crate::search::{
    Explorer, PathStep, ScoredNode, SearchConfig, SearchObserver, SearchStats, SimTree,
    TopResults, TreeStats,
};
