//! Rule provider contract and registry.
//!
//! Providers implement `RotationRules` to define:
//! - Which actions to try at each node
//! - How to classify and score nodes
//! - How potency becomes damage and how resources are bounded
//!
//! The engine calls into `RotationRules` but never interprets rotation
//! content directly.

pub mod engine;
pub mod registry;

pub use engine::{Opening, RotationRules, Seed, Status, Verdict, DEFAULT_EFFECT_HORIZON};
pub use registry::{RulesFactory, RulesRegistry};
