//! Simple five-action kit for testing the engine.
//!
//! A minimal rotation that touches every engine feature:
//! - `Strike` opens a combo, `Follow` finishes it for more damage and Focus
//! - `Bleed` applies a periodic damage effect
//! - `Surge` is an off-main-cooldown buff on its own cooldown
//! - `Spend` converts Focus into a large hit
//!
//! Nodes are conclusive once they reach the horizon and are scored by DPS.

mod kit;

pub use kit::{SimpleKit, SimpleKitBuilder};
