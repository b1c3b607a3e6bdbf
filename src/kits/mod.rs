//! Ready-made rule kits.
//!
//! Kits are small, self-contained [`RotationRules`](crate::rules::RotationRules)
//! implementations. They carry no real role's numbers and exist to exercise
//! the engine and to show what a provider looks like.

pub mod simple;

pub use simple::{SimpleKit, SimpleKitBuilder};
