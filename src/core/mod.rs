//! Core value types: action descriptors, status effects and the catalog
//! providers use to resolve them by name.

pub mod action;
pub mod catalog;

pub use action::{
    Action, Combo, Cooldown, EffectKind, PeriodicEffect, ResourceDelta, StatusEffect,
    DEFAULT_MAIN_COOLDOWN,
};
pub use catalog::Catalog;
