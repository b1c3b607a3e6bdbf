//! Event kinds recorded in per-node logs.

use std::sync::Arc;

use crate::core::{Action, StatusEffect};

/// An action was performed.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionPerformed {
    /// The action as requested (the base action, even when a combo variant
    /// resolved in its place).
    pub action: Arc<Action>,

    /// Whether the resolved action consumed the main cooldown.
    pub main_cooldown: bool,

    /// Direct damage dealt.
    pub damage: f64,

    /// Periodic effect applied, with its snapshotted tick.
    pub periodic: Option<PeriodicSnapshot>,

    /// Simulated time the action resolved at.
    pub time: f64,
}

/// Per-tick damage of a periodic effect, fixed when the effect was applied.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodicSnapshot {
    pub effect: Arc<StatusEffect>,
    pub tick_damage: f64,
}

impl PeriodicSnapshot {
    /// Damage the effect deals over its full duration.
    #[must_use]
    pub fn full_damage(&self, tick_interval: f64) -> f64 {
        match self.effect.duration {
            Some(duration) => self.tick_damage * (duration / tick_interval),
            None => 0.0,
        }
    }
}

/// A cooldown started.
#[derive(Clone, Debug, PartialEq)]
pub struct CooldownStarted {
    pub id: Arc<str>,
    pub time: f64,
    pub duration: f64,
}

/// Direction of a status effect change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectChange {
    Added,
    Ended,
}

/// A status effect started or ended.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusEvent {
    pub effect: Arc<StatusEffect>,
    pub change: EffectChange,
    pub time: f64,

    /// Snapshotted tick damage, for periodic effects being added.
    pub tick_damage: Option<f64>,
}

impl StatusEvent {
    /// Time left on the effect at `now`, if this is its latest event.
    ///
    /// `Some(0.0)` once ended or expired, `None` while active with no
    /// duration.
    #[must_use]
    pub fn remaining_at(&self, now: f64) -> Option<f64> {
        match (self.change, self.effect.duration) {
            (EffectChange::Ended, _) => Some(0.0),
            (EffectChange::Added, None) => None,
            (EffectChange::Added, Some(duration)) => Some((duration - (now - self.time)).max(0.0)),
        }
    }
}

/// Damage was dealt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageAdded {
    pub amount: f64,
    pub time: f64,
}

/// A free-form diagnostic line in a node's journal.
#[derive(Clone, Debug, PartialEq)]
pub struct JournalEntry {
    pub time: f64,
    pub message: String,
}

impl std::fmt::Display for JournalEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} :: {}", self.time, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_display() {
        let entry = JournalEntry {
            time: 12.5,
            message: "Open deals 150 damage".to_string(),
        };
        assert_eq!(entry.to_string(), "12.50 :: Open deals 150 damage");
    }

    #[test]
    fn test_periodic_full_damage() {
        let snapshot = PeriodicSnapshot {
            effect: Arc::new(StatusEffect::timed("Bleed", 30.0)),
            tick_damage: 40.0,
        };
        assert_eq!(snapshot.full_damage(3.0), 400.0);

        let endless = PeriodicSnapshot {
            effect: Arc::new(StatusEffect::indefinite("Burn")),
            tick_damage: 40.0,
        };
        assert_eq!(endless.full_damage(3.0), 0.0);
    }

    #[test]
    fn test_remaining_at() {
        let added = StatusEvent {
            effect: Arc::new(StatusEffect::timed("Haste", 20.0)),
            change: EffectChange::Added,
            time: 5.0,
            tick_damage: None,
        };
        assert_eq!(added.remaining_at(5.0), Some(20.0));
        assert_eq!(added.remaining_at(15.0), Some(10.0));
        assert_eq!(added.remaining_at(40.0), Some(0.0));

        let ended = StatusEvent {
            change: EffectChange::Ended,
            ..added.clone()
        };
        assert_eq!(ended.remaining_at(6.0), Some(0.0));

        let stance = StatusEvent {
            effect: Arc::new(StatusEffect::indefinite("Stance")),
            ..added
        };
        assert_eq!(stance.remaining_at(500.0), None);
    }
}
