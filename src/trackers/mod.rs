//! Derived trackers: domain queries over a node's lineage logs.
//!
//! Every tracker is a read view built from a [`Timeline`](crate::sim::Timeline).
//! Time-bounded lookups walk the reverse history and stop as soon as an event
//! is too old to matter, so queries stay cheap on deep trees.

use rustc_hash::FxHashSet;

use crate::core::StatusEffect;
use crate::log::{
    ActionPerformed, CooldownStarted, DamageAdded, EffectChange, History, Lineage, ReverseHistory,
    StatusEvent,
};
use crate::search::SimTree;
use crate::sim::SimNode;

/// Actions performed along the root path.
#[derive(Clone, Copy)]
pub struct ActionHistory<'a> {
    all: Lineage<'a, ActionPerformed>,
    main_cooldown: Lineage<'a, ActionPerformed>,
}

impl<'a> ActionHistory<'a> {
    pub(crate) fn new(
        all: Lineage<'a, ActionPerformed>,
        main_cooldown: Lineage<'a, ActionPerformed>,
    ) -> Self {
        Self { all, main_cooldown }
    }

    /// Every action, oldest first.
    pub fn history(&self) -> History<'a, ActionPerformed> {
        self.all.history()
    }

    /// Every action, most recent first.
    pub fn reverse_history(&self) -> ReverseHistory<'a, ActionPerformed> {
        self.all.reverse_history()
    }

    /// Main-cooldown actions only, oldest first.
    pub fn main_cooldown_history(&self) -> History<'a, ActionPerformed> {
        self.main_cooldown.history()
    }

    /// Number of main-cooldown actions on the path.
    #[must_use]
    pub fn main_cooldown_steps(&self) -> usize {
        self.main_cooldown.history().count()
    }

    /// Actions performed at this node only.
    #[must_use]
    pub fn own(&self) -> &'a [ActionPerformed] {
        self.all.own()
    }

    /// Most recent action.
    #[must_use]
    pub fn last(&self) -> Option<ActionPerformed> {
        self.all.reverse_history().next()
    }

    /// Whether an action with this name was ever performed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.all.reverse_history().any(|e| e.action.name == name)
    }

    /// Actions performed with `start <= time <= end`, newest first.
    pub fn between(&self, start: f64, end: f64) -> impl Iterator<Item = ActionPerformed> + 'a {
        self.all
            .reverse_history()
            .filter(move |e| e.time >= start && e.time <= end)
    }

    /// Render as `"A > [B] > C"`: main-cooldown actions bare, others
    /// bracketed.
    #[must_use]
    pub fn render(&self) -> String {
        self.history()
            .map(|e| {
                if e.main_cooldown {
                    e.action.name.clone()
                } else {
                    format!("[{}]", e.action.name)
                }
            })
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

/// Independent cooldowns along the root path.
#[derive(Clone, Copy)]
pub struct Cooldowns<'a> {
    log: Lineage<'a, CooldownStarted>,
    now: f64,
}

impl<'a> Cooldowns<'a> {
    pub(crate) fn new(log: Lineage<'a, CooldownStarted>, now: f64) -> Self {
        Self { log, now }
    }

    /// Most recent start of `id`.
    ///
    /// With a `duration`, the scan gives up at the first event older than
    /// `duration`, since no start before that can still be running.
    #[must_use]
    pub fn latest(&self, id: &str, duration: Option<f64>) -> Option<CooldownStarted> {
        for event in self.log.reverse_history() {
            if let Some(duration) = duration {
                if duration < self.now - event.time {
                    return None;
                }
            }
            if &*event.id == id {
                return Some(event);
            }
        }
        None
    }

    /// Time left on `id`, zero when not running.
    #[must_use]
    pub fn remaining(&self, id: &str, duration: Option<f64>) -> f64 {
        self.latest(id, duration)
            .map_or(0.0, |e| (e.duration - (self.now - e.time)).max(0.0))
    }

    #[must_use]
    pub fn is_running(&self, id: &str, duration: Option<f64>) -> bool {
        self.remaining(id, duration) > 0.0
    }

    /// When the most recent matching cooldown started.
    #[must_use]
    pub fn started_at(&self, id: &str, duration: Option<f64>) -> Option<f64> {
        self.latest(id, duration).map(|e| e.time)
    }

    /// Every cooldown start, oldest first.
    pub fn history(&self) -> History<'a, CooldownStarted> {
        self.log.history()
    }
}

/// Buffs, debuffs or periodic effects along the root path.
#[derive(Clone, Copy)]
pub struct StatusEffects<'a> {
    log: Lineage<'a, StatusEvent>,
    now: f64,
}

impl<'a> StatusEffects<'a> {
    pub(crate) fn new(log: Lineage<'a, StatusEvent>, now: f64) -> Self {
        Self { log, now }
    }

    /// Time left on an effect by id.
    ///
    /// Returns `Some(0.0)` when inactive and `None` when active without a
    /// duration. A known `duration` bounds the backwards scan.
    #[must_use]
    pub fn remaining_by_id(&self, id: &str, duration: Option<f64>) -> Option<f64> {
        for event in self.log.reverse_history() {
            if let Some(duration) = duration {
                if duration < self.now - event.time {
                    return Some(0.0);
                }
            }
            if event.effect.id == id {
                return event.remaining_at(self.now);
            }
        }
        Some(0.0)
    }

    /// Time left on `effect`; see [`remaining_by_id`](Self::remaining_by_id).
    #[must_use]
    pub fn remaining(&self, effect: &StatusEffect) -> Option<f64> {
        self.remaining_by_id(&effect.id, effect.duration)
    }

    #[must_use]
    pub fn is_active_by_id(&self, id: &str, duration: Option<f64>) -> bool {
        self.remaining_by_id(id, duration).map_or(true, |r| r > 0.0)
    }

    #[must_use]
    pub fn is_active(&self, effect: &StatusEffect) -> bool {
        self.is_active_by_id(&effect.id, effect.duration)
    }

    /// The activating event of every currently active effect, most recent
    /// first.
    ///
    /// With a `horizon`, events older than `now - horizon` are not scanned.
    #[must_use]
    pub fn active(&self, horizon: Option<f64>) -> Vec<StatusEvent> {
        let mut seen = FxHashSet::default();
        let mut active = Vec::new();
        for event in self.log.reverse_history() {
            if horizon.is_some_and(|h| self.now - event.time > h) {
                break;
            }
            if !seen.insert(event.effect.id.clone()) {
                continue;
            }
            if event.change == EffectChange::Added
                && event.remaining_at(self.now).map_or(true, |r| r > 0.0)
            {
                active.push(event);
            }
        }
        active
    }

    /// Every start and end, oldest first.
    pub fn history(&self) -> History<'a, StatusEvent> {
        self.log.history()
    }
}

/// Cumulative damage along the root path.
#[derive(Clone, Copy)]
pub struct DamageLedger<'a> {
    tree: &'a SimTree,
    node: &'a SimNode,
    log: Lineage<'a, DamageAdded>,
    sealed: bool,
}

impl<'a> DamageLedger<'a> {
    pub(crate) fn new(
        tree: &'a SimTree,
        node: &'a SimNode,
        log: Lineage<'a, DamageAdded>,
        sealed: bool,
    ) -> Self {
        Self {
            tree,
            node,
            log,
            sealed,
        }
    }

    /// Damage recorded at this node only.
    #[must_use]
    pub fn own(&self) -> f64 {
        self.node.own_damage()
    }

    /// Damage dealt from the root up to and including this node.
    ///
    /// Published nodes cache their total; the first request on a fresh path
    /// walks up to the nearest cached ancestor and fills in every total on
    /// the way back down. A path interrupted by a detached ancestor is
    /// summed but never cached.
    #[must_use]
    pub fn total(&self) -> f64 {
        if self.sealed {
            if let Some(total) = self.node.total_damage.get() {
                return *total;
            }
        }

        let mut uncached = Vec::new();
        let mut base = 0.0;
        let mut complete = true;
        let mut cursor = self.node.parent();
        while let Some(id) = cursor {
            let Some(ancestor) = self.tree.get(id) else {
                complete = false;
                break;
            };
            if let Some(total) = ancestor.total_damage.get() {
                base = *total;
                break;
            }
            cursor = ancestor.parent();
            uncached.push(ancestor);
        }

        for ancestor in uncached.iter().rev() {
            base += ancestor.own_damage();
            if complete {
                let _ = ancestor.total_damage.set(base);
            }
        }

        let total = base + self.own();
        if self.sealed && complete {
            let _ = self.node.total_damage.set(total);
        }
        total
    }

    /// Total damage divided by current time; zero at time zero.
    #[must_use]
    pub fn dps(&self) -> f64 {
        if self.node.time() == 0.0 {
            0.0
        } else {
            self.total() / self.node.time()
        }
    }

    /// Every damage event, oldest first.
    pub fn history(&self) -> History<'a, DamageAdded> {
        self.log.history()
    }
}
