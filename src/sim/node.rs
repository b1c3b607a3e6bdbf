//! Simulation nodes: one timeline state in the search tree.
//!
//! A `SimNode` is built privately by a [`Step`](super::Step) and then
//! published into the [`SimTree`](crate::search::SimTree) arena, after which
//! its clocks, resources and logs never change. Only the child list and the
//! cached damage total are written after publication.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use im::OrdMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{Action, EffectKind};
use crate::log::{
    ActionPerformed, CooldownStarted, DamageAdded, EventLog, JournalEntry, StatusEvent,
};
use crate::rules::Verdict;

/// Handle to a node slot in the tree arena.
///
/// The generation changes every time a slot is reused, so a handle to a
/// detached node never resolves to whichever node took its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: NodeId = NodeId {
        index: 0,
        generation: 0,
    };

    #[must_use]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the arena.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation this handle was issued for.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.generation == 0 {
            write!(f, "NodeId({})", self.index)
        } else {
            write!(f, "NodeId({}#{})", self.index, self.generation)
        }
    }
}

/// Child handles of a node. Most nodes branch into a handful of actions.
pub type Children = SmallVec<[NodeId; 4]>;

/// The per-node event logs. Each holds only this node's own events.
#[derive(Clone, Debug, Default)]
pub struct NodeLogs {
    /// Every action performed.
    pub actions: EventLog<ActionPerformed>,

    /// Actions that consumed the main cooldown.
    pub main_cooldown_actions: EventLog<ActionPerformed>,

    pub cooldowns: EventLog<CooldownStarted>,
    pub buffs: EventLog<StatusEvent>,
    pub debuffs: EventLog<StatusEvent>,
    pub periodic: EventLog<StatusEvent>,
    pub damage: EventLog<DamageAdded>,

    /// Diagnostic lines, only written when the tree journals.
    pub journal: EventLog<JournalEntry>,
}

impl NodeLogs {
    /// The status log for one kind of effect.
    #[must_use]
    pub fn effects(&self, kind: EffectKind) -> &EventLog<StatusEvent> {
        match kind {
            EffectKind::Buff => &self.buffs,
            EffectKind::Debuff => &self.debuffs,
            EffectKind::Periodic => &self.periodic,
        }
    }

    pub(crate) fn effects_mut(&mut self, kind: EffectKind) -> &mut EventLog<StatusEvent> {
        match kind {
            EffectKind::Buff => &mut self.buffs,
            EffectKind::Debuff => &mut self.debuffs,
            EffectKind::Periodic => &mut self.periodic,
        }
    }

    /// Whether nothing at all was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
            && self.cooldowns.is_empty()
            && self.buffs.is_empty()
            && self.debuffs.is_empty()
            && self.periodic.is_empty()
            && self.damage.is_empty()
            && self.journal.is_empty()
    }
}

/// One simulated timeline state.
#[derive(Debug)]
pub struct SimNode {
    pub(crate) parent: Option<NodeId>,
    pub(crate) depth: u32,

    pub(crate) time: f64,
    pub(crate) main_cooldown: f64,
    pub(crate) lock: f64,

    pub(crate) resources: OrdMap<String, i64>,
    pub(crate) last_combo: Option<Arc<Action>>,
    pub(crate) logs: NodeLogs,

    /// Cumulative damage along the root path, filled on first request once
    /// the node is published.
    pub(crate) total_damage: OnceLock<f64>,

    /// Classification assigned by the explorer.
    pub(crate) verdict: OnceLock<Verdict>,

    pub(crate) children: Mutex<Children>,
}

impl SimNode {
    /// A fresh root: time zero, no resources, nothing recorded.
    #[must_use]
    pub fn root() -> Self {
        Self::with_resources(OrdMap::new())
    }

    /// A fresh root with starting resource levels.
    #[must_use]
    pub fn with_resources(resources: OrdMap<String, i64>) -> Self {
        Self {
            parent: None,
            depth: 0,
            time: 0.0,
            main_cooldown: 0.0,
            lock: 0.0,
            resources,
            last_combo: None,
            logs: NodeLogs::default(),
            total_damage: OnceLock::new(),
            verdict: OnceLock::new(),
            children: Mutex::new(Children::new()),
        }
    }

    /// Copy clocks, resources and combo state into a new child of `id`
    /// (which must be this node's handle). Logs start empty.
    #[must_use]
    pub(crate) fn child_of(&self, id: NodeId) -> Self {
        Self {
            parent: Some(id),
            depth: self.depth + 1,
            time: self.time,
            main_cooldown: self.main_cooldown,
            lock: self.lock,
            resources: self.resources.clone(),
            last_combo: self.last_combo.clone(),
            logs: NodeLogs::default(),
            total_damage: OnceLock::new(),
            verdict: OnceLock::new(),
            children: Mutex::new(Children::new()),
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Number of edges from the root.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Current simulated time.
    #[inline]
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Remaining main cooldown.
    #[inline]
    #[must_use]
    pub fn main_cooldown(&self) -> f64 {
        self.main_cooldown
    }

    /// Remaining post-action lock.
    #[inline]
    #[must_use]
    pub fn lock(&self) -> f64 {
        self.lock
    }

    /// Level of a resource; unknown resources read as zero.
    #[must_use]
    pub fn resource(&self, name: &str) -> i64 {
        self.resources.get(name).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn resources(&self) -> &OrdMap<String, i64> {
        &self.resources
    }

    /// The last combo-initiating action, if its combo is still open.
    #[must_use]
    pub fn last_combo(&self) -> Option<&Arc<Action>> {
        self.last_combo.as_ref()
    }

    #[must_use]
    pub fn logs(&self) -> &NodeLogs {
        &self.logs
    }

    /// Damage recorded at this node only.
    #[must_use]
    pub fn own_damage(&self) -> f64 {
        self.logs.damage.iter().map(|d| d.amount).sum()
    }

    /// The explorer's classification of this node, once assigned.
    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict.get().copied()
    }

    pub(crate) fn set_verdict(&self, verdict: Verdict) {
        let _ = self.verdict.set(verdict);
    }

    /// Lock the child list.
    pub(crate) fn children_mut(&self) -> MutexGuard<'_, Children> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current children.
    #[must_use]
    pub fn children(&self) -> Children {
        self.children_mut().clone()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children_mut().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::ROOT.to_string(), "NodeId(0)");
        assert_eq!(NodeId::new(5, 0).to_string(), "NodeId(5)");
        assert_eq!(NodeId::new(5, 2).to_string(), "NodeId(5#2)");
    }

    #[test]
    fn test_node_id_generation_distinguishes() {
        assert_ne!(NodeId::new(3, 0), NodeId::new(3, 1));
        assert_eq!(NodeId::new(3, 1).index(), 3);
        assert_eq!(NodeId::new(3, 1).generation(), 1);
    }

    #[test]
    fn test_root_defaults() {
        let root = SimNode::root();

        assert_eq!(root.parent(), None);
        assert_eq!(root.depth(), 0);
        assert_eq!(root.time(), 0.0);
        assert_eq!(root.resource("Anything"), 0);
        assert!(root.last_combo().is_none());
        assert!(root.logs().is_empty());
        assert!(root.is_leaf());
        assert!(root.verdict().is_none());
    }

    #[test]
    fn test_child_copies_state_but_not_logs() {
        let mut parent = SimNode::with_resources(OrdMap::unit("Focus".to_string(), 40));
        parent.time = 7.5;
        parent.main_cooldown = 1.0;
        parent.lock = 0.5;
        parent.last_combo = Some(Arc::new(Action::new("Open")));
        parent.logs.damage.push(DamageAdded {
            amount: 100.0,
            time: 7.5,
        });

        let child = parent.child_of(NodeId::ROOT);

        assert_eq!(child.parent(), Some(NodeId::ROOT));
        assert_eq!(child.depth(), 1);
        assert_eq!(child.time(), parent.time());
        assert_eq!(child.main_cooldown(), parent.main_cooldown());
        assert_eq!(child.lock(), parent.lock());
        assert_eq!(child.resources(), parent.resources());
        assert_eq!(child.last_combo(), parent.last_combo());
        assert!(child.logs().is_empty());
        assert_eq!(child.own_damage(), 0.0);
    }

    #[test]
    fn test_effect_logs_by_kind() {
        let mut logs = NodeLogs::default();
        let effect = Arc::new(crate::core::StatusEffect::timed("Haste", 10.0));
        logs.effects_mut(EffectKind::Debuff).push(StatusEvent {
            effect,
            change: crate::log::EffectChange::Added,
            time: 0.0,
            tick_damage: None,
        });

        assert!(logs.effects(EffectKind::Buff).is_empty());
        assert_eq!(logs.effects(EffectKind::Debuff).len(), 1);
        assert!(!logs.is_empty());
    }
}
