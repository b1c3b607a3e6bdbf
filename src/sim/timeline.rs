//! Read-only view of a node together with its attached ancestors.

use std::sync::Arc;

use crate::core::{Action, EffectKind};
use crate::log::{
    ActionPerformed, CooldownStarted, DamageAdded, EventLog, History, JournalEntry, Lineage,
    LogSelector, StatusEvent,
};
use crate::search::SimTree;
use crate::trackers::{ActionHistory, Cooldowns, DamageLedger, StatusEffects};

use super::node::{NodeLogs, SimNode};

fn actions(logs: &NodeLogs) -> &EventLog<ActionPerformed> {
    &logs.actions
}

fn main_cooldown_actions(logs: &NodeLogs) -> &EventLog<ActionPerformed> {
    &logs.main_cooldown_actions
}

fn cooldowns(logs: &NodeLogs) -> &EventLog<CooldownStarted> {
    &logs.cooldowns
}

fn buffs(logs: &NodeLogs) -> &EventLog<StatusEvent> {
    &logs.buffs
}

fn debuffs(logs: &NodeLogs) -> &EventLog<StatusEvent> {
    &logs.debuffs
}

fn periodic(logs: &NodeLogs) -> &EventLog<StatusEvent> {
    &logs.periodic
}

fn damage(logs: &NodeLogs) -> &EventLog<DamageAdded> {
    &logs.damage
}

fn journal(logs: &NodeLogs) -> &EventLog<JournalEntry> {
    &logs.journal
}

/// A node as seen by rule providers and trackers.
///
/// ```
/// use rotation_search::search::SimTree;
/// use rotation_search::sim::Timeline;
///
/// let tree = SimTree::new();
/// let root = tree.node(tree.root()).unwrap();
/// let view = Timeline::new(&tree, &root);
///
/// assert_eq!(view.time(), 0.0);
/// assert_eq!(view.damage().dps(), 0.0);
/// assert_eq!(view.actions().render(), "");
/// ```
#[derive(Clone, Copy)]
pub struct Timeline<'a> {
    tree: &'a SimTree,
    node: &'a SimNode,
    sealed: bool,
}

impl<'a> Timeline<'a> {
    /// View a node published in `tree`.
    pub fn new(tree: &'a SimTree, node: &'a SimNode) -> Self {
        Self {
            tree,
            node,
            sealed: true,
        }
    }

    /// View a node that is still being simulated. Nothing is cached on it.
    pub(crate) fn in_progress(tree: &'a SimTree, node: &'a SimNode) -> Self {
        Self {
            tree,
            node,
            sealed: false,
        }
    }

    #[must_use]
    pub fn tree(&self) -> &'a SimTree {
        self.tree
    }

    #[must_use]
    pub fn node(&self) -> &'a SimNode {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn time(&self) -> f64 {
        self.node.time()
    }

    #[inline]
    #[must_use]
    pub fn main_cooldown(&self) -> f64 {
        self.node.main_cooldown()
    }

    #[inline]
    #[must_use]
    pub fn lock(&self) -> f64 {
        self.node.lock()
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        self.node.depth()
    }

    /// Resource level, zero when unknown.
    #[must_use]
    pub fn resource(&self, name: &str) -> i64 {
        self.node.resource(name)
    }

    #[must_use]
    pub fn last_combo(&self) -> Option<&'a Arc<Action>> {
        self.node.last_combo()
    }

    pub fn actions(&self) -> ActionHistory<'a> {
        ActionHistory::new(
            Lineage::new(self.tree, self.node, actions),
            Lineage::new(self.tree, self.node, main_cooldown_actions),
        )
    }

    pub fn cooldowns(&self) -> Cooldowns<'a> {
        Cooldowns::new(Lineage::new(self.tree, self.node, cooldowns), self.time())
    }

    pub fn effects(&self, kind: EffectKind) -> StatusEffects<'a> {
        let select: LogSelector<StatusEvent> = match kind {
            EffectKind::Buff => buffs,
            EffectKind::Debuff => debuffs,
            EffectKind::Periodic => periodic,
        };
        StatusEffects::new(Lineage::new(self.tree, self.node, select), self.time())
    }

    pub fn buffs(&self) -> StatusEffects<'a> {
        self.effects(EffectKind::Buff)
    }

    pub fn debuffs(&self) -> StatusEffects<'a> {
        self.effects(EffectKind::Debuff)
    }

    pub fn periodic(&self) -> StatusEffects<'a> {
        self.effects(EffectKind::Periodic)
    }

    pub fn damage(&self) -> DamageLedger<'a> {
        DamageLedger::new(
            self.tree,
            self.node,
            Lineage::new(self.tree, self.node, damage),
            self.sealed,
        )
    }

    /// Diagnostic journal along the root path, oldest first.
    pub fn journal(&self) -> History<'a, JournalEntry> {
        Lineage::new(self.tree, self.node, journal).history()
    }
}
