//! Simulation of a single node.
//!
//! A `Step` owns a node that has been cloned from its parent but not yet
//! published. Performing an action advances its clock, applies the action's
//! effects and records everything in the node's own logs. When the step is
//! finished the node is attached to the tree and becomes immutable.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::core::{Action, Cooldown, EffectKind, StatusEffect};
use crate::error::SimResult;
use crate::log::{
    ActionPerformed, CooldownStarted, DamageAdded, EffectChange, JournalEntry, PeriodicSnapshot,
    StatusEvent,
};
use crate::rules::RotationRules;
use crate::search::SimTree;

use super::node::{NodeId, SimNode};
use super::timeline::Timeline;
use super::TICK_INTERVAL;

/// A node under construction.
pub struct Step<'a> {
    tree: &'a SimTree,
    rules: &'a dyn RotationRules,
    node: SimNode,
}

impl<'a> Step<'a> {
    /// Start a child of `parent` with the parent's clocks, resources and
    /// combo state and no events.
    pub fn new(tree: &'a SimTree, parent: NodeId, rules: &'a dyn RotationRules) -> SimResult<Self> {
        let node = tree.node(parent)?.child_of(parent);
        Ok(Self { tree, rules, node })
    }

    /// Read view of the node in its current state.
    pub fn timeline(&self) -> Timeline<'_> {
        Timeline::in_progress(self.tree, &self.node)
    }

    #[must_use]
    pub fn node(&self) -> &SimNode {
        &self.node
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        self.node.time
    }

    /// Hand the finished node over for publication.
    #[must_use]
    pub fn finish(self) -> SimNode {
        self.node
    }

    /// Perform `action`, waiting for whatever gates it first.
    pub fn perform_action(&mut self, action: &Arc<Action>) -> SimResult<()> {
        let rules = self.rules;
        let resolved = self.resolve_combo(action);

        // Waits happen before anything is applied so effects tick through them.
        if self.node.lock > 0.0 {
            self.advance_time(self.node.lock)?;
        }
        if resolved.uses_main_cooldown() && self.node.main_cooldown > 0.0 {
            self.advance_time(self.node.main_cooldown)?;
        }
        if let Some(cooldown) = &resolved.cooldown {
            let remaining = self
                .timeline()
                .cooldowns()
                .remaining(&cooldown.id, Some(cooldown.duration));
            if remaining > 0.0 {
                self.advance_time(remaining)?;
            }
        }
        if resolved.cast_time > 0.0 {
            self.write_journal(self.node.time, format_args!("Begin casting {}", action.name));
            self.advance_time(resolved.cast_time)?;
        }

        let time = self.node.time;
        trace!(action = %action.name, time, "Performing action");
        self.write_journal(time, format_args!("Performing {}", action.name));

        self.node.lock = resolved.lock;
        if let Some(delay) = resolved.main_cooldown {
            self.node.main_cooldown = rules.main_cooldown_delay(delay, &self.timeline());
        }

        let mut damage = 0.0;
        if resolved.potency > 0.0 {
            damage = rules.action_damage(&resolved, &self.timeline())?;
            self.add_damage(damage, time);
            self.write_journal(time, format_args!("{} deals {} damage", action.name, damage));
        }

        let mut periodic = None;
        if let Some(effect) = &resolved.periodic {
            let tick_damage = rules.periodic_tick_damage(effect, &self.timeline())?;
            self.apply_effect(EffectKind::Periodic, &effect.effect, Some(tick_damage))?;
            periodic = Some(PeriodicSnapshot {
                effect: Arc::clone(&effect.effect),
                tick_damage,
            });
        }

        for buff in &resolved.buffs {
            self.activate_effect(EffectKind::Buff, buff)?;
        }
        for debuff in &resolved.debuffs {
            self.activate_effect(EffectKind::Debuff, debuff)?;
        }

        if let Some(cooldown) = &resolved.cooldown {
            self.start_cooldown(cooldown);
        }

        for delta in &resolved.resources {
            self.change_resource(&delta.resource, delta.delta)?;
        }

        let record = ActionPerformed {
            action: Arc::clone(action),
            main_cooldown: resolved.uses_main_cooldown(),
            damage,
            periodic,
            time,
        };
        if record.main_cooldown {
            self.node.logs.main_cooldown_actions.push(record.clone());
        }
        self.node.logs.actions.push(record);

        if resolved.starts_combo {
            self.node.last_combo = Some(Arc::clone(action));
        }

        rules.on_action_performed(self, action)
    }

    /// Pick the enhanced variant when the combo condition holds.
    ///
    /// Any action carrying combo data consumes the open combo, whether or
    /// not it continues it.
    fn resolve_combo(&mut self, action: &Arc<Action>) -> Arc<Action> {
        let Some(combo) = &action.combo else {
            return Arc::clone(action);
        };

        let continues = self
            .node
            .last_combo
            .as_ref()
            .is_some_and(|last| last.name == combo.after)
            || self.rules.force_combo(action, &self.timeline());
        self.node.last_combo = None;

        if continues {
            Arc::clone(&combo.enhanced)
        } else {
            Arc::clone(action)
        }
    }

    /// Let `delta` seconds pass.
    ///
    /// Periodic damage ticks on a fixed grid anchored at time zero: for every
    /// boundary in `(now, now + delta]` each periodic effect still running at
    /// that boundary ticks once with its snapshotted damage, and one auto tick
    /// is added. Timed effects that run out within `delta` are ended, stamped
    /// at the current time. Main cooldown and lock are reduced, floored at
    /// zero, and the clock moves last.
    ///
    /// Both passes scan the whole lineage so that effects outlasting the
    /// provider's effect horizon keep ticking and still end exactly once.
    pub fn advance_time(&mut self, delta: f64) -> SimResult<()> {
        let rules = self.rules;
        let delta = delta.max(0.0);
        let now = self.node.time;

        let ticks_before = (now / TICK_INTERVAL).trunc() as i64;
        let ticks_after = ((now + delta) / TICK_INTERVAL).trunc() as i64;
        if ticks_after > ticks_before {
            let running = self.timeline().periodic().active(None);
            for tick in (ticks_before + 1)..=ticks_after {
                let boundary = tick as f64 * TICK_INTERVAL;
                let until = boundary - now;

                for event in &running {
                    if event.remaining_at(now).map_or(true, |r| r > until) {
                        let amount = event.tick_damage.unwrap_or(0.0);
                        self.add_damage(amount, boundary);
                        self.write_journal(
                            boundary,
                            format_args!("{} ticks for {}", event.effect.id, amount),
                        );
                    }
                }

                let auto = rules.auto_tick_damage(&self.timeline())?;
                self.add_damage(auto, boundary);
                self.write_journal(boundary, format_args!("Auto tick for {}", auto));
            }
        }

        for kind in [EffectKind::Buff, EffectKind::Debuff, EffectKind::Periodic] {
            let expiring: Vec<Arc<StatusEffect>> = self
                .timeline()
                .effects(kind)
                .active(None)
                .into_iter()
                .filter(|event| {
                    event.effect.duration.is_some()
                        && event.remaining_at(now).is_some_and(|r| r - delta <= 0.0)
                })
                .map(|event| event.effect)
                .collect();

            for effect in expiring {
                self.end_effect(kind, &effect)?;
            }
        }

        self.node.main_cooldown = (self.node.main_cooldown - delta).max(0.0);
        self.node.lock = (self.node.lock - delta).max(0.0);
        self.node.time += delta;
        Ok(())
    }

    /// Start a buff, debuff or periodic effect now.
    ///
    /// Periodic effects started this way tick for nothing; actions snapshot
    /// their tick damage through the rules.
    pub fn activate_effect(&mut self, kind: EffectKind, effect: &Arc<StatusEffect>) -> SimResult<()> {
        self.apply_effect(kind, effect, None)
    }

    fn apply_effect(
        &mut self,
        kind: EffectKind,
        effect: &Arc<StatusEffect>,
        tick_damage: Option<f64>,
    ) -> SimResult<()> {
        let time = self.node.time;
        self.node.logs.effects_mut(kind).push(StatusEvent {
            effect: Arc::clone(effect),
            change: EffectChange::Added,
            time,
            tick_damage,
        });
        trace!(effect = %effect.id, ?kind, time, "Effect applied");
        self.write_journal(time, format_args!("{} is applied.", effect.id));

        let rules = self.rules;
        rules.on_status_effect_changed(self, kind, effect, EffectChange::Added)
    }

    /// End an effect now. Does nothing if it is not active.
    pub fn end_effect(&mut self, kind: EffectKind, effect: &Arc<StatusEffect>) -> SimResult<()> {
        if !self.timeline().effects(kind).is_active(effect) {
            return Ok(());
        }

        let time = self.node.time;
        self.node.logs.effects_mut(kind).push(StatusEvent {
            effect: Arc::clone(effect),
            change: EffectChange::Ended,
            time,
            tick_damage: None,
        });
        trace!(effect = %effect.id, ?kind, time, "Effect ended");
        self.write_journal(time, format_args!("{} wears off.", effect.id));

        let rules = self.rules;
        rules.on_status_effect_changed(self, kind, effect, EffectChange::Ended)
    }

    /// Start a cooldown now.
    pub fn start_cooldown(&mut self, cooldown: &Cooldown) {
        self.node.logs.cooldowns.push(CooldownStarted {
            id: Arc::clone(&cooldown.id),
            time: self.node.time,
            duration: cooldown.duration,
        });
    }

    /// Add `amount` to a resource, then clamp it through the rules.
    pub fn change_resource(&mut self, name: &str, amount: i64) -> SimResult<()> {
        let level = self.node.resource(name) + amount;
        let level = self.store_resource(name, level);

        let time = self.node.time;
        if amount > 0 {
            self.write_journal(time, format_args!("Added {amount} {name}, new value: {level}"));
        } else if amount < 0 {
            self.write_journal(
                time,
                format_args!("Removed {} {name}, new value: {level}", amount.abs()),
            );
        }

        let rules = self.rules;
        rules.on_resource_changed(self, name)
    }

    /// Set a resource to `value`, then clamp it through the rules.
    pub fn set_resource(&mut self, name: &str, value: i64) -> SimResult<()> {
        self.store_resource(name, value);
        self.write_journal(self.node.time, format_args!("Set {name} = {value}"));

        let rules = self.rules;
        rules.on_resource_changed(self, name)
    }

    fn store_resource(&mut self, name: &str, value: i64) -> i64 {
        let level = self.rules.correct_resource(name, value);
        self.node.resources.insert(name.to_string(), level);
        level
    }

    /// Close any open combo.
    pub fn clear_last_combo(&mut self) {
        self.node.last_combo = None;
    }

    /// Record damage dealt at `time`.
    pub fn add_damage(&mut self, amount: f64, time: f64) {
        self.node.logs.damage.push(DamageAdded { amount, time });
    }

    /// Append a line to the node journal when the tree keeps journals.
    pub fn write_journal(&mut self, time: f64, message: fmt::Arguments<'_>) {
        if self.tree.journals() {
            self.node.logs.journal.push(JournalEntry {
                time,
                message: message.to_string(),
            });
        }
    }
}
