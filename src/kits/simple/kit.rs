//! Simple kit implementation.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::{Action, Catalog, PeriodicEffect, StatusEffect};
use crate::error::SimResult;
use crate::rules::{RotationRules, Verdict};
use crate::sim::Timeline;

/// Resource gained by finishing the combo and spent by `Spend`.
pub const FOCUS: &str = "Focus";

/// A small rule kit scored by damage per second.
#[derive(Clone, Debug)]
pub struct SimpleKit {
    catalog: Catalog,
    /// Actions in suggestion order.
    order: Vec<Arc<Action>>,
    horizon: f64,
    opening_depth: u32,
    dead_below: f64,
    auto_tick: f64,
    bonuses: FxHashMap<String, f64>,
    caps: FxHashMap<String, i64>,
}

/// Builder for creating a SimpleKit.
pub struct SimpleKitBuilder {
    actions: Option<Vec<Action>>,
    horizon: f64,
    opening_depth: u32,
    dead_below: f64,
    auto_tick: f64,
    bonuses: FxHashMap<String, f64>,
    caps: FxHashMap<String, i64>,
}

impl Default for SimpleKitBuilder {
    fn default() -> Self {
        let mut bonuses = FxHashMap::default();
        bonuses.insert("Fury".to_string(), 0.1);
        bonuses.insert("Surge".to_string(), 0.2);

        let mut caps = FxHashMap::default();
        caps.insert(FOCUS.to_string(), 100);

        Self {
            actions: None,
            horizon: 30.0,
            opening_depth: 2,
            dead_below: 0.0,
            auto_tick: 0.0,
            bonuses,
            caps,
        }
    }
}

impl SimpleKitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated time at which a node is finished.
    pub fn horizon(mut self, horizon: f64) -> Self {
        self.horizon = horizon;
        self
    }

    /// Depth at which the opening pass hands a node to the search.
    pub fn opening_depth(mut self, depth: u32) -> Self {
        self.opening_depth = depth;
        self
    }

    /// Nodes whose DPS falls below this are dropped.
    pub fn dead_below(mut self, dps: f64) -> Self {
        self.dead_below = dps;
        self
    }

    /// Ambient damage added on every tick.
    pub fn auto_tick(mut self, damage: f64) -> Self {
        self.auto_tick = damage;
        self
    }

    /// Replace the default actions. Suggestion order follows `actions`.
    pub fn actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Damage multiplier bonus while the buff `id` is active.
    pub fn bonus(mut self, id: impl Into<String>, bonus: f64) -> Self {
        self.bonuses.insert(id.into(), bonus);
        self
    }

    /// Upper bound of a resource. Every resource is floored at zero.
    pub fn cap(mut self, resource: impl Into<String>, max: i64) -> Self {
        self.caps.insert(resource.into(), max);
        self
    }

    /// Build the kit.
    pub fn build(self) -> SimpleKit {
        let actions = self.actions.unwrap_or_else(default_actions);

        let mut catalog = Catalog::new();
        let mut order = Vec::with_capacity(actions.len());
        for action in actions {
            register_effects(&mut catalog, &action);
            order.push(catalog.add_action(action));
        }

        SimpleKit {
            catalog,
            order,
            horizon: self.horizon,
            opening_depth: self.opening_depth,
            dead_below: self.dead_below,
            auto_tick: self.auto_tick,
            bonuses: self.bonuses,
            caps: self.caps,
        }
    }
}

fn register_effects(catalog: &mut Catalog, action: &Action) {
    for effect in action.buffs.iter().chain(&action.debuffs) {
        catalog.add_effect(StatusEffect::clone(effect));
    }
    if let Some(periodic) = &action.periodic {
        catalog.add_effect(StatusEffect::clone(&periodic.effect));
    }
    if let Some(combo) = &action.combo {
        register_effects(catalog, &combo.enhanced);
    }
}

fn default_actions() -> Vec<Action> {
    let fury = Arc::new(StatusEffect::timed("Fury", 15.0));
    let surge = Arc::new(StatusEffect::timed("Surge", 10.0));
    let bleed = Arc::new(StatusEffect::timed("Bleed", 24.0));

    vec![
        Action::new("Strike")
            .with_potency(200.0)
            .on_default_main_cooldown()
            .starts_combo(),
        Action::new("Follow")
            .with_potency(150.0)
            .on_default_main_cooldown()
            .continues_combo(
                "Strike",
                Action::new("Follow")
                    .with_potency(300.0)
                    .on_default_main_cooldown()
                    .applies_buff(fury)
                    .gains(FOCUS, 25),
            ),
        Action::new("Bleed")
            .on_default_main_cooldown()
            .applies_periodic(bleed, 40.0),
        Action::new("Surge")
            .with_cooldown(30.0)
            .with_lock(0.75)
            .applies_buff(surge),
        Action::new("Spend")
            .with_potency(400.0)
            .on_default_main_cooldown()
            .spends(FOCUS, 50),
    ]
}

impl SimpleKit {
    /// Kit with the default actions and settings.
    #[must_use]
    pub fn new() -> Self {
        SimpleKitBuilder::default().build()
    }

    #[must_use]
    pub fn builder() -> SimpleKitBuilder {
        SimpleKitBuilder::new()
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Damage multiplier from the buffs active at `node`.
    pub fn multiplier(&self, node: &Timeline<'_>) -> f64 {
        let active = node.buffs().active(Some(self.effect_horizon()));
        1.0 + active
            .iter()
            .filter_map(|event| self.bonuses.get(&event.effect.id))
            .sum::<f64>()
    }

    /// Whether `action` may be tried at `node`.
    fn is_usable(&self, action: &Action, node: &Timeline<'_>) -> bool {
        let affordable = action
            .resources
            .iter()
            .all(|delta| delta.delta >= 0 || node.resource(&delta.resource) + delta.delta >= 0);
        let ready = action
            .cooldown
            .as_ref()
            .map_or(true, |cd| !node.cooldowns().is_running(&cd.id, Some(cd.duration)));
        let fresh = action
            .periodic
            .as_ref()
            .map_or(true, |p| !node.periodic().is_active(&p.effect));
        affordable && ready && fresh
    }
}

impl Default for SimpleKit {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationRules for SimpleKit {
    fn suggest_actions(&self, node: &Timeline<'_>) -> SimResult<Vec<Arc<Action>>> {
        if node.time() >= self.horizon {
            return Ok(Vec::new());
        }
        Ok(self
            .order
            .iter()
            .filter(|action| self.is_usable(action, node))
            .cloned()
            .collect())
    }

    fn classify(&self, node: &Timeline<'_>) -> SimResult<Verdict> {
        let dps = node.damage().dps();
        Ok(if node.time() >= self.horizon {
            Verdict::conclusive(dps)
        } else if dps < self.dead_below {
            Verdict::dead(dps)
        } else {
            Verdict::inconclusive(dps)
        })
    }

    fn classify_opening(&self, node: &Timeline<'_>) -> SimResult<Verdict> {
        if node.depth() >= self.opening_depth {
            Ok(Verdict::conclusive(node.damage().dps()))
        } else {
            self.classify(node)
        }
    }

    fn action_damage(&self, action: &Action, node: &Timeline<'_>) -> SimResult<f64> {
        Ok(action.potency * self.multiplier(node))
    }

    fn periodic_tick_damage(&self, effect: &PeriodicEffect, node: &Timeline<'_>) -> SimResult<f64> {
        Ok(effect.potency * self.multiplier(node))
    }

    fn auto_tick_damage(&self, _node: &Timeline<'_>) -> SimResult<f64> {
        Ok(self.auto_tick)
    }

    fn correct_resource(&self, name: &str, value: i64) -> i64 {
        let max = self.caps.get(name).copied().unwrap_or(i64::MAX);
        value.clamp(0, max)
    }
}
