//! Action descriptors: what a rotation step does when performed.
//!
//! Actions are immutable value data. A rules provider builds each one once
//! while setting up its [`Catalog`](super::Catalog) and shares it behind an
//! `Arc`; the simulation never mutates a descriptor after that.
//!
//! An action can:
//! - consume the main cooldown (and set its delay)
//! - start its own independent cooldown
//! - lock further actions for a fixed time afterwards
//! - deal direct damage (potency is turned into damage by the provider)
//! - apply buffs, debuffs and one periodic damage effect
//! - change named resources
//! - continue a combo, swapping in an enhanced variant of itself

use std::sync::Arc;

use smallvec::SmallVec;

/// Main cooldown delay used by [`Action::on_default_main_cooldown`].
pub const DEFAULT_MAIN_COOLDOWN: f64 = 2.5;

/// A timed (or indefinite) buff, debuff or periodic effect.
///
/// Effects are identified by `id`; two effects with the same id are the
/// same effect for activation and expiry purposes.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusEffect {
    /// Effect identifier.
    pub id: String,

    /// Duration in simulated seconds; `None` lasts until explicitly ended.
    pub duration: Option<f64>,
}

impl StatusEffect {
    /// Create an effect with a fixed duration.
    #[must_use]
    pub fn timed(id: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            duration: Some(duration),
        }
    }

    /// Create an effect that stays active until ended.
    #[must_use]
    pub fn indefinite(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            duration: None,
        }
    }
}

impl std::fmt::Display for StatusEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Which status effect track an effect lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Buff,
    Debuff,
    Periodic,
}

/// A periodic damage effect carried by an action.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodicEffect {
    /// The timed effect that is tracked while the damage ticks.
    pub effect: Arc<StatusEffect>,

    /// Potency of a single tick, converted into damage by the provider when
    /// the effect is applied.
    pub potency: f64,
}

/// An independent cooldown started by an action.
#[derive(Clone, Debug, PartialEq)]
pub struct Cooldown {
    /// Cooldown identifier. Actions sharing an id share the cooldown.
    pub id: Arc<str>,

    /// Recast time in simulated seconds.
    pub duration: f64,
}

/// A signed change to a named resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceDelta {
    pub resource: String,
    pub delta: i64,
}

/// Combo continuation: when `after` was the last combo-initiating action,
/// `enhanced` is performed instead of the base action.
#[derive(Clone, Debug, PartialEq)]
pub struct Combo {
    /// Name of the action that must precede this one.
    pub after: String,

    /// The variant performed when the combo condition holds.
    pub enhanced: Arc<Action>,
}

/// A complete action descriptor.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use rotation_search::core::{Action, StatusEffect};
///
/// let haste = Arc::new(StatusEffect::timed("Haste", 20.0));
///
/// let opener = Action::new("Opener")
///     .with_potency(150.0)
///     .on_main_cooldown(2.5)
///     .with_lock(0.75)
///     .starts_combo();
///
/// let follow = Action::new("Follow Up")
///     .with_potency(100.0)
///     .on_main_cooldown(2.5)
///     .continues_combo(
///         "Opener",
///         Action::new("Follow Up")
///             .with_potency(280.0)
///             .on_main_cooldown(2.5)
///             .applies_buff(haste),
///     );
///
/// assert!(opener.starts_combo);
/// assert!(follow.has_combo());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Action {
    /// Action name. Also the identity used by combos and history queries.
    pub name: String,

    /// Cast time waited out before the action resolves.
    pub cast_time: f64,

    /// Main cooldown delay, if the action consumes the main cooldown.
    pub main_cooldown: Option<f64>,

    /// Independent cooldown, if any.
    pub cooldown: Option<Cooldown>,

    /// Post-action lock duration.
    pub lock: f64,

    /// Direct damage potency (0 = no direct damage).
    pub potency: f64,

    /// Buffs applied when performed.
    pub buffs: Vec<Arc<StatusEffect>>,

    /// Debuffs applied when performed.
    pub debuffs: Vec<Arc<StatusEffect>>,

    /// Periodic damage effect applied when performed.
    pub periodic: Option<PeriodicEffect>,

    /// Resource changes applied when performed.
    pub resources: SmallVec<[ResourceDelta; 2]>,

    /// Combo continuation data.
    pub combo: Option<Combo>,

    /// Whether performing this action opens (or advances) a combo.
    pub starts_combo: bool,
}

impl Action {
    /// Create an action that does nothing but exist.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cast_time: 0.0,
            main_cooldown: None,
            cooldown: None,
            lock: 0.0,
            potency: 0.0,
            buffs: Vec::new(),
            debuffs: Vec::new(),
            periodic: None,
            resources: SmallVec::new(),
            combo: None,
            starts_combo: false,
        }
    }

    #[must_use]
    pub fn with_cast_time(mut self, cast_time: f64) -> Self {
        self.cast_time = cast_time;
        self
    }

    #[must_use]
    pub fn with_potency(mut self, potency: f64) -> Self {
        self.potency = potency;
        self
    }

    /// Consume the main cooldown with the given delay.
    #[must_use]
    pub fn on_main_cooldown(mut self, delay: f64) -> Self {
        self.main_cooldown = Some(delay);
        self
    }

    /// Consume the main cooldown with [`DEFAULT_MAIN_COOLDOWN`].
    #[must_use]
    pub fn on_default_main_cooldown(self) -> Self {
        self.on_main_cooldown(DEFAULT_MAIN_COOLDOWN)
    }

    /// Start an independent cooldown keyed by this action's name.
    #[must_use]
    pub fn with_cooldown(mut self, duration: f64) -> Self {
        let id = Arc::from(self.name.as_str());
        self.cooldown = Some(Cooldown { id, duration });
        self
    }

    /// Start an independent cooldown under an explicit id.
    #[must_use]
    pub fn with_shared_cooldown(mut self, id: impl Into<String>, duration: f64) -> Self {
        let id: String = id.into();
        self.cooldown = Some(Cooldown {
            id: Arc::from(id),
            duration,
        });
        self
    }

    #[must_use]
    pub fn with_lock(mut self, lock: f64) -> Self {
        self.lock = lock;
        self
    }

    #[must_use]
    pub fn applies_buff(mut self, effect: Arc<StatusEffect>) -> Self {
        self.buffs.push(effect);
        self
    }

    #[must_use]
    pub fn applies_debuff(mut self, effect: Arc<StatusEffect>) -> Self {
        self.debuffs.push(effect);
        self
    }

    #[must_use]
    pub fn applies_periodic(mut self, effect: Arc<StatusEffect>, potency: f64) -> Self {
        self.periodic = Some(PeriodicEffect { effect, potency });
        self
    }

    /// Add `amount` to a resource.
    #[must_use]
    pub fn gains(mut self, resource: impl Into<String>, amount: i64) -> Self {
        self.resources.push(ResourceDelta {
            resource: resource.into(),
            delta: amount,
        });
        self
    }

    /// Remove `amount` from a resource.
    #[must_use]
    pub fn spends(mut self, resource: impl Into<String>, amount: i64) -> Self {
        self.resources.push(ResourceDelta {
            resource: resource.into(),
            delta: -amount,
        });
        self
    }

    /// Perform `enhanced` instead when `after` was the last combo action.
    #[must_use]
    pub fn continues_combo(mut self, after: impl Into<String>, enhanced: Action) -> Self {
        self.combo = Some(Combo {
            after: after.into(),
            enhanced: Arc::new(enhanced),
        });
        self
    }

    #[must_use]
    pub fn starts_combo(mut self) -> Self {
        self.starts_combo = true;
        self
    }

    /// Whether this action consumes the main cooldown.
    #[inline]
    #[must_use]
    pub fn uses_main_cooldown(&self) -> bool {
        self.main_cooldown.is_some()
    }

    /// Whether this action carries combo continuation data.
    #[inline]
    #[must_use]
    pub fn has_combo(&self) -> bool {
        self.combo.is_some()
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_defaults() {
        let action = Action::new("Idle");

        assert_eq!(action.name, "Idle");
        assert_eq!(action.cast_time, 0.0);
        assert!(!action.uses_main_cooldown());
        assert!(action.cooldown.is_none());
        assert!(!action.has_combo());
        assert!(!action.starts_combo);
        assert!(action.resources.is_empty());
    }

    #[test]
    fn test_default_main_cooldown() {
        let action = Action::new("Strike").on_default_main_cooldown();

        assert!(action.uses_main_cooldown());
        assert_eq!(action.main_cooldown, Some(DEFAULT_MAIN_COOLDOWN));
    }

    #[test]
    fn test_cooldown_defaults_to_name() {
        let action = Action::new("Surge").with_cooldown(40.0);
        let cd = action.cooldown.unwrap();
        assert_eq!(&*cd.id, "Surge");
        assert_eq!(cd.duration, 40.0);

        let shared = Action::new("Surge II").with_shared_cooldown("Surge", 40.0);
        assert_eq!(&*shared.cooldown.unwrap().id, "Surge");
    }

    #[test]
    fn test_resource_deltas() {
        let action = Action::new("Spender").gains("Focus", 10).spends("Charge", 25);

        assert_eq!(action.resources.len(), 2);
        assert_eq!(action.resources[0].delta, 10);
        assert_eq!(action.resources[1].resource, "Charge");
        assert_eq!(action.resources[1].delta, -25);
    }

    #[test]
    fn test_combo_enhanced_variant() {
        let action = Action::new("Follow")
            .with_potency(100.0)
            .continues_combo("Open", Action::new("Follow").with_potency(280.0));

        let combo = action.combo.as_ref().unwrap();
        assert_eq!(combo.after, "Open");
        assert_eq!(combo.enhanced.potency, 280.0);
        assert_eq!(action.potency, 100.0);
    }

    #[test]
    fn test_status_effects() {
        let timed = StatusEffect::timed("Haste", 30.0);
        let forever = StatusEffect::indefinite("Stance");

        assert_eq!(timed.duration, Some(30.0));
        assert_eq!(forever.duration, None);
        assert_eq!(format!("{}", forever), "Stance");
    }
}
