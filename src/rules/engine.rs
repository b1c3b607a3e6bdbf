//! The rule provider contract.
//!
//! The search engine never interprets rotation content itself. A
//! `RotationRules` implementation decides which actions are worth trying at
//! a node, how good a node is, how potency turns into damage, and how
//! resources are bounded. The engine calls back into it synchronously while
//! simulating and exploring.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Action, EffectKind, PeriodicEffect, StatusEffect};
use crate::error::SimResult;
use crate::log::EffectChange;
use crate::search::SimTree;
use crate::sim::{NodeId, Step, Timeline};

/// How far back active-effect scans look by default, in simulated seconds.
pub const DEFAULT_EFFECT_HORIZON: f64 = 60.0;

/// Classification of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Worth expanding further.
    Inconclusive,
    /// Finished; a candidate result.
    Conclusive,
    /// Not worth pursuing.
    Dead,
}

/// A status together with the node's score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: Status,
    pub score: f64,
}

impl Verdict {
    #[must_use]
    pub const fn inconclusive(score: f64) -> Self {
        Self {
            status: Status::Inconclusive,
            score,
        }
    }

    #[must_use]
    pub const fn conclusive(score: f64) -> Self {
        Self {
            status: Status::Conclusive,
            score,
        }
    }

    #[must_use]
    pub const fn dead(score: f64) -> Self {
        Self {
            status: Status::Dead,
            score,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_conclusive(&self) -> bool {
        self.status == Status::Conclusive
    }
}

/// A starting point for the depth-first search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Seed {
    pub node: NodeId,
    pub verdict: Verdict,
}

/// Rule provider trait.
///
/// Implementations must be deterministic for a given node if the search
/// results are to be reproducible.
///
/// ## Implementation Notes
///
/// - `suggest_actions`: an empty list makes the node a leaf
/// - `classify`: `Conclusive` nodes are ranked by score, `Dead` nodes dropped
/// - `initial_states`: the default runs the opening pass (see [`Opening`])
/// - Hooks run inside the simulation of a single node and may mutate it
///   through the [`Step`] they receive
pub trait RotationRules: Send + Sync {
    /// Candidate actions at this node, in the order they should be tried.
    fn suggest_actions(&self, node: &Timeline<'_>) -> SimResult<Vec<Arc<Action>>>;

    /// Classify and score a node during the search.
    fn classify(&self, node: &Timeline<'_>) -> SimResult<Verdict>;

    /// Classify a node during the opening pass.
    ///
    /// `Conclusive` here means "good enough to seed the search from".
    fn classify_opening(&self, node: &Timeline<'_>) -> SimResult<Verdict> {
        self.classify(node)
    }

    /// Produce the seeds the search starts from.
    fn initial_states(&self, opening: &Opening<'_>) -> SimResult<Vec<Seed>> {
        opening.resolve()
    }

    /// Direct damage of an action with non-zero potency.
    fn action_damage(&self, action: &Action, node: &Timeline<'_>) -> SimResult<f64>;

    /// Damage of one tick of a periodic effect, snapshotted when applied.
    fn periodic_tick_damage(&self, effect: &PeriodicEffect, node: &Timeline<'_>) -> SimResult<f64>;

    /// Ambient damage added on every tick boundary.
    fn auto_tick_damage(&self, _node: &Timeline<'_>) -> SimResult<f64> {
        Ok(0.0)
    }

    /// Main cooldown delay actually applied for an action's base delay.
    fn main_cooldown_delay(&self, base: f64, _node: &Timeline<'_>) -> f64 {
        base
    }

    /// Force the enhanced combo variant even without its predecessor.
    fn force_combo(&self, _action: &Action, _node: &Timeline<'_>) -> bool {
        false
    }

    /// Clamp a resource level into its valid range.
    fn correct_resource(&self, _name: &str, value: i64) -> i64 {
        value
    }

    /// How far back provider-side active-effect scans look. The simulation
    /// itself always scans the whole lineage when ticking and expiring.
    fn effect_horizon(&self) -> f64 {
        DEFAULT_EFFECT_HORIZON
    }

    /// Called after an action has been fully applied.
    fn on_action_performed(&self, _step: &mut Step<'_>, _action: &Arc<Action>) -> SimResult<()> {
        Ok(())
    }

    /// Called after a status effect starts or ends.
    fn on_status_effect_changed(
        &self,
        _step: &mut Step<'_>,
        _kind: EffectKind,
        _effect: &Arc<StatusEffect>,
        _change: EffectChange,
    ) -> SimResult<()> {
        Ok(())
    }

    /// Called after a resource level changed.
    fn on_resource_changed(&self, _step: &mut Step<'_>, _name: &str) -> SimResult<()> {
        Ok(())
    }
}

/// The opening pass: breadth-wise branching from the root until every
/// branch is classified.
///
/// Each round branches every frontier node with its suggested actions and
/// classifies the children with [`RotationRules::classify_opening`].
/// `Conclusive` children become seeds, `Inconclusive` children form the
/// next frontier and `Dead` children are pruned.
pub struct Opening<'a> {
    tree: &'a SimTree,
    rules: &'a dyn RotationRules,
    root: NodeId,
}

impl<'a> Opening<'a> {
    pub fn new(tree: &'a SimTree, rules: &'a dyn RotationRules, root: NodeId) -> Self {
        Self { tree, rules, root }
    }

    #[must_use]
    pub fn tree(&self) -> &'a SimTree {
        self.tree
    }

    #[must_use]
    pub fn rules(&self) -> &'a dyn RotationRules {
        self.rules
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Run the opening pass to completion.
    pub fn resolve(&self) -> SimResult<Vec<Seed>> {
        let mut seeds = Vec::new();
        let mut frontier = vec![self.root];
        let mut round = 0usize;

        while !frontier.is_empty() {
            round += 1;
            let mut next = Vec::new();

            for id in frontier {
                let actions = {
                    let node = self.tree.node(id)?;
                    self.rules.suggest_actions(&Timeline::new(self.tree, &node))?
                };
                let children = self.tree.branch(id, &actions, self.rules)?;
                if children.is_empty() && id != self.root {
                    self.tree.prune(id);
                    continue;
                }

                for child in children {
                    let node = self.tree.node(child)?;
                    let verdict = self.rules.classify_opening(&Timeline::new(self.tree, &node))?;
                    match verdict.status {
                        Status::Conclusive => seeds.push(Seed {
                            node: child,
                            verdict,
                        }),
                        Status::Inconclusive => next.push(child),
                        Status::Dead => {
                            self.tree.prune(child);
                        }
                    }
                }
            }

            debug!(
                round,
                seeds = seeds.len(),
                frontier = next.len(),
                "Opening pass round complete"
            );
            frontier = next;
        }

        Ok(seeds)
    }
}
