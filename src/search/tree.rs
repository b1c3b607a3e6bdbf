//! Arena-based simulation tree.
//!
//! Nodes live in a flat slot vector and refer to each other by [`NodeId`].
//! A parent owns the ids of its children; a child's parent link is a plain
//! id looked up through the arena, so there are no reference cycles and
//! detaching a subtree is just dropping ids and recycling their slots.
//!
//! Slots carry a generation that is bumped on release. A stale id therefore
//! resolves to `None` instead of to the node that reused its slot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use im::OrdMap;
use serde::{Deserialize, Serialize};

use crate::core::Action;
use crate::error::{SimError, SimResult};
use crate::rules::RotationRules;
use crate::sim::{Children, NodeId, SimNode, Step, Timeline};

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Arc<SimNode>>,
}

/// Concurrent arena of simulation nodes rooted at [`NodeId::ROOT`].
///
/// All methods take `&self`; the tree is shared between search workers.
/// Child lists are guarded per node, so branching one node never blocks
/// work on another.
#[derive(Debug)]
pub struct SimTree {
    slots: RwLock<Vec<Slot>>,
    free: Mutex<Vec<u32>>,
    live: AtomicUsize,
    journal: bool,
}

impl Default for SimTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTree {
    /// Create a tree whose root is at time zero with no resources.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(SimNode::root())
    }

    /// Create a tree whose root starts with the given resource levels.
    #[must_use]
    pub fn with_resources<I, S>(resources: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let resources: OrdMap<String, i64> = resources
            .into_iter()
            .map(|(name, level)| (name.into(), level))
            .collect();
        Self::with_root(SimNode::with_resources(resources))
    }

    fn with_root(root: SimNode) -> Self {
        Self {
            slots: RwLock::new(vec![Slot {
                generation: 0,
                node: Some(Arc::new(root)),
            }]),
            free: Mutex::new(Vec::new()),
            live: AtomicUsize::new(1),
            journal: false,
        }
    }

    /// Record per-node journals while simulating.
    #[must_use]
    pub fn with_journal(mut self, enabled: bool) -> Self {
        self.journal = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn journals(&self) -> bool {
        self.journal
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Look up a node; `None` once it has been detached.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<Arc<SimNode>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.get(id.index() as usize)?;
        if slot.generation == id.generation() {
            slot.node.clone()
        } else {
            None
        }
    }

    /// Look up a node that must still be attached.
    pub fn node(&self, id: NodeId) -> SimResult<Arc<SimNode>> {
        self.get(id).ok_or(SimError::NodeDetached { id })
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of attached nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Always false: the root is never detached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current children of a node; empty once detached.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children {
        self.get(id).map(|node| node.children()).unwrap_or_default()
    }

    fn alloc(&self, node: SimNode) -> NodeId {
        let node = Arc::new(node);
        let reused = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let id = match reused {
            Some(index) => {
                let slot = &mut slots[index as usize];
                slot.node = Some(node);
                NodeId::new(index, slot.generation)
            }
            None => {
                let index = slots.len() as u32;
                slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId::new(index, 0)
            }
        };
        drop(slots);

        self.live.fetch_add(1, Ordering::Relaxed);
        id
    }

    /// Publish `node` as an additional child of `parent`.
    pub fn attach(&self, parent: NodeId, node: SimNode) -> SimResult<NodeId> {
        let parent_node = self.node(parent)?;
        debug_assert_eq!(node.parent(), Some(parent));
        let id = self.alloc(node);
        parent_node.children_mut().push(id);
        Ok(id)
    }

    /// Replace the children of `id` with one new child per action, in order.
    ///
    /// Every child is simulated before any is published, so a failing
    /// action leaves the previous children in place. The replaced subtrees
    /// are released.
    pub fn branch(
        &self,
        id: NodeId,
        actions: &[Arc<Action>],
        rules: &dyn RotationRules,
    ) -> SimResult<Children> {
        let parent = self.node(id)?;

        let mut simulated = Vec::with_capacity(actions.len());
        for action in actions {
            let mut step = Step::new(self, id, rules)?;
            step.perform_action(action)?;
            simulated.push(step.finish());
        }

        let fresh: Children = simulated.into_iter().map(|node| self.alloc(node)).collect();
        let replaced = std::mem::replace(&mut *parent.children_mut(), fresh.clone());
        for child in replaced {
            self.release(child);
        }
        Ok(fresh)
    }

    /// Free `id` and its whole subtree. Returns the number of nodes freed.
    ///
    /// The caller is responsible for removing `id` from its parent's list.
    fn release(&self, id: NodeId) -> usize {
        if id == self.root() {
            return 0;
        }

        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let node = {
                let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
                match slots.get_mut(id.index() as usize) {
                    Some(slot) if slot.generation == id.generation() && slot.node.is_some() => {
                        slot.generation = slot.generation.wrapping_add(1);
                        slot.node.take()
                    }
                    _ => None,
                }
            };
            let Some(node) = node else {
                continue;
            };

            stack.extend(node.children_mut().drain(..));
            self.free
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(id.index());
            self.live.fetch_sub(1, Ordering::Relaxed);
            freed += 1;
        }
        freed
    }

    /// Lazy depth-first enumeration of the nodes under `id` that have no
    /// children (`id` itself if it has none).
    pub fn leaves(&self, id: NodeId) -> Leaves<'_> {
        Leaves {
            tree: self,
            stack: vec![id],
        }
    }

    /// Detach `id` from its parent, then keep detaching ancestors that are
    /// left without children. Stops at the first ancestor that still has
    /// children, and never detaches the root.
    ///
    /// Returns the number of nodes freed.
    pub fn prune(&self, id: NodeId) -> usize {
        self.detach_while(id, |_| false)
    }

    /// Like [`prune`](Self::prune), but also stops at any childless
    /// ancestor for which `keep` returns true.
    pub fn detach_while<F>(&self, id: NodeId, keep: F) -> usize
    where
        F: Fn(NodeId) -> bool,
    {
        let mut freed = 0;
        let mut current = id;
        loop {
            if current == self.root() {
                return freed;
            }
            let Some(parent_id) = self.get(current).and_then(|node| node.parent()) else {
                return freed;
            };

            let parent_empty = match self.get(parent_id) {
                Some(parent) => {
                    let mut children = parent.children_mut();
                    children.retain(|child| *child != current);
                    children.is_empty()
                }
                None => false,
            };
            freed += self.release(current);

            if !parent_empty || keep(parent_id) {
                return freed;
            }
            current = parent_id;
        }
    }

    /// Walk from `from` along the given actions, reusing an existing child
    /// whose own action matches and simulating a new child otherwise.
    /// Returns the final node.
    pub fn replay(
        &self,
        from: NodeId,
        actions: &[Arc<Action>],
        rules: &dyn RotationRules,
    ) -> SimResult<NodeId> {
        let mut current = from;
        for action in actions {
            let existing = self.children(current).into_iter().find(|child| {
                self.get(*child).is_some_and(|node| {
                    node.logs()
                        .actions
                        .as_slice()
                        .first()
                        .is_some_and(|e| e.action.name == action.name)
                })
            });

            current = match existing {
                Some(child) => child,
                None => {
                    let mut step = Step::new(self, current, rules)?;
                    step.perform_action(action)?;
                    self.attach(current, step.finish())?
                }
            };
        }
        Ok(current)
    }

    /// Action history of `id` for external serialization.
    pub fn action_path(&self, id: NodeId) -> SimResult<Vec<PathStep>> {
        let node = self.node(id)?;
        let view = Timeline::new(self, &node);
        let path = view
            .actions()
            .history()
            .map(|e| PathStep {
                action: e.action.name.clone(),
                main_cooldown: e.main_cooldown,
                time: e.time,
                damage: e.damage,
            })
            .collect();
        Ok(path)
    }

    /// Render the action history of `id` as `"A > [B] > C"`.
    pub fn render_history(&self, id: NodeId) -> SimResult<String> {
        let node = self.node(id)?;
        Ok(Timeline::new(self, &node).actions().render())
    }

    /// Statistics over the attached tree.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            stats.live_nodes += 1;
            stats.max_depth = stats.max_depth.max(node.depth());
            let children = node.children();
            if children.is_empty() {
                stats.leaf_count += 1;
            }
            stack.extend(children);
        }
        stats
    }
}

/// Iterator returned by [`SimTree::leaves`].
pub struct Leaves<'a> {
    tree: &'a SimTree,
    stack: Vec<NodeId>,
}

impl Iterator for Leaves<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(id) = self.stack.pop() {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            let children = node.children();
            if children.is_empty() {
                return Some(id);
            }
            self.stack.extend(children.iter().rev().copied());
        }
        None
    }
}

/// One performed action on an exported path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub action: String,
    pub main_cooldown: bool,
    pub time: f64,
    pub damage: f64,
}

/// Statistics about the simulation tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Nodes reachable from the root.
    pub live_nodes: usize,

    /// Reachable nodes without children.
    pub leaf_count: usize,

    /// Deepest reachable node.
    pub max_depth: u32,
}
