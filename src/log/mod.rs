//! Incremental per-node event logs.
//!
//! A node stores only the events recorded while it was current. The full
//! history of a node is the concatenation of its ancestors' logs along the
//! root path, rebuilt lazily by [`History`] and [`ReverseHistory`] without
//! ever copying ancestor events into the child.
//!
//! Ancestors are resolved through the [`SimTree`] arena, so a lineage that
//! runs into a detached ancestor simply ends there.

pub mod events;

use std::sync::Arc;

use crate::search::SimTree;
use crate::sim::{NodeId, NodeLogs, SimNode};

pub use events::{
    ActionPerformed, CooldownStarted, DamageAdded, EffectChange, JournalEntry, PeriodicSnapshot,
    StatusEvent,
};

/// Picks one log out of a node's log set.
pub type LogSelector<E> = fn(&NodeLogs) -> &EventLog<E>;

/// Append-only events recorded at a single node.
#[derive(Clone, Debug, PartialEq)]
pub struct EventLog<E> {
    events: Vec<E>,
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> EventLog<E> {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to this node's own sequence.
    #[inline]
    pub fn push(&mut self, event: E) {
        self.events.push(event);
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&E> {
        self.events.get(index)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events recorded at this node, oldest first.
    #[must_use]
    pub fn as_slice(&self) -> &[E] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.events.iter()
    }
}

/// One log viewed together with the same log of every ancestor.
///
/// Cheap to copy; each call to [`history`](Self::history) or
/// [`reverse_history`](Self::reverse_history) starts a fresh traversal.
pub struct Lineage<'a, E> {
    tree: &'a SimTree,
    own: &'a EventLog<E>,
    parent: Option<NodeId>,
    select: LogSelector<E>,
}

impl<E> Clone for Lineage<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Lineage<'_, E> {}

impl<'a, E: Clone> Lineage<'a, E> {
    /// View `select(node)` and the matching logs above `node`.
    pub fn new(tree: &'a SimTree, node: &'a SimNode, select: LogSelector<E>) -> Self {
        Self {
            tree,
            own: select(node.logs()),
            parent: node.parent(),
            select,
        }
    }

    /// Events recorded at the viewed node only.
    #[must_use]
    pub fn own(&self) -> &'a [E] {
        self.own.as_slice()
    }

    /// Root-to-node events, oldest first.
    pub fn history(&self) -> History<'a, E> {
        let mut ancestors = Vec::new();
        let mut cursor = self.parent;
        while let Some(id) = cursor {
            let Some(node) = self.tree.get(id) else {
                break;
            };
            cursor = node.parent();
            ancestors.push(node);
        }
        ancestors.reverse();

        History {
            select: self.select,
            ancestors: ancestors.into_iter(),
            current: None,
            own: self.own.iter(),
        }
    }

    /// Node-to-root events, most recent first.
    pub fn reverse_history(&self) -> ReverseHistory<'a, E> {
        ReverseHistory {
            tree: self.tree,
            select: self.select,
            own: self.own.iter().rev(),
            current: None,
            next_parent: self.parent,
        }
    }
}

/// Chronological traversal of a lineage.
pub struct History<'a, E> {
    select: LogSelector<E>,
    ancestors: std::vec::IntoIter<Arc<SimNode>>,
    current: Option<(Arc<SimNode>, usize)>,
    own: std::slice::Iter<'a, E>,
}

impl<E: Clone> Iterator for History<'_, E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        loop {
            if let Some((node, index)) = self.current.as_mut() {
                if let Some(event) = (self.select)(node.logs()).get(*index) {
                    *index += 1;
                    return Some(event.clone());
                }
            }
            match self.ancestors.next() {
                Some(node) => self.current = Some((node, 0)),
                None => return self.own.next().cloned(),
            }
        }
    }
}

/// Most-recent-first traversal of a lineage.
///
/// Ancestors are looked up one at a time, so stopping early never touches
/// the older part of the path.
pub struct ReverseHistory<'a, E> {
    tree: &'a SimTree,
    select: LogSelector<E>,
    own: std::iter::Rev<std::slice::Iter<'a, E>>,
    current: Option<(Arc<SimNode>, usize)>,
    next_parent: Option<NodeId>,
}

impl<E: Clone> Iterator for ReverseHistory<'_, E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        if let Some(event) = self.own.next() {
            return Some(event.clone());
        }
        loop {
            if let Some((node, remaining)) = self.current.as_mut() {
                if *remaining > 0 {
                    *remaining -= 1;
                    return (self.select)(node.logs()).get(*remaining).cloned();
                }
            }
            let id = self.next_parent.take()?;
            let node = self.tree.get(id)?;
            self.next_parent = node.parent();
            let len = (self.select)(node.logs()).len();
            self.current = Some((node, len));
        }
    }
}
