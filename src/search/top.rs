//! Bounded best-results tracker.
//!
//! Keeps the `capacity` highest-scoring conclusive nodes in descending order.
//! A node that falls out of the ranking is detached from the tree on the
//! spot, so abandoned results stop holding memory.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::tree::SimTree;
use crate::error::ConfigError;
use crate::sim::NodeId;

/// A ranked node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    pub node: NodeId,
    pub score: f64,
}

/// What happened on [`TopResults::insert`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InsertOutcome {
    /// Position the new entry took, `None` if it did not make the cut.
    pub rank: Option<usize>,

    /// The entry pushed out, which is the new entry itself when it did not
    /// make the cut.
    pub evicted: Option<ScoredNode>,
}

impl InsertOutcome {
    /// Whether the new entry is now the best result.
    #[inline]
    #[must_use]
    pub fn is_new_best(&self) -> bool {
        self.rank == Some(0)
    }
}

/// Thread-safe top-N list of scored nodes.
#[derive(Debug)]
pub struct TopResults {
    capacity: usize,
    entries: Mutex<Vec<ScoredNode>>,
}

impl TopResults {
    /// Create a tracker holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "top_results",
            });
        }
        Ok(Self {
            capacity,
            entries: Mutex::new(Vec::with_capacity(capacity + 1)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ScoredNode>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Highest-scoring entry.
    #[must_use]
    pub fn best(&self) -> Option<ScoredNode> {
        self.lock().first().copied()
    }

    /// Snapshot of all entries, best first.
    #[must_use]
    pub fn entries(&self) -> Vec<ScoredNode> {
        self.lock().clone()
    }

    /// Forget every entry without touching the tree.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Rank `node` by `score`.
    ///
    /// The entry goes after every entry with a greater or equal score, so
    /// among equal scores the earlier insertion ranks higher. When the list
    /// overflows, the last entry is evicted and detached from `tree`,
    /// together with every ancestor left without children that is not
    /// itself a ranked entry.
    pub fn insert(&self, tree: &SimTree, node: NodeId, score: f64) -> InsertOutcome {
        let mut entries = self.lock();
        let position = entries
            .iter()
            .position(|entry| score > entry.score)
            .unwrap_or(entries.len());

        let outcome = if position >= self.capacity {
            InsertOutcome {
                rank: None,
                evicted: Some(ScoredNode { node, score }),
            }
        } else {
            entries.insert(position, ScoredNode { node, score });
            let evicted = if entries.len() > self.capacity {
                entries.pop()
            } else {
                None
            };
            InsertOutcome {
                rank: Some(position),
                evicted,
            }
        };

        // Detach while still holding the list so no ranked node is removed.
        if let Some(evicted) = outcome.evicted {
            tree.detach_while(evicted.node, |id| entries.iter().any(|e| e.node == id));
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grow(tree: &SimTree, parent: NodeId) -> NodeId {
        let node = tree.node(parent).unwrap().child_of(parent);
        tree.attach(parent, node).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            TopResults::new(0).unwrap_err(),
            ConfigError::ZeroCapacity {
                field: "top_results"
            }
        );
    }

    #[test]
    fn test_descending_order() {
        let tree = SimTree::new();
        let top = TopResults::new(3).unwrap();

        for score in [10.0, 30.0, 20.0] {
            let node = grow(&tree, tree.root());
            top.insert(&tree, node, score);
        }

        let scores: Vec<f64> = top.entries().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![30.0, 20.0, 10.0]);
        assert_eq!(top.best().map(|e| e.score), Some(30.0));
    }

    #[test]
    fn test_evicts_minimum_and_detaches() {
        let tree = SimTree::new();
        let top = TopResults::new(2).unwrap();
        let a = grow(&tree, tree.root());
        let b = grow(&tree, tree.root());
        let c = grow(&tree, tree.root());

        top.insert(&tree, a, 5.0);
        top.insert(&tree, b, 7.0);
        let outcome = top.insert(&tree, c, 6.0);

        assert_eq!(outcome.rank, Some(1));
        assert_eq!(outcome.evicted, Some(ScoredNode { node: a, score: 5.0 }));
        assert!(!tree.contains(a));
        assert!(tree.contains(b));
        assert!(tree.contains(c));
    }

    #[test]
    fn test_equal_to_minimum_evicts_itself() {
        let tree = SimTree::new();
        let top = TopResults::new(1).unwrap();
        let first = grow(&tree, tree.root());
        let second = grow(&tree, tree.root());

        assert!(top.insert(&tree, first, 42.0).is_new_best());
        let outcome = top.insert(&tree, second, 42.0);

        assert_eq!(outcome.rank, None);
        assert_eq!(
            outcome.evicted,
            Some(ScoredNode {
                node: second,
                score: 42.0
            })
        );
        assert_eq!(top.entries(), vec![ScoredNode { node: first, score: 42.0 }]);
        assert!(!tree.contains(second));
    }

    #[test]
    fn test_eviction_stops_at_ranked_ancestor_chain() {
        let tree = SimTree::new();
        let top = TopResults::new(1).unwrap();
        let shared = grow(&tree, tree.root());
        let kept = grow(&tree, shared);
        let lost_parent = grow(&tree, shared);
        let lost = grow(&tree, lost_parent);

        top.insert(&tree, kept, 9.0);
        top.insert(&tree, lost, 1.0);

        assert!(!tree.contains(lost));
        assert!(!tree.contains(lost_parent));
        assert!(tree.contains(shared));
        assert!(tree.contains(kept));
    }

    proptest! {
        #[test]
        fn prop_capacity_and_eviction(
            capacity in 1usize..6,
            scores in proptest::collection::vec(0u8..20, 1..40),
        ) {
            let tree = SimTree::new();
            let top = TopResults::new(capacity).unwrap();

            for score in scores {
                let score = f64::from(score);
                let before = top.entries();
                let node = grow(&tree, tree.root());
                let outcome = top.insert(&tree, node, score);
                let after = top.entries();

                prop_assert!(after.len() <= capacity);
                prop_assert!(after.windows(2).all(|w| w[0].score >= w[1].score));

                if before.len() == capacity {
                    let minimum = before[capacity - 1];
                    if score > minimum.score {
                        prop_assert_eq!(outcome.evicted, Some(minimum));
                    } else {
                        prop_assert_eq!(outcome.evicted, Some(ScoredNode { node, score }));
                        prop_assert_eq!(&after, &before);
                    }
                } else {
                    prop_assert_eq!(outcome.evicted, None);
                    prop_assert_eq!(after.len(), before.len() + 1);
                }
            }
        }
    }
}
