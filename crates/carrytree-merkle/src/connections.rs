//! Level-order traversal and the parent/child connection index
//!
//! Both the text serializer and the proof walks need the same breadth-first
//! view of a tree: the root first, then each level left to right, children
//! enqueued left before right. The [`ConnectionIndex`] records every internal
//! node met on that traversal together with a reverse child → parent map, so
//! a proof walk can climb from any node to the root without searching.

use std::collections::{HashMap, VecDeque};

use crate::error::{Error, Result};
use crate::proof::SiblingPosition;
use crate::tree::{Node, Tree};

/// Breadth-first enumeration of `tree` as `(depth, node)` pairs
///
/// Nodes shared by identical subtrees (repeated leaf items) are visited once
/// per position, exactly as they appear in the structure.
pub fn level_order(tree: &Tree) -> Vec<(usize, &Node)> {
    let mut order = Vec::with_capacity(tree.len());
    let mut queue = VecDeque::from([(0usize, tree.root())]);

    while let Some((depth, node)) = queue.pop_front() {
        order.push((depth, node));
        if let Some((left, right)) = node.children() {
            queue.extend(tree.get(left).map(|n| (depth + 1, n)));
            queue.extend(tree.get(right).map(|n| (depth + 1, n)));
        }
    }

    order
}

/// One internal node and its ordered children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection<'t> {
    pub parent: &'t str,
    pub left: &'t str,
    pub right: &'t str,
}

/// Where a node sits under its parent, as seen from the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink<'t> {
    /// Key of the parent node
    pub parent: &'t str,
    /// Key of the other child
    pub sibling: &'t str,
    /// Side the sibling occupies in the parent's pairing
    pub position: SiblingPosition,
}

/// Read-only parent → (left, right) mapping derived from a [`Tree`]
///
/// Built fresh on every call; it borrows the tree it was derived from.
#[derive(Debug, Clone)]
pub struct ConnectionIndex<'t> {
    entries: Vec<Connection<'t>>,
    by_parent: HashMap<&'t str, usize>,
    by_child: HashMap<&'t str, Vec<usize>>,
}

impl<'t> ConnectionIndex<'t> {
    /// Derive the connection index of `tree` with one level-order traversal
    pub fn of(tree: &'t Tree) -> Self {
        let mut index = Self {
            entries: Vec::new(),
            by_parent: HashMap::new(),
            by_child: HashMap::new(),
        };

        for (_, node) in level_order(tree) {
            let Some((left, right)) = node.children() else {
                continue;
            };
            if index.by_parent.contains_key(node.key()) {
                continue;
            }

            let slot = index.entries.len();
            index.entries.push(Connection {
                parent: node.key(),
                left,
                right,
            });
            index.by_parent.insert(node.key(), slot);

            index.by_child.entry(left).or_default().push(slot);
            // A pair of identical children is still a single entry
            if right != left {
                index.by_child.entry(right).or_default().push(slot);
            }
        }

        index
    }

    /// Connections in traversal order
    pub fn entries(&self) -> &[Connection<'t>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Children of `parent`, if it is an internal node reachable from the root
    pub fn children_of(&self, parent: &str) -> Option<(&'t str, &'t str)> {
        self.by_parent.get(parent).map(|&slot| {
            let entry = &self.entries[slot];
            (entry.left, entry.right)
        })
    }

    /// The unique parent entry listing `child`
    ///
    /// # Errors
    /// * [`Error::InvariantViolation`] if no entry, or more than one entry,
    ///   lists `child` as a child
    pub fn parent_of(&self, child: &str) -> Result<ParentLink<'t>> {
        let slots = self.by_child.get(child).map(Vec::as_slice).unwrap_or(&[]);
        let slot = match slots {
            [slot] => *slot,
            [] => {
                return Err(Error::InvariantViolation(format!(
                    "no parent connection lists node {}",
                    child
                )))
            }
            _ => {
                return Err(Error::InvariantViolation(format!(
                    "{} parent connections list node {}",
                    slots.len(),
                    child
                )))
            }
        };

        let entry = &self.entries[slot];
        let link = if entry.left == child {
            ParentLink {
                parent: entry.parent,
                sibling: entry.right,
                position: SiblingPosition::Right,
            }
        } else {
            ParentLink {
                parent: entry.parent,
                sibling: entry.left,
                position: SiblingPosition::Left,
            }
        };

        Ok(link)
    }
}

impl Tree {
    /// Derive this tree's [`ConnectionIndex`]
    pub fn connections(&self) -> ConnectionIndex<'_> {
        ConnectionIndex::of(self)
    }
}
