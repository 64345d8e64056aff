//! Tree construction
//!
//! Trees are built bottom-up from an ordered list of leaf items. At each
//! level keys are paired two at a time in order; when a level has an odd
//! number of keys the last one is carried unchanged into the next level
//! instead of being duplicated. A node can be carried across several levels
//! before it is finally paired.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::hash::{hash_concat, hash_str};

/// A single node of a [`Tree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    key: String,
    hash: String,
    children: Option<(String, String)>,
}

impl Node {
    /// Create a leaf node, hashing its key
    pub fn leaf(key: impl Into<String>) -> Self {
        let key = key.into();
        let hash = hash_str(&key);
        Self {
            key,
            hash,
            children: None,
        }
    }

    /// Create a node from already known parts
    ///
    /// The hash is taken as given and not recomputed.
    pub(crate) fn from_parts(
        key: String,
        hash: String,
        children: Option<(String, String)>,
    ) -> Self {
        Self {
            key,
            hash,
            children,
        }
    }

    /// The node's key: the leaf item, or `left_hash ++ right_hash`
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Hex SHA-256 of the key
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn left(&self) -> Option<&str> {
        self.children.as_ref().map(|(left, _)| left.as_str())
    }

    pub fn right(&self) -> Option<&str> {
        self.children.as_ref().map(|(_, right)| right.as_str())
    }

    /// Both child keys, if this is an internal node
    pub fn children(&self) -> Option<(&str, &str)> {
        self.children
            .as_ref()
            .map(|(left, right)| (left.as_str(), right.as_str()))
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Check if a key can be written to the level-order text layout
    pub(crate) fn is_representable_key(key: &str) -> bool {
        !key.contains(|c: char| c.is_whitespace() || c == ',')
    }
}

/// An immutable Merkle tree
///
/// Holds every node keyed by its `key`, plus the root key. A tree is built
/// once (by [`Tree::build`] or by parsing its text form) and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    nodes: HashMap<String, Node>,
    root: String,
}

impl Tree {
    /// Build a tree from an ordered, non-empty list of leaf items
    ///
    /// # Errors
    /// * [`Error::InvalidInput`] if `leaves` is empty
    ///
    /// # Example
    ///
    /// ```
    /// use carrytree_merkle::{hash_str, Tree};
    ///
    /// let tree = Tree::build(&["a", "b", "c"]).unwrap();
    /// let ab = hash_str(&(hash_str("a") + &hash_str("b")));
    /// assert_eq!(tree.root().hash(), hash_str(&(ab + &hash_str("c"))));
    /// ```
    pub fn build<S: AsRef<str>>(leaves: &[S]) -> Result<Self> {
        if leaves.is_empty() {
            return Err(Error::InvalidInput(
                "cannot build a tree from an empty leaf list".to_string(),
            ));
        }

        let mut nodes: HashMap<String, Node> = HashMap::with_capacity(leaves.len() * 2);
        let mut level: Vec<String> = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            let node = Node::leaf(leaf.as_ref());
            level.push(node.key.clone());
            nodes.insert(node.key.clone(), node);
        }

        let mut height = 0usize;
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut pairs = level.chunks_exact(2);

            for pair in &mut pairs {
                let (left, right) = (&pair[0], &pair[1]);
                let (key, hash) = hash_concat(&nodes[left].hash, &nodes[right].hash);
                let parent = Node::from_parts(
                    key.clone(),
                    hash,
                    Some((left.clone(), right.clone())),
                );
                nodes.insert(key.clone(), parent);
                next.push(key);
            }

            // Odd node out moves up as-is
            if let [carried] = pairs.remainder() {
                next.push(carried.clone());
            }

            level = next;
            height += 1;
        }

        let root = level.swap_remove(0);
        tracing::debug!(
            leaves = leaves.len(),
            height,
            root = %nodes[&root].hash,
            "built merkle tree"
        );

        Ok(Self { nodes, root })
    }

    /// Assemble a tree from parsed nodes; the caller has validated them
    pub(crate) fn from_parts(nodes: HashMap<String, Node>, root: String) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> &Node {
        &self.nodes[&self.root]
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of distinct nodes in the mapping
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over the node mapping in arbitrary order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Leaf keys in left-to-right order
    ///
    /// Repeated items appear once per position, so for a built tree this
    /// returns the original leaf list.
    pub fn leaf_keys(&self) -> Vec<&str> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root()];

        while let Some(node) = stack.pop() {
            match node.children() {
                Some((left, right)) => {
                    // Right first so the left subtree is visited first
                    stack.extend(self.get(right));
                    stack.extend(self.get(left));
                }
                None => leaves.push(node.key()),
            }
        }

        leaves
    }
}
