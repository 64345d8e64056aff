//! Merkle proof generation and verification
//!
//! Inclusion proofs climb from a node to the root collecting sibling hashes
//! (cf. RFC 9162 section 2.1.3). Consistency proofs reuse that walk inside
//! the newer tree (cf. RFC 9162 section 2.1.4).
//!
//! Each proof entry records which side its sibling occupied. The bare hash
//! list is available through `hashes()`; verification needs the sides
//! because the carry-forward pairing makes them impossible to derive from a
//! leaf index alone.

use crate::connections::ConnectionIndex;
use crate::error::{Error, Result};
use crate::hash::{hash_concat, hash_str};
use crate::tree::Tree;

/// Position of a sibling relative to the node being proved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingPosition {
    /// Sibling is the left operand: parent = H(sibling ++ current)
    Left,
    /// Sibling is the right operand: parent = H(current ++ sibling)
    Right,
}

/// One step of a proof path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofStep {
    /// Hex hash of the sibling node
    pub hash: String,
    pub position: SiblingPosition,
}

/// Inclusion proof for one key of a tree
///
/// `found` is false when the key is not in the tree. An empty path with
/// `found == true` means the key is the root itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionProof {
    pub found: bool,
    pub path: Vec<ProofStep>,
}

impl InclusionProof {
    fn not_found() -> Self {
        Self {
            found: false,
            path: Vec::new(),
        }
    }

    /// Sibling hashes from the queried node up to the root
    pub fn hashes(&self) -> Vec<&str> {
        self.path.iter().map(|step| step.hash.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

/// Consistency proof between an older and a newer tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyProof {
    /// Hash of the older root's right child, present when the older root is
    /// not itself a node of the newer tree
    pub seed: Option<String>,
    /// Hash of the older root's left child, set together with `seed`
    ///
    /// Not part of [`ConsistencyProof::hashes`]; it lets a verifier rebuild
    /// the older root from `older_left ++ seed`.
    pub older_left: Option<String>,
    /// Inclusion path, inside the newer tree, of the older root (no seed) or
    /// of the older root's right child (with seed)
    pub path: Vec<ProofStep>,
}

impl ConsistencyProof {
    /// Flat hash list: the seed (if any) followed by the path hashes
    pub fn hashes(&self) -> Vec<&str> {
        self.seed
            .iter()
            .map(String::as_str)
            .chain(self.path.iter().map(|step| step.hash.as_str()))
            .collect()
    }
}

impl Tree {
    /// Compute the inclusion proof of `key`
    ///
    /// A missing key is a normal outcome and yields `found == false`.
    ///
    /// # Errors
    /// * [`Error::InvariantViolation`] if a node on the way up has no parent
    ///   or more than one parent
    pub fn inclusion_proof(&self, key: &str) -> Result<InclusionProof> {
        if !self.contains(key) {
            tracing::debug!(key, "inclusion lookup: key not in tree");
            return Ok(InclusionProof::not_found());
        }

        let index = self.connections();
        let path = walk_to_root(self, &index, key)?;
        tracing::debug!(key, steps = path.len(), "computed inclusion proof");

        Ok(InclusionProof { found: true, path })
    }

    /// Compute the consistency proof from `self` (older) to `newer`
    ///
    /// See [`consistency_proof`].
    pub fn consistency_proof(&self, newer: &Tree) -> Result<ConsistencyProof> {
        consistency_proof(self, newer)
    }
}

/// Climb from `start` to the root, collecting sibling hashes
fn walk_to_root(
    tree: &Tree,
    index: &ConnectionIndex<'_>,
    start: &str,
) -> Result<Vec<ProofStep>> {
    let root = tree.root().key();
    let mut query = start;
    let mut path = Vec::new();

    while query != root {
        let link = index.parent_of(query)?;
        let sibling = tree.get(link.sibling).ok_or_else(|| {
            Error::InvariantViolation(format!("sibling {} is not in the tree", link.sibling))
        })?;

        path.push(ProofStep {
            hash: sibling.hash().to_string(),
            position: link.position,
        });
        query = link.parent;
    }

    Ok(path)
}

/// Compute the consistency proof between `older` and `newer`
///
/// The caller must already know that `older`'s leaf sequence is a prefix of
/// `newer`'s (see [`is_ordered_prefix`]).
///
/// If the older root is also a node of the newer tree, the proof is that
/// node's inclusion path. Otherwise the older root was built around a
/// carried node and the proof is the hash of its right child followed by the
/// right child's inclusion path in the newer tree.
///
/// # Errors
/// * [`Error::InvariantViolation`] if the node to prove cannot be located in
///   `newer`, which means the prefix precondition does not hold
pub fn consistency_proof(older: &Tree, newer: &Tree) -> Result<ConsistencyProof> {
    let old_root = older.root();

    if newer.contains(old_root.key()) {
        let proof = newer.inclusion_proof(old_root.key())?;
        return Ok(ConsistencyProof {
            seed: None,
            older_left: None,
            path: proof.path,
        });
    }

    let (left_key, right_key) = old_root.children().ok_or_else(|| {
        Error::InvariantViolation(format!(
            "older root {} is not in the newer tree and has no children",
            old_root.hash()
        ))
    })?;
    let left = older.get(left_key).ok_or_else(|| {
        Error::InvariantViolation(format!("older root's left child {} is missing", left_key))
    })?;
    let right = older.get(right_key).ok_or_else(|| {
        Error::InvariantViolation(format!("older root's right child {} is missing", right_key))
    })?;

    let proof = newer.inclusion_proof(right_key)?;
    if !proof.found {
        return Err(Error::InvariantViolation(format!(
            "older root's right child {} is not in the newer tree",
            right_key
        )));
    }

    tracing::debug!(
        seed = right.hash(),
        steps = proof.len(),
        "consistency proof seeded from older root's right child"
    );

    Ok(ConsistencyProof {
        seed: Some(right.hash().to_string()),
        older_left: Some(left.hash().to_string()),
        path: proof.path,
    })
}

/// Check whether two ordered sequences agree up to the shorter length
pub fn is_ordered_prefix<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.as_ref() == y.as_ref())
}

/// Fold a proof path onto a starting hash, returning the implied root hash
pub fn root_from_path(start_hash: &str, path: &[ProofStep]) -> String {
    path.iter().fold(start_hash.to_string(), |current, step| {
        let (_, parent) = match step.position {
            SiblingPosition::Left => hash_concat(&step.hash, &current),
            SiblingPosition::Right => hash_concat(&current, &step.hash),
        };
        parent
    })
}

/// Verify an inclusion proof for a leaf item
///
/// # Arguments
/// * `leaf_key` - The leaf item (its hash is computed here)
/// * `path` - The proof path, as produced by [`Tree::inclusion_proof`]
/// * `expected_root` - The expected root hash
pub fn verify_inclusion(leaf_key: &str, path: &[ProofStep], expected_root: &str) -> Result<()> {
    verify_node_inclusion(&hash_str(leaf_key), path, expected_root)
}

/// Verify an inclusion proof starting from a node hash
pub fn verify_node_inclusion(
    node_hash: &str,
    path: &[ProofStep],
    expected_root: &str,
) -> Result<()> {
    let actual = root_from_path(node_hash, path);
    if actual != expected_root {
        return Err(Error::HashMismatch {
            expected: expected_root.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Verify a consistency proof against both root hashes
///
/// Without a seed, the older root hash itself must climb to the newer root.
/// With a seed, `older_left ++ seed` must hash to the older root and the
/// seed must climb to the newer root.
pub fn verify_consistency(old_root: &str, proof: &ConsistencyProof, new_root: &str) -> Result<()> {
    let start = match (proof.seed.as_deref(), proof.older_left.as_deref()) {
        (None, _) => old_root,
        (Some(seed), Some(left)) => {
            let (_, rebuilt) = hash_concat(left, seed);
            if rebuilt != old_root {
                return Err(Error::VerificationFailed(format!(
                    "old root mismatch: expected {}, got {}",
                    old_root, rebuilt
                )));
            }
            seed
        }
        (Some(_), None) => {
            return Err(Error::VerificationFailed(
                "seeded proof lacks the older root's left child hash".to_string(),
            ))
        }
    };
    let actual = root_from_path(start, &proof.path);
    if actual != new_root {
        return Err(Error::VerificationFailed(format!(
            "new root mismatch: expected {}, got {}",
            new_root, actual
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_from_path_orientation() {
        let a = hash_str("a");
        let b = hash_str("b");
        let expected = hash_str(&format!("{}{}", a, b));

        let from_left = [ProofStep {
            hash: b.clone(),
            position: SiblingPosition::Right,
        }];
        assert_eq!(root_from_path(&a, &from_left), expected);

        let from_right = [ProofStep {
            hash: a.clone(),
            position: SiblingPosition::Left,
        }];
        assert_eq!(root_from_path(&b, &from_right), expected);
    }

    #[test]
    fn test_root_from_empty_path() {
        let a = hash_str("a");
        assert_eq!(root_from_path(&a, &[]), a);
    }

    #[test]
    fn test_inclusion_proof_root_of_single_leaf() {
        let tree = Tree::build(&["x"]).unwrap();
        let proof = tree.inclusion_proof("x").unwrap();
        assert!(proof.found);
        assert!(proof.is_empty());
    }

    #[test]
    fn test_verify_inclusion_wrong_root() {
        let tree = Tree::build(&["a", "b"]).unwrap();
        let proof = tree.inclusion_proof("a").unwrap();
        let result = verify_inclusion("a", &proof.path, &hash_str("not the root"));
        assert!(matches!(result, Err(Error::HashMismatch { .. })));
    }

    #[test]
    fn test_consistency_hashes_flatten_seed_first() {
        let proof = ConsistencyProof {
            seed: Some("s".to_string()),
            older_left: Some("l".to_string()),
            path: vec![ProofStep {
                hash: "p".to_string(),
                position: SiblingPosition::Left,
            }],
        };
        assert_eq!(proof.hashes(), vec!["s", "p"]);
    }

    #[test]
    fn test_verify_consistency_requires_older_left() {
        let old = Tree::build(&["a", "b", "c"]).unwrap();
        let new = Tree::build(&["a", "b", "c", "d"]).unwrap();
        let mut proof = consistency_proof(&old, &new).unwrap();
        verify_consistency(old.root().hash(), &proof, new.root().hash()).unwrap();

        proof.older_left = None;
        let result = verify_consistency(old.root().hash(), &proof, new.root().hash());
        assert!(matches!(result, Err(Error::VerificationFailed(_))));
    }

    #[test]
    fn test_is_ordered_prefix() {
        assert!(is_ordered_prefix(&["a", "b"], &["a", "b", "c"]));
        assert!(is_ordered_prefix(&["a", "b", "c"], &["a", "b"]));
        assert!(!is_ordered_prefix(&["a", "x"], &["a", "b", "c"]));
        let empty: [&str; 0] = [];
        assert!(is_ordered_prefix(&empty, &["a"]));
    }
}
