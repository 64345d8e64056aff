//! Carry-forward Merkle trees with inclusion and consistency proofs
//!
//! This crate builds a SHA-256 hash tree over an ordered list of items,
//! persists it in a level-order text layout, and derives inclusion and
//! consistency proofs in the spirit of RFC 9162.
//!
//! Unlike RFC 6962 trees, an odd node at any level is carried unchanged to
//! the next level rather than duplicated, and an internal node's key is the
//! text concatenation of its children's hex hashes.
//!
//! # Example
//!
//! ```
//! use carrytree_merkle::{verify_inclusion, Tree};
//!
//! let tree = Tree::build(&["a", "b", "c", "d"]).unwrap();
//! let proof = tree.inclusion_proof("c").unwrap();
//! assert!(proof.found);
//! verify_inclusion("c", &proof.path, tree.root().hash()).unwrap();
//! ```

pub mod connections;
pub mod error;
pub mod hash;
pub mod proof;
pub mod serialize;
pub mod tree;

pub use connections::{level_order, Connection, ConnectionIndex, ParentLink};
pub use error::{Error, Result};
pub use hash::{hash_bytes, hash_concat, hash_str, is_hex_digest, HASH_SIZE, HEX_HASH_LEN};
pub use proof::{
    consistency_proof, is_ordered_prefix, root_from_path, verify_consistency, verify_inclusion,
    verify_node_inclusion, ConsistencyProof, InclusionProof, ProofStep, SiblingPosition,
};
pub use serialize::{
    load, load_all, save, save_all, trees_from_text, trees_to_text, COMMENT_MARKER,
    TREE_SEPARATOR,
};
pub use tree::{Node, Tree};
