//! Merkle tree hashing utilities
//!
//! Every node hash is the lowercase hex SHA-256 of the node's key, read as
//! UTF-8 bytes. There is no domain separation prefix: an internal node's key
//! is the text `left_hash ++ right_hash`, and its hash is the digest of that
//! text.

use sha2::{Digest, Sha256};

/// Digest size in bytes (SHA-256)
pub const HASH_SIZE: usize = 32;

/// Length of a hex-encoded digest
pub const HEX_HASH_LEN: usize = HASH_SIZE * 2;

/// Hash raw bytes, returning the lowercase hex digest
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Hash a string's UTF-8 bytes
pub fn hash_str(data: &str) -> String {
    hash_bytes(data.as_bytes())
}

/// Combine two child hashes into the parent's key and hash
///
/// Returns `(left ++ right, H(left ++ right))`.
pub fn hash_concat(left: &str, right: &str) -> (String, String) {
    let mut key = String::with_capacity(left.len() + right.len());
    key.push_str(left);
    key.push_str(right);
    let hash = hash_str(&key);
    (key, hash)
}

/// Check that `s` has the shape of a hex SHA-256 digest
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == HEX_HASH_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}
