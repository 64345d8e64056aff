//! Error types for carrytree-merkle

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in Merkle tree operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any work was done
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reading or writing a tree file failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialized tree text is malformed
    #[error("Parse error in {origin} at line {line}: {reason}")]
    Parse {
        origin: String,
        line: usize,
        reason: String,
    },

    /// The tree structure is corrupted (missing or ambiguous parent, cycle)
    #[error("Tree invariant violated: {0}")]
    InvariantViolation(String),

    /// Proof verification failed
    #[error("Proof verification failed: {0}")]
    VerificationFailed(String),

    /// Hash mismatch
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for Merkle tree operations
pub type Result<T> = std::result::Result<T, Error>;
