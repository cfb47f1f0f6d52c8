//! Error types for commitment hashing.

use thiserror::Error;

/// Errors that can occur when configuring commitment hashing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Unknown hasher: {0} (expected keccak256-abi or sha256)")]
    UnknownHasher(String),
}
