//! Commitment hashing for commit-reveal blind auctions.
//!
//! Bidders publish `commit(value, fake, secret)` while bidding is open and
//! disclose the preimage once it closes. Two schemes are provided:
//!
//! 1. **Keccak-256 over the Solidity ABI encoding**: byte compatible with
//!    `keccak256(abi.encode(value, fake, secret))` as built by Ethereum tooling.
//!
//! 2. **Domain-separated SHA-256**: a compact native encoding for deployments
//!    that do not need Ethereum compatibility.

pub mod abi;
pub mod error;
pub mod hasher;

pub use abi::encode_commitment_preimage;
pub use error::CryptoError;
pub use hasher::{
    generate_secret, AnyHasher, CommitmentHasher, HasherKind, Keccak256AbiHasher, Sha256Hasher,
};
