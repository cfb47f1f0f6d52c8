//! Core type definitions for commit-reveal blind auctions.
//!
//! This crate provides the shared data structures used across the auction system:
//! account and amount types, bid commitments, the auction timing configuration and
//! the per-bid reveal outcomes.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =========================
// PRIMITIVES
// =========================

/// Generic address type (32 bytes)
pub type Address = [u8; 32];

/// Amount of value in the smallest unit (wei-scale).
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// One ether expressed in wei.
pub const WEI_PER_ETHER: Amount = 1_000_000_000_000_000_000;

/// Errors produced when parsing hex-encoded identifiers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Expected at most {max} bytes, got {got}")]
    TooLong { max: usize, got: usize },

    #[error("Expected {expected} bytes, got {got}")]
    WrongLength { expected: usize, got: usize },
}

/// Parse a hex address, with or without `0x` prefix.
///
/// Shorter inputs are copied into the leading bytes and zero padded, so `0x01`
/// and `01000000...` name the same account.
pub fn parse_address(s: &str) -> Result<Address, ParseError> {
    let bytes = hex::decode(s.trim_start_matches("0x"))?;
    if bytes.len() > 32 {
        return Err(ParseError::TooLong {
            max: 32,
            got: bytes.len(),
        });
    }
    let mut addr = [0u8; 32];
    addr[..bytes.len()].copy_from_slice(&bytes);
    Ok(addr)
}

/// Hex-encode an address with a `0x` prefix.
pub fn format_address(addr: &Address) -> String {
    format!("0x{}", hex::encode(addr))
}

/// Opaque 32-byte digest binding a bidder to `(value, fake, secret)`.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Default, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({self})")
    }
}

impl FromStr for Commitment {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim_start_matches("0x"))?;
        let digest: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseError::WrongLength {
                expected: 32,
                got: bytes.len(),
            })?;
        Ok(Self(digest))
    }
}

// =========================
// AUCTION TYPES
// =========================

/// Auction phase, derived from the clock and the `ended` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum Phase {
    /// Accepting commitments
    Bidding,
    /// Accepting disclosures
    Reveal,
    /// Reveal window closed or settlement done
    Ended,
}

impl Phase {
    /// Compute the phase of an auction at time `now`.
    pub fn at(config: &AuctionConfig, now: Timestamp, ended: bool) -> Self {
        if ended || now >= config.reveal_deadline {
            Phase::Ended
        } else if now >= config.bidding_deadline {
            Phase::Reveal
        } else {
            Phase::Bidding
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Bidding => "bidding",
            Phase::Reveal => "reveal",
            Phase::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Immutable auction timing and payout configuration.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionConfig {
    pub beneficiary: Address,

    // Timing
    pub created_at: Timestamp,
    pub bidding_deadline: Timestamp,
    pub reveal_deadline: Timestamp,
}

impl AuctionConfig {
    /// Derive deadlines from a creation time and window durations.
    ///
    /// Returns `None` if the deadlines overflow.
    pub fn from_durations(
        beneficiary: Address,
        created_at: Timestamp,
        bidding_duration_secs: u64,
        reveal_duration_secs: u64,
    ) -> Option<Self> {
        let bidding_deadline = created_at.checked_add(bidding_duration_secs)?;
        let reveal_deadline = bidding_deadline.checked_add(reveal_duration_secs)?;
        Some(Self {
            beneficiary,
            created_at,
            bidding_deadline,
            reveal_deadline,
        })
    }
}

/// A committed bid, stored until it is revealed.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Bid {
    pub commitment: Commitment,
    pub deposit: Amount,
    /// Set once a matching reveal has settled this bid
    pub revealed: bool,
    pub committed_at: Timestamp,
}

/// Disclosed parameters for one committed bid.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct BidReveal {
    pub value: Amount,
    pub fake: bool,
    pub secret: Vec<u8>,
}

/// What a reveal did with one bid index.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum RevealOutcome {
    /// Digest did not match the commitment; deposit stays locked
    Invalid,
    /// Bid was settled by an earlier reveal
    AlreadyRevealed,
    /// Discloser marked the bid fake; whole deposit refunded
    FakeRefunded { refund: Amount },
    /// Disclosed value exceeds the deposit; whole deposit refunded
    UnderfundedRefunded { refund: Amount },
    /// Became the highest bid; excess deposit refunded
    PlacedWithExcessRefund { amount: Amount, refund: Amount },
    /// Did not beat the highest bid; whole deposit refunded
    NotHighRefunded { refund: Amount },
}

impl RevealOutcome {
    /// Amount credited to the bidder's pending returns.
    pub fn refund(&self) -> Amount {
        match self {
            RevealOutcome::Invalid | RevealOutcome::AlreadyRevealed => 0,
            RevealOutcome::FakeRefunded { refund }
            | RevealOutcome::UnderfundedRefunded { refund }
            | RevealOutcome::PlacedWithExcessRefund { refund, .. }
            | RevealOutcome::NotHighRefunded { refund } => *refund,
        }
    }

    /// Whether this index was settled by the reveal that produced it.
    pub fn settled(&self) -> bool {
        !matches!(self, RevealOutcome::Invalid | RevealOutcome::AlreadyRevealed)
    }
}

/// Result of one reveal call.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct RevealReceipt {
    /// Outcome per bid index, in bid order
    pub outcomes: Vec<RevealOutcome>,
    /// Total credited to the caller's pending returns by this reveal
    pub credited: Amount,
    /// Amount transferred back to the caller right away (pay-on-reveal only)
    pub paid_out: Amount,
}
