//! Auction module error types.

use thiserror::Error;

use auction_types::{Phase, Timestamp};

use crate::ledger::LedgerError;

/// Errors that can occur in the auction module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Phase violation. Expected: {expected}, Got: {actual}")]
    PhaseViolation { expected: Phase, actual: Phase },

    #[error("Reveal arity mismatch: {expected} bids, got {values} values, {fakes} fake flags, {secrets} secrets")]
    ArityMismatch {
        expected: usize,
        values: usize,
        fakes: usize,
        secrets: usize,
    },

    #[error("Auction already ended")]
    AlreadyEnded,

    #[error("Too early: now {now}, reveal deadline {reveal_deadline}")]
    TooEarly {
        now: Timestamp,
        reveal_deadline: Timestamp,
    },

    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] LedgerError),

    #[error("Amount overflow")]
    Overflow,
}
