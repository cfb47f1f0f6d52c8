//! RPC-compatible types for the mock chain.
//!
//! These types are JSON-serializable versions of the core auction types.
//! Addresses and digests are 0x-prefixed hex, amounts are decimal wei strings.

use auction_module::{AuctionEvent, AuctionSummary, CallOutcome};
use auction_types::{format_address, Bid, Phase, RevealOutcome, Timestamp};
use serde::{Deserialize, Serialize};

/// Current chain time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTime {
    pub timestamp: Timestamp,
    pub phase: String,
}

impl ChainTime {
    pub fn new(timestamp: Timestamp, phase: Phase) -> Self {
        Self {
            timestamp,
            phase: phase.to_string(),
        }
    }
}

/// Parameters for submitting an auction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitCallParams {
    pub sender: String,
    /// Hex-encoded borsh `AuctionCall`
    pub call: String,
}

/// Auction summary for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionInfoRpc {
    pub beneficiary: String,
    pub created_at: Timestamp,
    pub bidding_deadline: Timestamp,
    pub reveal_deadline: Timestamp,
    pub phase: String,
    pub ended: bool,
    pub highest_bid: String,
    pub highest_bidder: Option<String>,
    pub num_bidders: usize,
    pub num_bids: usize,
    pub num_unrevealed: usize,
    /// Value held by the engine
    pub escrow: String,
    pub hasher: String,
    pub refund_policy: String,
}

impl AuctionInfoRpc {
    pub fn from_summary(
        summary: AuctionSummary,
        escrow: u128,
        hasher: String,
        refund_policy: String,
    ) -> Self {
        Self {
            beneficiary: format_address(&summary.beneficiary),
            created_at: summary.created_at,
            bidding_deadline: summary.bidding_deadline,
            reveal_deadline: summary.reveal_deadline,
            phase: summary.phase.to_string(),
            ended: summary.ended,
            highest_bid: summary.highest_bid.to_string(),
            highest_bidder: summary.highest_bidder.as_ref().map(format_address),
            num_bidders: summary.num_bidders,
            num_bids: summary.num_bids,
            num_unrevealed: summary.num_unrevealed,
            escrow: escrow.to_string(),
            hasher,
            refund_policy,
        }
    }
}

/// Committed bid for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidRpc {
    pub index: u32,
    pub commitment: String,
    pub deposit: String,
    pub revealed: bool,
    pub committed_at: Timestamp,
}

impl BidRpc {
    pub fn new(index: usize, bid: &Bid) -> Self {
        Self {
            index: index as u32,
            commitment: bid.commitment.to_string(),
            deposit: bid.deposit.to_string(),
            revealed: bid.revealed,
            committed_at: bid.committed_at,
        }
    }
}

/// Per-index reveal outcome for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealOutcomeRpc {
    /// "invalid", "already_revealed", "fake", "underfunded", "placed" or "not_high"
    pub kind: String,
    pub amount: Option<String>,
    pub refund: String,
}

impl From<&RevealOutcome> for RevealOutcomeRpc {
    fn from(outcome: &RevealOutcome) -> Self {
        let (kind, amount) = match outcome {
            RevealOutcome::Invalid => ("invalid", None),
            RevealOutcome::AlreadyRevealed => ("already_revealed", None),
            RevealOutcome::FakeRefunded { .. } => ("fake", None),
            RevealOutcome::UnderfundedRefunded { .. } => ("underfunded", None),
            RevealOutcome::PlacedWithExcessRefund { amount, .. } => {
                ("placed", Some(amount.to_string()))
            }
            RevealOutcome::NotHighRefunded { .. } => ("not_high", None),
        };
        Self {
            kind: kind.to_string(),
            amount,
            refund: outcome.refund().to_string(),
        }
    }
}

/// Result of a submitted call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallOutcomeRpc {
    BidPlaced {
        index: u32,
    },
    Revealed {
        outcomes: Vec<RevealOutcomeRpc>,
        credited: String,
        paid_out: String,
    },
    Withdrawn {
        amount: String,
    },
    Ended {
        amount: String,
    },
}

impl From<CallOutcome> for CallOutcomeRpc {
    fn from(outcome: CallOutcome) -> Self {
        match outcome {
            CallOutcome::BidPlaced { index } => CallOutcomeRpc::BidPlaced { index },
            CallOutcome::Revealed(receipt) => CallOutcomeRpc::Revealed {
                outcomes: receipt.outcomes.iter().map(RevealOutcomeRpc::from).collect(),
                credited: receipt.credited.to_string(),
                paid_out: receipt.paid_out.to_string(),
            },
            CallOutcome::Withdrawn { amount } => CallOutcomeRpc::Withdrawn {
                amount: amount.to_string(),
            },
            CallOutcome::Ended { amount } => CallOutcomeRpc::Ended {
                amount: amount.to_string(),
            },
        }
    }
}

/// Recorded auction event for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRpc {
    /// Position in the chain's event log
    pub seq: u64,
    pub kind: String,
    pub account: Option<String>,
    pub index: Option<u32>,
    pub amount: Option<String>,
}

impl EventRpc {
    pub fn new(seq: u64, event: &AuctionEvent) -> Self {
        let (kind, account, index, amount) = match event {
            AuctionEvent::BidCommitted {
                bidder,
                index,
                deposit,
                ..
            } => ("bid_committed", Some(*bidder), Some(*index), Some(*deposit)),
            AuctionEvent::BidRevealed {
                bidder,
                index,
                outcome,
            } => (
                "bid_revealed",
                Some(*bidder),
                Some(*index),
                Some(outcome.refund()),
            ),
            AuctionEvent::HighestBidIncreased { bidder, amount } => {
                ("highest_bid_increased", Some(*bidder), None, Some(*amount))
            }
            AuctionEvent::Withdrawn { account, amount } => {
                ("withdrawn", Some(*account), None, Some(*amount))
            }
            AuctionEvent::AuctionEnded { winner, amount } => {
                ("auction_ended", *winner, None, Some(*amount))
            }
        };
        Self {
            seq,
            kind: kind.to_string(),
            account: account.as_ref().map(format_address),
            index,
            amount: amount.map(|a| a.to_string()),
        }
    }
}
