//! Query handlers for the auction module.
//!
//! These functions provide read-only access to auction state.

use crate::state::AuctionState;
use auction_types::{Address, Amount, Bid, Phase, Timestamp};
use serde::{Deserialize, Serialize};

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Get the auction summary.
    GetAuction,

    /// Get the current highest bid and bidder.
    GetHighestBid,

    /// Get an account's bids.
    GetBids { bidder: Address },

    /// Get an account's pending return.
    GetPendingReturn { address: Address },

    /// Get the current phase.
    GetPhase,
}

/// Query response types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    /// Auction summary.
    Auction(AuctionSummary),

    /// Highest bid so far.
    HighestBid {
        bidder: Option<Address>,
        amount: Amount,
    },

    /// Bids of one account.
    Bids(Vec<Bid>),

    /// Pending return balance.
    PendingReturn(Amount),

    /// Current phase.
    Phase(Phase),
}

/// Handle a query at time `now`.
pub fn handle_query(state: &AuctionState, now: Timestamp, query: AuctionQuery) -> AuctionQueryResponse {
    match query {
        AuctionQuery::GetAuction => {
            AuctionQueryResponse::Auction(AuctionSummary::from_state(state, now))
        }

        AuctionQuery::GetHighestBid => AuctionQueryResponse::HighestBid {
            bidder: state.highest_bidder,
            amount: state.highest_bid,
        },

        AuctionQuery::GetBids { bidder } => {
            AuctionQueryResponse::Bids(state.get_bids(&bidder).to_vec())
        }

        AuctionQuery::GetPendingReturn { address } => {
            AuctionQueryResponse::PendingReturn(state.get_pending_return(&address))
        }

        AuctionQuery::GetPhase => AuctionQueryResponse::Phase(state.phase(now)),
    }
}

/// Summary of the auction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSummary {
    pub beneficiary: Address,
    pub created_at: Timestamp,
    pub bidding_deadline: Timestamp,
    pub reveal_deadline: Timestamp,
    pub phase: Phase,
    pub ended: bool,
    pub highest_bid: Amount,
    pub highest_bidder: Option<Address>,
    pub num_bidders: usize,
    pub num_bids: usize,
    pub num_unrevealed: usize,
}

impl AuctionSummary {
    /// Create summary from auction state.
    pub fn from_state(state: &AuctionState, now: Timestamp) -> Self {
        let all_bids = || state.bids.values().flatten();
        Self {
            beneficiary: state.config.beneficiary,
            created_at: state.config.created_at,
            bidding_deadline: state.config.bidding_deadline,
            reveal_deadline: state.config.reveal_deadline,
            phase: state.phase(now),
            ended: state.ended,
            highest_bid: state.highest_bid,
            highest_bidder: state.highest_bidder,
            num_bidders: state.bidders.len(),
            num_bids: all_bids().count(),
            num_unrevealed: all_bids().filter(|bid| !bid.revealed).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::{AuctionConfig, Commitment};

    fn new_state() -> AuctionState {
        AuctionState::new(AuctionConfig::from_durations([9u8; 32], 100, 60, 60).unwrap())
    }

    #[test]
    fn test_get_pending_return_query() {
        let mut state = new_state();
        let addr = [1u8; 32];
        state.add_pending_return(addr, 100).unwrap();

        let response = handle_query(&state, 100, AuctionQuery::GetPendingReturn { address: addr });
        assert_eq!(response, AuctionQueryResponse::PendingReturn(100));
    }

    #[test]
    fn test_get_highest_bid_none() {
        let state = new_state();
        let response = handle_query(&state, 100, AuctionQuery::GetHighestBid);
        assert_eq!(
            response,
            AuctionQueryResponse::HighestBid {
                bidder: None,
                amount: 0
            }
        );
    }

    #[test]
    fn test_get_phase_follows_clock() {
        let state = new_state();
        assert_eq!(
            handle_query(&state, 159, AuctionQuery::GetPhase),
            AuctionQueryResponse::Phase(Phase::Bidding)
        );
        assert_eq!(
            handle_query(&state, 160, AuctionQuery::GetPhase),
            AuctionQueryResponse::Phase(Phase::Reveal)
        );
    }

    #[test]
    fn test_summary_counts() {
        let mut state = new_state();
        let bid = Bid {
            commitment: Commitment([1u8; 32]),
            deposit: 5,
            revealed: false,
            committed_at: 100,
        };
        state.push_bid([1u8; 32], bid.clone());
        state.push_bid([1u8; 32], Bid { revealed: true, ..bid.clone() });
        state.push_bid([2u8; 32], bid);

        let summary = AuctionSummary::from_state(&state, 170);
        assert_eq!(summary.phase, Phase::Reveal);
        assert_eq!(summary.num_bidders, 2);
        assert_eq!(summary.num_bids, 3);
        assert_eq!(summary.num_unrevealed, 2);
        assert_eq!(summary.reveal_deadline, 220);
    }
}
