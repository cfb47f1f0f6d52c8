//! Events recorded by the auction engine.

use auction_types::{Address, Amount, RevealOutcome, Timestamp};
use serde::{Deserialize, Serialize};

/// Observable state changes, in the order they happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionEvent {
    BidCommitted {
        bidder: Address,
        index: u32,
        deposit: Amount,
        timestamp: Timestamp,
    },

    BidRevealed {
        bidder: Address,
        index: u32,
        outcome: RevealOutcome,
    },

    HighestBidIncreased { bidder: Address, amount: Amount },

    Withdrawn { account: Address, amount: Amount },

    AuctionEnded {
        winner: Option<Address>,
        amount: Amount,
    },
}
