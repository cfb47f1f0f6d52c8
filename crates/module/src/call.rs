//! Call message types for the auction module.

use auction_types::{Amount, Commitment, RevealReceipt};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Call messages for the auction module.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum AuctionCall {
    /// Commit to a bid, escrowing `deposit`.
    Bid {
        commitment: Commitment,
        deposit: Amount,
    },

    /// Disclose all of the sender's bids, in bid order.
    Reveal {
        values: Vec<Amount>,
        fakes: Vec<bool>,
        secrets: Vec<Vec<u8>>,
    },

    /// Withdraw the sender's pending returns.
    Withdraw,

    /// Pay the highest bid to the beneficiary (anyone, after the reveal window).
    AuctionEnd,
}

impl AuctionCall {
    /// Decode a call from its borsh encoding.
    pub fn decode(bytes: &[u8]) -> std::io::Result<Self> {
        borsh::from_slice(bytes)
    }

    /// Borsh encoding of this call.
    pub fn encode(&self) -> std::io::Result<Vec<u8>> {
        borsh::to_vec(self)
    }
}

/// What a dispatched call produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    BidPlaced { index: u32 },
    Revealed(RevealReceipt),
    Withdrawn { amount: Amount },
    Ended { amount: Amount },
}
