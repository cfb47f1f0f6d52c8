//! State structures for the auction module.

use auction_types::{Address, Amount, AuctionConfig, Bid, Phase, Timestamp};
use std::collections::HashMap;

use crate::error::AuctionError;
use crate::events::AuctionEvent;

/// Auction module state.
///
/// A single auction record. All mutation goes through the handlers.
#[derive(Debug, Clone)]
pub struct AuctionState {
    /// Deadlines and beneficiary, fixed at creation
    pub config: AuctionConfig,

    /// Set once the winning amount has been paid out
    pub ended: bool,

    /// Current highest placed amount
    pub highest_bid: Amount,

    /// Holder of the highest bid, absent until a reveal places one
    pub highest_bidder: Option<Address>,

    /// Refunds credited but not yet withdrawn
    pub pending_returns: HashMap<Address, Amount>,

    /// Committed bids per account, in submission order
    pub bids: HashMap<Address, Vec<Bid>>,

    /// Accounts in order of their first bid
    pub bidders: Vec<Address>,

    /// Event log, drained by the host
    pub events: Vec<AuctionEvent>,
}

impl AuctionState {
    /// Create a new auction state.
    pub fn new(config: AuctionConfig) -> Self {
        Self {
            config,
            ended: false,
            highest_bid: 0,
            highest_bidder: None,
            pending_returns: HashMap::new(),
            bids: HashMap::new(),
            bidders: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Phase at time `now`.
    pub fn phase(&self, now: Timestamp) -> Phase {
        Phase::at(&self.config, now, self.ended)
    }

    /// Get an account's bids.
    pub fn get_bids(&self, bidder: &Address) -> &[Bid] {
        self.bids.get(bidder).map(Vec::as_slice).unwrap_or_default()
    }

    /// Append a bid and return its index.
    pub fn push_bid(&mut self, bidder: Address, bid: Bid) -> usize {
        let bids = self.bids.entry(bidder).or_default();
        if bids.is_empty() {
            self.bidders.push(bidder);
        }
        bids.push(bid);
        bids.len() - 1
    }

    /// Get an account's pending return.
    pub fn get_pending_return(&self, address: &Address) -> Amount {
        self.pending_returns.get(address).copied().unwrap_or(0)
    }

    /// Add to an account's pending return.
    pub fn add_pending_return(&mut self, address: Address, amount: Amount) -> Result<(), AuctionError> {
        let balance = self.pending_returns.entry(address).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(AuctionError::Overflow)?;
        Ok(())
    }

    /// Remove and return an account's pending return.
    pub fn take_pending_return(&mut self, address: &Address) -> Amount {
        self.pending_returns.remove(address).unwrap_or(0)
    }

    /// Put back a pending return taken for a transfer that failed.
    pub fn restore_pending_return(&mut self, address: Address, amount: Amount) {
        self.pending_returns.insert(address, amount);
    }

    /// Sum of all pending returns.
    pub fn total_pending_returns(&self) -> Amount {
        self.pending_returns.values().sum()
    }

    /// Deposits of bids not yet settled by a matching reveal.
    pub fn unrevealed_deposits(&self) -> Amount {
        self.bids
            .values()
            .flatten()
            .filter(|bid| !bid.revealed)
            .map(|bid| bid.deposit)
            .sum()
    }

    /// Value the engine must be holding right now.
    ///
    /// Equals the escrow balance whenever no value was created or destroyed.
    pub fn expected_escrow(&self) -> Amount {
        let unpaid_high = if self.ended { 0 } else { self.highest_bid };
        unpaid_high + self.total_pending_returns() + self.unrevealed_deposits()
    }

    pub fn record(&mut self, event: AuctionEvent) {
        tracing::debug!(?event, "auction event");
        self.events.push(event);
    }
}
