//! The auction engine: one auction plus its collaborators.
//!
//! The engine reads the clock on every call, builds a [`CallContext`] and runs
//! the matching handler. Operations take `&mut self`, so a host sharing the
//! engine between callers wraps it in a single lock.

use auction_crypto::CommitmentHasher;
use auction_types::{Address, Amount, Commitment, Phase, RevealReceipt};
use tracing::{info, warn};

use crate::call::{AuctionCall, CallOutcome};
use crate::clock::Clock;
use crate::events::AuctionEvent;
use crate::genesis::{AuctionGenesisConfig, GenesisValidationError, RefundPolicy};
use crate::handlers::{
    handle_auction_end, handle_bid, handle_reveal, handle_withdraw, CallContext, HandlerResult,
};
use crate::ledger::Ledger;
use crate::queries::{handle_query, AuctionQuery, AuctionQueryResponse};
use crate::state::AuctionState;

/// A single blind auction.
pub struct AuctionEngine<C, L, H> {
    state: AuctionState,
    refund_policy: RefundPolicy,
    clock: C,
    ledger: L,
    hasher: H,
}

impl<C: Clock, L: Ledger, H: CommitmentHasher> AuctionEngine<C, L, H> {
    /// Create an auction starting now.
    pub fn new(
        config: &AuctionGenesisConfig,
        clock: C,
        ledger: L,
        hasher: H,
    ) -> Result<Self, GenesisValidationError> {
        let auction = config.deadlines(clock.now())?;
        info!(
            bidding_deadline = auction.bidding_deadline,
            reveal_deadline = auction.reveal_deadline,
            refund_policy = ?config.refund_policy,
            "Auction created"
        );
        Ok(Self {
            state: AuctionState::new(auction),
            refund_policy: config.refund_policy,
            clock,
            ledger,
            hasher,
        })
    }

    fn context(&self, sender: Address, value: Amount) -> CallContext {
        CallContext {
            sender,
            timestamp: self.clock.now(),
            value,
        }
    }

    /// Commit to a bid, escrowing `deposit`. Returns the bid index.
    pub fn bid(
        &mut self,
        sender: Address,
        commitment: Commitment,
        deposit: Amount,
    ) -> HandlerResult<usize> {
        let ctx = self.context(sender, deposit);
        let index = handle_bid(&mut self.state, &ctx, &mut self.ledger, commitment)?;
        info!(bidder = %hex_addr(&sender), index, deposit, "Bid committed");
        Ok(index)
    }

    /// Disclose all of `sender`'s bids.
    pub fn reveal(
        &mut self,
        sender: Address,
        values: &[Amount],
        fakes: &[bool],
        secrets: &[Vec<u8>],
    ) -> HandlerResult<RevealReceipt> {
        let ctx = self.context(sender, 0);
        let mut receipt = handle_reveal(&mut self.state, &ctx, &self.hasher, values, fakes, secrets)?;
        info!(
            bidder = %hex_addr(&sender),
            bids = receipt.outcomes.len(),
            credited = receipt.credited,
            "Bids revealed"
        );

        if self.refund_policy == RefundPolicy::PayOnReveal {
            match handle_withdraw(&mut self.state, &ctx, &mut self.ledger) {
                Ok(amount) => receipt.paid_out = amount,
                Err(err) => {
                    warn!(bidder = %hex_addr(&sender), %err, "Refund kept as pending return");
                }
            }
        }
        Ok(receipt)
    }

    /// Withdraw `sender`'s pending returns. Returns the amount transferred.
    pub fn withdraw(&mut self, sender: Address) -> HandlerResult<Amount> {
        let ctx = self.context(sender, 0);
        match handle_withdraw(&mut self.state, &ctx, &mut self.ledger) {
            Ok(amount) => {
                if amount > 0 {
                    info!(account = %hex_addr(&sender), amount, "Pending return withdrawn");
                }
                Ok(amount)
            }
            Err(err) => {
                warn!(account = %hex_addr(&sender), %err, "Withdrawal failed, credit restored");
                Err(err)
            }
        }
    }

    /// Pay the highest bid to the beneficiary. Anyone may call this.
    pub fn auction_end(&mut self, sender: Address) -> HandlerResult<Amount> {
        let ctx = self.context(sender, 0);
        let amount = handle_auction_end(&mut self.state, &ctx, &mut self.ledger)?;
        info!(
            winner = ?self.state.highest_bidder.map(|w| hex_addr(&w)),
            amount,
            "Auction ended"
        );
        Ok(amount)
    }

    /// Run an encoded call on behalf of `sender`.
    pub fn dispatch(&mut self, sender: Address, call: AuctionCall) -> HandlerResult<CallOutcome> {
        match call {
            AuctionCall::Bid {
                commitment,
                deposit,
            } => self.bid(sender, commitment, deposit).map(|index| CallOutcome::BidPlaced {
                index: index as u32,
            }),
            AuctionCall::Reveal {
                values,
                fakes,
                secrets,
            } => self
                .reveal(sender, &values, &fakes, &secrets)
                .map(CallOutcome::Revealed),
            AuctionCall::Withdraw => self
                .withdraw(sender)
                .map(|amount| CallOutcome::Withdrawn { amount }),
            AuctionCall::AuctionEnd => self
                .auction_end(sender)
                .map(|amount| CallOutcome::Ended { amount }),
        }
    }

    /// Answer a read-only query.
    pub fn query(&self, query: AuctionQuery) -> AuctionQueryResponse {
        handle_query(&self.state, self.clock.now(), query)
    }

    pub fn phase(&self) -> Phase {
        self.state.phase(self.clock.now())
    }

    /// Drain the recorded events.
    pub fn take_events(&mut self) -> Vec<AuctionEvent> {
        std::mem::take(&mut self.state.events)
    }

    pub fn state(&self) -> &AuctionState {
        &self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }
}

fn hex_addr(addr: &Address) -> String {
    auction_types::format_address(addr)
}
