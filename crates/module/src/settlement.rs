//! Reveal settlement.
//!
//! A reveal is processed in two steps. Each disclosed bid is first classified
//! against its commitment without touching state, then the classified bids are
//! settled against a [`PendingSettlement`] overlay. The overlay is applied to the
//! auction only after every index succeeded, so a reveal never leaves partial
//! credit behind.

use std::collections::HashMap;

use auction_crypto::CommitmentHasher;
use auction_types::{Address, Amount, Bid, RevealOutcome};

use crate::error::AuctionError;
use crate::events::AuctionEvent;
use crate::state::AuctionState;

/// How a disclosed bid relates to its commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Settled by an earlier reveal
    AlreadyRevealed,
    /// Disclosure does not hash to the commitment
    Invalid,
    /// Matches, but the discloser marked it fake
    Fake { refund: Amount },
    /// Matches, but the value exceeds what was deposited
    Underfunded { refund: Amount },
    /// Matches and competes for the highest bid
    Candidate { amount: Amount, deposit: Amount },
}

/// Classify one disclosure against its stored bid.
pub fn classify<H: CommitmentHasher + ?Sized>(
    hasher: &H,
    bid: &Bid,
    value: Amount,
    fake: bool,
    secret: &[u8],
) -> Classification {
    if bid.revealed {
        return Classification::AlreadyRevealed;
    }
    if !hasher.verify(&bid.commitment, value, fake, secret) {
        return Classification::Invalid;
    }
    if fake {
        Classification::Fake {
            refund: bid.deposit,
        }
    } else if value > bid.deposit {
        Classification::Underfunded {
            refund: bid.deposit,
        }
    } else {
        Classification::Candidate {
            amount: value,
            deposit: bid.deposit,
        }
    }
}

/// Staged changes of one reveal call.
pub struct PendingSettlement<'a> {
    state: &'a AuctionState,
    bidder: Address,
    highest_bid: Amount,
    highest_bidder: Option<Address>,
    /// New absolute pending-return balances
    credits: HashMap<Address, Amount>,
    settled: Vec<usize>,
    outcomes: Vec<RevealOutcome>,
    events: Vec<AuctionEvent>,
}

impl<'a> PendingSettlement<'a> {
    pub fn new(state: &'a AuctionState, bidder: Address) -> Self {
        Self {
            state,
            bidder,
            highest_bid: state.highest_bid,
            highest_bidder: state.highest_bidder,
            credits: HashMap::new(),
            settled: Vec::new(),
            outcomes: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Current highest bid as seen through the overlay.
    pub fn highest(&self) -> (Option<Address>, Amount) {
        (self.highest_bidder, self.highest_bid)
    }

    /// Pending return of `account` as seen through the overlay.
    pub fn pending_return(&self, account: &Address) -> Amount {
        self.credits
            .get(account)
            .copied()
            .unwrap_or_else(|| self.state.get_pending_return(account))
    }

    /// Credit `amount` to `account`'s pending returns.
    pub fn credit(&mut self, account: Address, amount: Amount) -> Result<(), AuctionError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self
            .pending_return(&account)
            .checked_add(amount)
            .ok_or(AuctionError::Overflow)?;
        self.credits.insert(account, balance);
        Ok(())
    }

    /// Try to make `amount` the highest bid.
    ///
    /// Returns `false` with no change unless `amount` strictly exceeds the current
    /// highest bid. The outbid holder is credited with their previous amount.
    pub fn place_bid(&mut self, bidder: Address, amount: Amount) -> Result<bool, AuctionError> {
        if amount <= self.highest_bid {
            return Ok(false);
        }
        if let Some(previous) = self.highest_bidder {
            self.credit(previous, self.highest_bid)?;
        }
        self.highest_bid = amount;
        self.highest_bidder = Some(bidder);
        self.events
            .push(AuctionEvent::HighestBidIncreased { bidder, amount });
        Ok(true)
    }

    /// Settle one classified bid index and return its outcome.
    pub fn settle(
        &mut self,
        index: usize,
        classification: Classification,
    ) -> Result<RevealOutcome, AuctionError> {
        let outcome = match classification {
            Classification::AlreadyRevealed => RevealOutcome::AlreadyRevealed,
            Classification::Invalid => RevealOutcome::Invalid,
            Classification::Fake { refund } => {
                self.credit(self.bidder, refund)?;
                RevealOutcome::FakeRefunded { refund }
            }
            Classification::Underfunded { refund } => {
                self.credit(self.bidder, refund)?;
                RevealOutcome::UnderfundedRefunded { refund }
            }
            Classification::Candidate { amount, deposit } => {
                if self.place_bid(self.bidder, amount)? {
                    let refund = deposit - amount;
                    self.credit(self.bidder, refund)?;
                    RevealOutcome::PlacedWithExcessRefund { amount, refund }
                } else {
                    self.credit(self.bidder, deposit)?;
                    RevealOutcome::NotHighRefunded { refund: deposit }
                }
            }
        };

        if outcome.settled() {
            self.settled.push(index);
        }
        self.events.push(AuctionEvent::BidRevealed {
            bidder: self.bidder,
            index: index as u32,
            outcome: outcome.clone(),
        });
        self.outcomes.push(outcome.clone());
        Ok(outcome)
    }

    /// Detach the staged changes from the borrowed state.
    pub fn finish(self) -> StagedReveal {
        StagedReveal {
            bidder: self.bidder,
            highest_bid: self.highest_bid,
            highest_bidder: self.highest_bidder,
            credits: self.credits,
            settled: self.settled,
            outcomes: self.outcomes,
            events: self.events,
        }
    }
}

/// Reveal changes ready to apply. Applying cannot fail.
#[derive(Debug)]
pub struct StagedReveal {
    bidder: Address,
    highest_bid: Amount,
    highest_bidder: Option<Address>,
    credits: HashMap<Address, Amount>,
    settled: Vec<usize>,
    outcomes: Vec<RevealOutcome>,
    events: Vec<AuctionEvent>,
}

impl StagedReveal {
    /// Write the staged changes into `state` and return the per-index outcomes.
    pub fn apply(self, state: &mut AuctionState) -> Vec<RevealOutcome> {
        state.highest_bid = self.highest_bid;
        state.highest_bidder = self.highest_bidder;
        state.pending_returns.extend(self.credits);

        if let Some(bids) = state.bids.get_mut(&self.bidder) {
            for index in self.settled {
                bids[index].revealed = true;
            }
        }
        for event in self.events {
            state.record(event);
        }
        self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_crypto::{Keccak256AbiHasher, Sha256Hasher};
    use auction_types::AuctionConfig;
    use test_case::test_case;

    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];

    fn committed(value: Amount, fake: bool, secret: &[u8], deposit: Amount) -> Bid {
        Bid {
            commitment: Sha256Hasher.commit(value, fake, secret),
            deposit,
            revealed: false,
            committed_at: 0,
        }
    }

    fn new_state() -> AuctionState {
        AuctionState::new(AuctionConfig::from_durations([9u8; 32], 0, 60, 60).unwrap())
    }

    #[test_case(50, false, 100 => Classification::Candidate { amount: 50, deposit: 100 }; "real bid below deposit")]
    #[test_case(100, false, 100 => Classification::Candidate { amount: 100, deposit: 100 }; "real bid equal to deposit")]
    #[test_case(150, false, 100 => Classification::Underfunded { refund: 100 }; "value above deposit")]
    #[test_case(50, true, 100 => Classification::Fake { refund: 100 }; "fake bid")]
    fn test_classify_matching(value: Amount, fake: bool, deposit: Amount) -> Classification {
        let bid = committed(value, fake, b"abc", deposit);
        classify(&Sha256Hasher, &bid, value, fake, b"abc")
    }

    #[test]
    fn test_classify_mismatch_is_invalid() {
        let bid = committed(50, false, b"abc", 100);
        assert_eq!(
            classify(&Sha256Hasher, &bid, 50, false, b"abd"),
            Classification::Invalid
        );
        assert_eq!(
            classify(&Sha256Hasher, &bid, 50, true, b"abc"),
            Classification::Invalid
        );
        // Right preimage, wrong scheme
        assert_eq!(
            classify(&Keccak256AbiHasher, &bid, 50, false, b"abc"),
            Classification::Invalid
        );
    }

    #[test]
    fn test_classify_revealed_bid() {
        let mut bid = committed(50, false, b"abc", 100);
        bid.revealed = true;
        assert_eq!(
            classify(&Sha256Hasher, &bid, 50, false, b"abc"),
            Classification::AlreadyRevealed
        );
    }

    #[test]
    fn test_place_bid_requires_strictly_higher() {
        let state = new_state();
        let mut pending = PendingSettlement::new(&state, ALICE);

        assert!(!pending.place_bid(ALICE, 0).unwrap());
        assert!(pending.place_bid(ALICE, 10).unwrap());
        assert!(!pending.place_bid(BOB, 10).unwrap());
        assert_eq!(pending.highest(), (Some(ALICE), 10));
        assert_eq!(pending.pending_return(&ALICE), 0);
    }

    #[test]
    fn test_place_bid_credits_outbid_holder() {
        let mut state = new_state();
        state.highest_bid = 10;
        state.highest_bidder = Some(BOB);
        state.add_pending_return(BOB, 5).unwrap();

        let mut pending = PendingSettlement::new(&state, ALICE);
        assert!(pending.place_bid(ALICE, 20).unwrap());
        assert_eq!(pending.pending_return(&BOB), 15);

        // Outbidding yourself credits your previous high
        assert!(pending.place_bid(ALICE, 30).unwrap());
        assert_eq!(pending.pending_return(&ALICE), 20);
        assert_eq!(pending.highest(), (Some(ALICE), 30));

        // Nothing touched the state yet
        assert_eq!(state.highest_bid, 10);
        assert_eq!(state.get_pending_return(&BOB), 5);
    }

    #[test]
    fn test_settle_outcomes() {
        let state = new_state();
        let mut pending = PendingSettlement::new(&state, ALICE);

        assert_eq!(
            pending.settle(0, Classification::Fake { refund: 7 }).unwrap(),
            RevealOutcome::FakeRefunded { refund: 7 }
        );
        assert_eq!(
            pending
                .settle(1, Classification::Candidate { amount: 20, deposit: 25 })
                .unwrap(),
            RevealOutcome::PlacedWithExcessRefund {
                amount: 20,
                refund: 5
            }
        );
        assert_eq!(
            pending
                .settle(2, Classification::Candidate { amount: 15, deposit: 15 })
                .unwrap(),
            RevealOutcome::NotHighRefunded { refund: 15 }
        );
        assert_eq!(
            pending.settle(3, Classification::Invalid).unwrap(),
            RevealOutcome::Invalid
        );
        assert_eq!(pending.pending_return(&ALICE), 27);
    }

    #[test]
    fn test_apply_marks_only_settled_bids() {
        let mut state = new_state();
        state.push_bid(ALICE, committed(10, false, b"a", 10));
        state.push_bid(ALICE, committed(20, false, b"b", 20));

        let mut pending = PendingSettlement::new(&state, ALICE);
        pending.settle(0, Classification::Invalid).unwrap();
        pending
            .settle(1, Classification::Candidate { amount: 20, deposit: 20 })
            .unwrap();
        let outcomes = pending.finish().apply(&mut state);

        assert_eq!(outcomes.len(), 2);
        let bids = state.get_bids(&ALICE);
        assert!(!bids[0].revealed);
        assert!(bids[1].revealed);
        assert_eq!(state.highest_bid, 20);
        assert_eq!(state.highest_bidder, Some(ALICE));
        assert_eq!(state.get_pending_return(&ALICE), 0);
        assert!(state
            .events
            .contains(&AuctionEvent::HighestBidIncreased { bidder: ALICE, amount: 20 }));
    }
}
