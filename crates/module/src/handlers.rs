//! Call handlers for the auction module.
//!
//! These functions implement the business logic for each call type. Each one
//! either succeeds or returns an error with the state exactly as it found it.

use auction_crypto::CommitmentHasher;
use auction_types::{Address, Amount, Bid, Commitment, Phase, RevealReceipt, Timestamp};

use crate::error::AuctionError;
use crate::events::AuctionEvent;
use crate::ledger::Ledger;
use crate::settlement::{classify, PendingSettlement};
use crate::state::AuctionState;

/// Context provided by the host for each call.
pub struct CallContext {
    /// Sender of the call
    pub sender: Address,
    /// Current timestamp
    pub timestamp: Timestamp,
    /// Value attached to the call (for deposits)
    pub value: Amount,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

fn require_phase(state: &AuctionState, ctx: &CallContext, expected: Phase) -> HandlerResult<()> {
    let actual = state.phase(ctx.timestamp);
    if actual != expected {
        return Err(AuctionError::PhaseViolation { expected, actual });
    }
    Ok(())
}

/// Handle Bid call. Escrows `ctx.value` and returns the new bid's index.
pub fn handle_bid<L: Ledger + ?Sized>(
    state: &mut AuctionState,
    ctx: &CallContext,
    ledger: &mut L,
    commitment: Commitment,
) -> HandlerResult<usize> {
    require_phase(state, ctx, Phase::Bidding)?;

    // Escrow first: a failed transfer leaves no bid behind
    ledger.transfer_in(&ctx.sender, ctx.value)?;

    let index = state.push_bid(
        ctx.sender,
        Bid {
            commitment,
            deposit: ctx.value,
            revealed: false,
            committed_at: ctx.timestamp,
        },
    );
    state.record(AuctionEvent::BidCommitted {
        bidder: ctx.sender,
        index: index as u32,
        deposit: ctx.value,
        timestamp: ctx.timestamp,
    });

    Ok(index)
}

/// Handle Reveal call.
///
/// Disclosures are matched to the sender's bids by index. A disclosure that does
/// not match its commitment is skipped without refund; the others are refunded
/// into pending returns and may become the highest bid.
pub fn handle_reveal<H: CommitmentHasher + ?Sized>(
    state: &mut AuctionState,
    ctx: &CallContext,
    hasher: &H,
    values: &[Amount],
    fakes: &[bool],
    secrets: &[Vec<u8>],
) -> HandlerResult<RevealReceipt> {
    require_phase(state, ctx, Phase::Reveal)?;

    let bids = state.get_bids(&ctx.sender);
    if values.len() != bids.len() || fakes.len() != bids.len() || secrets.len() != bids.len() {
        return Err(AuctionError::ArityMismatch {
            expected: bids.len(),
            values: values.len(),
            fakes: fakes.len(),
            secrets: secrets.len(),
        });
    }

    let mut pending = PendingSettlement::new(state, ctx.sender);
    for (index, bid) in bids.iter().enumerate() {
        let classification = classify(hasher, bid, values[index], fakes[index], &secrets[index]);
        pending.settle(index, classification)?;
    }
    let outcomes = pending.finish().apply(state);

    let credited = outcomes.iter().map(|o| o.refund()).sum();
    Ok(RevealReceipt {
        outcomes,
        credited,
        paid_out: 0,
    })
}

/// Handle Withdraw call. Returns the amount transferred.
///
/// The pending return is zeroed before the transfer and restored if it fails.
pub fn handle_withdraw<L: Ledger + ?Sized>(
    state: &mut AuctionState,
    ctx: &CallContext,
    ledger: &mut L,
) -> HandlerResult<Amount> {
    let amount = state.take_pending_return(&ctx.sender);
    if amount == 0 {
        return Ok(0);
    }

    if let Err(err) = ledger.transfer_out(&ctx.sender, amount) {
        state.restore_pending_return(ctx.sender, amount);
        return Err(AuctionError::TransferFailed(err));
    }

    state.record(AuctionEvent::Withdrawn {
        account: ctx.sender,
        amount,
    });
    Ok(amount)
}

/// Handle AuctionEnd call. Pays the highest bid to the beneficiary.
///
/// `ended` is only set once the payout succeeded, so a failed transfer can be
/// retried.
pub fn handle_auction_end<L: Ledger + ?Sized>(
    state: &mut AuctionState,
    ctx: &CallContext,
    ledger: &mut L,
) -> HandlerResult<Amount> {
    if ctx.timestamp < state.config.reveal_deadline {
        return Err(AuctionError::TooEarly {
            now: ctx.timestamp,
            reveal_deadline: state.config.reveal_deadline,
        });
    }
    if state.ended {
        return Err(AuctionError::AlreadyEnded);
    }

    let amount = state.highest_bid;
    if amount > 0 {
        ledger.transfer_out(&state.config.beneficiary, amount)?;
    }
    state.ended = true;

    state.record(AuctionEvent::AuctionEnded {
        winner: state.highest_bidder,
        amount,
    });
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use auction_crypto::Keccak256AbiHasher;
    use auction_types::{AuctionConfig, RevealOutcome, WEI_PER_ETHER};
    use pretty_assertions::assert_eq;

    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];
    const BENEFICIARY: Address = [9u8; 32];

    // Bidding in [1000, 1060), reveal in [1060, 1120)
    const BIDDING: Timestamp = 1000;
    const REVEAL: Timestamp = 1060;
    const AFTER: Timestamp = 1120;

    fn setup() -> (AuctionState, InMemoryLedger) {
        let config = AuctionConfig::from_durations(BENEFICIARY, BIDDING, 60, 60).unwrap();
        let mut ledger = InMemoryLedger::new();
        ledger.credit(ALICE, 10 * WEI_PER_ETHER).unwrap();
        ledger.credit(BOB, 10 * WEI_PER_ETHER).unwrap();
        (AuctionState::new(config), ledger)
    }

    fn ctx(sender: Address, timestamp: Timestamp, value: Amount) -> CallContext {
        CallContext {
            sender,
            timestamp,
            value,
        }
    }

    fn commit(value: Amount, fake: bool, secret: &str) -> Commitment {
        Keccak256AbiHasher.commit(value, fake, secret.as_bytes())
    }

    fn secrets(items: &[&str]) -> Vec<Vec<u8>> {
        items.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_bid_escrows_deposit() {
        let (mut state, mut ledger) = setup();

        let index = handle_bid(
            &mut state,
            &ctx(ALICE, BIDDING, WEI_PER_ETHER),
            &mut ledger,
            commit(WEI_PER_ETHER, true, "abc"),
        )
        .unwrap();

        assert_eq!(index, 0);
        assert_eq!(ledger.escrow_balance(), WEI_PER_ETHER);
        assert_eq!(state.get_bids(&ALICE)[0].deposit, WEI_PER_ETHER);
        assert_eq!(state.get_bids(&ALICE)[0].committed_at, BIDDING);
    }

    #[test]
    fn test_bid_after_bidding_deadline() {
        let (mut state, mut ledger) = setup();

        let result = handle_bid(
            &mut state,
            &ctx(ALICE, REVEAL, 1),
            &mut ledger,
            commit(1, false, "x"),
        );

        assert_eq!(
            result,
            Err(AuctionError::PhaseViolation {
                expected: Phase::Bidding,
                actual: Phase::Reveal
            })
        );
        assert_eq!(ledger.escrow_balance(), 0);
    }

    #[test]
    fn test_bid_with_failed_escrow_records_nothing() {
        let (mut state, mut ledger) = setup();

        let result = handle_bid(
            &mut state,
            &ctx(ALICE, BIDDING, 11 * WEI_PER_ETHER),
            &mut ledger,
            commit(1, false, "x"),
        );

        assert!(matches!(result, Err(AuctionError::TransferFailed(_))));
        assert!(state.get_bids(&ALICE).is_empty());
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_reveal_fake_and_real_bid() {
        let (mut state, mut ledger) = setup();
        let one = WEI_PER_ETHER;

        handle_bid(&mut state, &ctx(ALICE, BIDDING, one), &mut ledger, commit(one, true, "abc")).unwrap();
        handle_bid(&mut state, &ctx(ALICE, BIDDING, 2 * one), &mut ledger, commit(2 * one, false, "abc"))
            .unwrap();
        assert_eq!(ledger.escrow_balance(), 3 * one);

        let receipt = handle_reveal(
            &mut state,
            &ctx(ALICE, REVEAL, 0),
            &Keccak256AbiHasher,
            &[one, 2 * one],
            &[true, false],
            &secrets(&["abc", "abc"]),
        )
        .unwrap();

        assert_eq!(
            receipt.outcomes,
            vec![
                RevealOutcome::FakeRefunded { refund: one },
                RevealOutcome::PlacedWithExcessRefund {
                    amount: 2 * one,
                    refund: 0
                },
            ]
        );
        assert_eq!(receipt.credited, one);
        assert_eq!(state.highest_bid, 2 * one);
        assert_eq!(state.highest_bidder, Some(ALICE));
        assert_eq!(state.get_pending_return(&ALICE), one);
        assert_eq!(state.expected_escrow(), ledger.escrow_balance());
    }

    #[test]
    fn test_reveal_arity_mismatch_mutates_nothing() {
        let (mut state, mut ledger) = setup();
        handle_bid(&mut state, &ctx(ALICE, BIDDING, 5), &mut ledger, commit(5, false, "a")).unwrap();
        handle_bid(&mut state, &ctx(ALICE, BIDDING, 6), &mut ledger, commit(6, false, "b")).unwrap();
        let events_before = state.events.len();

        let result = handle_reveal(
            &mut state,
            &ctx(ALICE, REVEAL, 0),
            &Keccak256AbiHasher,
            &[5],
            &[false],
            &secrets(&["a"]),
        );

        assert_eq!(
            result,
            Err(AuctionError::ArityMismatch {
                expected: 2,
                values: 1,
                fakes: 1,
                secrets: 1
            })
        );
        assert_eq!(state.highest_bid, 0);
        assert!(state.get_bids(&ALICE).iter().all(|b| !b.revealed));
        assert_eq!(state.events.len(), events_before);
    }

    #[test]
    fn test_reveal_outside_window() {
        let (mut state, _) = setup();
        for (now, actual) in [(BIDDING, Phase::Bidding), (AFTER, Phase::Ended)] {
            let result = handle_reveal(&mut state, &ctx(ALICE, now, 0), &Keccak256AbiHasher, &[], &[], &[]);
            assert_eq!(
                result,
                Err(AuctionError::PhaseViolation {
                    expected: Phase::Reveal,
                    actual
                })
            );
        }
    }

    #[test]
    fn test_invalid_reveal_forfeits_and_can_be_retried() {
        let (mut state, mut ledger) = setup();
        handle_bid(&mut state, &ctx(ALICE, BIDDING, 8), &mut ledger, commit(5, false, "right")).unwrap();

        let receipt = handle_reveal(
            &mut state,
            &ctx(ALICE, REVEAL, 0),
            &Keccak256AbiHasher,
            &[5],
            &[false],
            &secrets(&["wrong"]),
        )
        .unwrap();
        assert_eq!(receipt.outcomes, vec![RevealOutcome::Invalid]);
        assert_eq!(receipt.credited, 0);
        assert_eq!(state.highest_bid, 0);
        assert_eq!(state.get_pending_return(&ALICE), 0);

        let receipt = handle_reveal(
            &mut state,
            &ctx(ALICE, REVEAL + 1, 0),
            &Keccak256AbiHasher,
            &[5],
            &[false],
            &secrets(&["right"]),
        )
        .unwrap();
        assert_eq!(
            receipt.outcomes,
            vec![RevealOutcome::PlacedWithExcessRefund { amount: 5, refund: 3 }]
        );
    }

    #[test]
    fn test_second_reveal_does_not_double_refund() {
        let (mut state, mut ledger) = setup();
        handle_bid(&mut state, &ctx(ALICE, BIDDING, 8), &mut ledger, commit(5, true, "s")).unwrap();

        let reveal = |state: &mut AuctionState| {
            handle_reveal(state, &ctx(ALICE, REVEAL, 0), &Keccak256AbiHasher, &[5], &[true], &secrets(&["s"]))
        };
        assert_eq!(reveal(&mut state).unwrap().credited, 8);
        let second = reveal(&mut state).unwrap();
        assert_eq!(second.outcomes, vec![RevealOutcome::AlreadyRevealed]);
        assert_eq!(second.credited, 0);
        assert_eq!(state.get_pending_return(&ALICE), 8);
    }

    #[test]
    fn test_outbid_accumulates_pending_returns() {
        let (mut state, mut ledger) = setup();
        handle_bid(&mut state, &ctx(ALICE, BIDDING, 10), &mut ledger, commit(10, false, "a1")).unwrap();
        handle_bid(&mut state, &ctx(ALICE, BIDDING, 30), &mut ledger, commit(30, false, "a2")).unwrap();
        handle_bid(&mut state, &ctx(BOB, BIDDING, 20), &mut ledger, commit(20, false, "b1")).unwrap();
        handle_bid(&mut state, &ctx(BOB, BIDDING, 40), &mut ledger, commit(40, false, "b2")).unwrap();

        // Bob reveals only his first bid now
        handle_reveal(
            &mut state,
            &ctx(BOB, REVEAL, 0),
            &Keccak256AbiHasher,
            &[20, 0],
            &[false, false],
            &secrets(&["b1", "unknown"]),
        )
        .unwrap();
        assert_eq!(state.highest_bidder, Some(BOB));

        // Alice's first bid loses, her second outbids Bob
        handle_reveal(
            &mut state,
            &ctx(ALICE, REVEAL, 0),
            &Keccak256AbiHasher,
            &[10, 30],
            &[false, false],
            &secrets(&["a1", "a2"]),
        )
        .unwrap();
        assert_eq!(state.get_pending_return(&BOB), 20);
        assert_eq!(state.get_pending_return(&ALICE), 10);

        // Bob's second bid takes the lead; Alice is credited her 30
        let receipt = handle_reveal(
            &mut state,
            &ctx(BOB, REVEAL, 0),
            &Keccak256AbiHasher,
            &[20, 40],
            &[false, false],
            &secrets(&["b1", "b2"]),
        )
        .unwrap();
        assert_eq!(
            receipt.outcomes,
            vec![
                RevealOutcome::AlreadyRevealed,
                RevealOutcome::PlacedWithExcessRefund { amount: 40, refund: 0 },
            ]
        );
        assert_eq!(state.highest_bid, 40);
        assert_eq!(state.highest_bidder, Some(BOB));
        assert_eq!(state.get_pending_return(&ALICE), 40);
        assert_eq!(state.get_pending_return(&BOB), 20);
        assert_eq!(state.expected_escrow(), ledger.escrow_balance());
    }

    #[test]
    fn test_withdraw_twice_transfers_once() {
        let (mut state, mut ledger) = setup();
        state.add_pending_return(ALICE, 7).unwrap();
        // Give the escrow something to pay from
        ledger.transfer_in(&BOB, 7).unwrap();

        let before = ledger.balance_of(&ALICE);
        assert_eq!(handle_withdraw(&mut state, &ctx(ALICE, BIDDING, 0), &mut ledger), Ok(7));
        assert_eq!(handle_withdraw(&mut state, &ctx(ALICE, BIDDING, 0), &mut ledger), Ok(0));
        assert_eq!(ledger.balance_of(&ALICE), before + 7);
    }

    #[test]
    fn test_withdraw_failure_restores_credit() {
        let (mut state, mut ledger) = setup();
        state.add_pending_return(ALICE, 7).unwrap();
        ledger.transfer_in(&BOB, 7).unwrap();
        ledger.fail_transfers_to(ALICE);

        let result = handle_withdraw(&mut state, &ctx(ALICE, AFTER, 0), &mut ledger);
        assert!(matches!(result, Err(AuctionError::TransferFailed(_))));
        assert_eq!(state.get_pending_return(&ALICE), 7);
        assert_eq!(ledger.escrow_balance(), 7);

        ledger.allow_transfers_to(&ALICE);
        assert_eq!(handle_withdraw(&mut state, &ctx(ALICE, AFTER, 0), &mut ledger), Ok(7));
        assert_eq!(state.get_pending_return(&ALICE), 0);
    }

    #[test]
    fn test_auction_end_too_early() {
        let (mut state, mut ledger) = setup();
        let result = handle_auction_end(&mut state, &ctx(ALICE, AFTER - 1, 0), &mut ledger);
        assert_eq!(
            result,
            Err(AuctionError::TooEarly {
                now: AFTER - 1,
                reveal_deadline: AFTER
            })
        );
        assert!(!state.ended);
    }

    #[test]
    fn test_auction_end_pays_once() {
        let (mut state, mut ledger) = setup();
        handle_bid(&mut state, &ctx(ALICE, BIDDING, 9), &mut ledger, commit(9, false, "a")).unwrap();
        handle_reveal(&mut state, &ctx(ALICE, REVEAL, 0), &Keccak256AbiHasher, &[9], &[false], &secrets(&["a"]))
            .unwrap();

        assert_eq!(handle_auction_end(&mut state, &ctx(BOB, AFTER, 0), &mut ledger), Ok(9));
        assert_eq!(
            handle_auction_end(&mut state, &ctx(BOB, AFTER + 5, 0), &mut ledger),
            Err(AuctionError::AlreadyEnded)
        );
        assert_eq!(ledger.balance_of(&BENEFICIARY), 9);
        assert_eq!(ledger.escrow_balance(), 0);
        assert_eq!(
            state.events.last(),
            Some(&AuctionEvent::AuctionEnded {
                winner: Some(ALICE),
                amount: 9
            })
        );
    }

    #[test]
    fn test_auction_end_failed_payout_can_retry() {
        let (mut state, mut ledger) = setup();
        handle_bid(&mut state, &ctx(ALICE, BIDDING, 9), &mut ledger, commit(9, false, "a")).unwrap();
        handle_reveal(&mut state, &ctx(ALICE, REVEAL, 0), &Keccak256AbiHasher, &[9], &[false], &secrets(&["a"]))
            .unwrap();
        ledger.fail_transfers_to(BENEFICIARY);

        let result = handle_auction_end(&mut state, &ctx(BOB, AFTER, 0), &mut ledger);
        assert!(matches!(result, Err(AuctionError::TransferFailed(_))));
        assert!(!state.ended);
        assert_eq!(ledger.escrow_balance(), 9);

        ledger.allow_transfers_to(&BENEFICIARY);
        assert_eq!(handle_auction_end(&mut state, &ctx(BOB, AFTER, 0), &mut ledger), Ok(9));
        assert!(state.ended);
    }

    #[test]
    fn test_auction_end_without_bids() {
        let (mut state, mut ledger) = setup();
        assert_eq!(handle_auction_end(&mut state, &ctx(BOB, AFTER, 0), &mut ledger), Ok(0));
        assert!(state.ended);
        assert_eq!(ledger.balance_of(&BENEFICIARY), 0);
    }
}
