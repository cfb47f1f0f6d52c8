//! End-to-end integration tests for the blind auction system.
//!
//! These tests exercise the full auction lifecycle:
//! 1. Bid preparation with the client SDK
//! 2. Commitment and escrow during bidding
//! 3. Reveal and settlement of every bid
//! 4. Payout to the beneficiary and refund withdrawals

use auction_client::{create_bid, BidBuilder, PreparedBid, RevealBatch};
use auction_crypto::{AnyHasher, HasherKind, Keccak256AbiHasher};
use auction_module::{
    AuctionCall, AuctionEngine, AuctionError, AuctionGenesisConfig, CallOutcome, InMemoryLedger,
    Ledger, ManualClock, RefundPolicy,
};
use auction_types::{Address, Amount, Phase, RevealOutcome, WEI_PER_ETHER};

use rand::rngs::OsRng;

const ETHER: Amount = WEI_PER_ETHER;
const ALICE: Address = [0xa1; 32];
const BOB: Address = [0xb0; 32];
const CAROL: Address = [0xc4; 32];
const BENEFICIARY: Address = [0xbe; 32];
const START: u64 = 1_700_000_000;

type Engine = AuctionEngine<ManualClock, InMemoryLedger, AnyHasher>;

fn new_auction(policy: RefundPolicy, hasher: HasherKind) -> Engine {
    let config = AuctionGenesisConfig::new(BENEFICIARY, 60, 60)
        .with_refund_policy(policy)
        .with_hasher(hasher);
    let mut ledger = InMemoryLedger::new();
    for account in [ALICE, BOB, CAROL] {
        ledger.credit(account, 50 * ETHER).unwrap();
    }
    AuctionEngine::new(&config, ManualClock::new(START), ledger, AnyHasher::from(hasher)).unwrap()
}

/// Submit a prepared bid the way a host would: encoded, then dispatched.
fn submit(engine: &mut Engine, sender: Address, bid: &PreparedBid) -> u32 {
    let call = AuctionCall::Bid {
        commitment: bid.commitment,
        deposit: bid.deposit,
    };
    let decoded = AuctionCall::decode(&call.encode().unwrap()).unwrap();
    match engine.dispatch(sender, decoded).unwrap() {
        CallOutcome::BidPlaced { index } => index,
        other => panic!("unexpected outcome: {other:?}"),
    }
}

fn reveal(engine: &mut Engine, sender: Address, bids: &[PreparedBid]) -> Vec<RevealOutcome> {
    match engine.dispatch(sender, RevealBatch::from_bids(bids).into_call()).unwrap() {
        CallOutcome::Revealed(receipt) => receipt.outcomes,
        other => panic!("unexpected outcome: {other:?}"),
    }
}

fn assert_conserved(engine: &Engine) {
    assert_eq!(
        engine.ledger().escrow_balance(),
        engine.state().expected_escrow(),
        "escrow out of sync with auction state"
    );
}

/// Test the complete auction flow with three bidders.
#[test]
fn test_full_auction_flow() {
    let mut rng = OsRng;
    let hasher = AnyHasher::from(HasherKind::Keccak256Abi);
    let mut engine = new_auction(RefundPolicy::Credit, HasherKind::Keccak256Abi);

    // ========================================
    // Phase 1: Bidding
    // ========================================

    // Alice hides a 3 ether bid behind a fake one
    let alice_bids = vec![
        BidBuilder::new(10 * ETHER).fake(true).build(&hasher, &mut rng).unwrap(),
        create_bid(&hasher, 3 * ETHER, false, 4 * ETHER, &mut rng).unwrap(),
    ];
    let bob_bids = vec![create_bid(&hasher, 5 * ETHER, false, 5 * ETHER, &mut rng).unwrap()];
    let carol_bids = vec![
        create_bid(&hasher, 4 * ETHER, false, 6 * ETHER, &mut rng).unwrap(),
        create_bid(&hasher, 7 * ETHER, false, 7 * ETHER, &mut rng).unwrap(),
    ];

    for (i, bid) in alice_bids.iter().enumerate() {
        assert_eq!(submit(&mut engine, ALICE, bid), i as u32);
    }
    submit(&mut engine, BOB, &bob_bids[0]);
    for bid in &carol_bids {
        submit(&mut engine, CAROL, bid);
    }
    assert_eq!(engine.ledger().escrow_balance(), 32 * ETHER);
    assert_conserved(&engine);

    // Revealing too early is rejected
    assert_eq!(
        engine
            .dispatch(ALICE, RevealBatch::from_bids(&alice_bids).into_call())
            .unwrap_err(),
        AuctionError::PhaseViolation {
            expected: Phase::Reveal,
            actual: Phase::Bidding
        }
    );

    println!("Bidding complete: 5 commitments, 32 ether escrowed");

    // ========================================
    // Phase 2: Reveal
    // ========================================

    engine.clock().advance(60);
    assert_eq!(engine.phase(), Phase::Reveal);

    // Late bids are rejected
    assert!(matches!(
        engine.bid(BOB, bob_bids[0].commitment, ETHER),
        Err(AuctionError::PhaseViolation { .. })
    ));

    assert_eq!(
        reveal(&mut engine, ALICE, &alice_bids),
        vec![
            RevealOutcome::FakeRefunded { refund: 10 * ETHER },
            RevealOutcome::PlacedWithExcessRefund {
                amount: 3 * ETHER,
                refund: ETHER
            },
        ]
    );
    assert_eq!(
        reveal(&mut engine, BOB, &bob_bids),
        vec![RevealOutcome::PlacedWithExcessRefund {
            amount: 5 * ETHER,
            refund: 0
        }]
    );
    assert_eq!(
        reveal(&mut engine, CAROL, &carol_bids),
        vec![
            RevealOutcome::NotHighRefunded { refund: 6 * ETHER },
            RevealOutcome::PlacedWithExcessRefund {
                amount: 7 * ETHER,
                refund: 0
            },
        ]
    );
    assert_conserved(&engine);

    // Outbid holders got their previous high back
    assert_eq!(engine.state().get_pending_return(&ALICE), 14 * ETHER);
    assert_eq!(engine.state().get_pending_return(&BOB), 5 * ETHER);
    assert_eq!(engine.state().get_pending_return(&CAROL), 6 * ETHER);
    assert_eq!(engine.state().highest_bidder, Some(CAROL));

    println!("Reveal complete: Carol leads at 7 ether");

    // ========================================
    // Phase 3: Settlement
    // ========================================

    engine.clock().advance(60);
    match engine.dispatch(BOB, AuctionCall::AuctionEnd).unwrap() {
        CallOutcome::Ended { amount } => assert_eq!(amount, 7 * ETHER),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(engine.ledger().balance_of(&BENEFICIARY), 7 * ETHER);

    for account in [ALICE, BOB, CAROL] {
        engine.withdraw(account).unwrap();
        assert_conserved(&engine);
    }
    assert_eq!(engine.ledger().balance_of(&ALICE), 50 * ETHER);
    assert_eq!(engine.ledger().balance_of(&BOB), 50 * ETHER);
    assert_eq!(engine.ledger().balance_of(&CAROL), 43 * ETHER);
    assert_eq!(engine.ledger().escrow_balance(), 0);

    println!("\nAuction settled successfully!");
    println!("  Winner: Carol");
    println!("  Payment: 7 ether");
}

/// A fake and a real bid from one account, revealed together.
#[test]
fn test_fake_and_real_bid_from_one_account() {
    for policy in [RefundPolicy::Credit, RefundPolicy::PayOnReveal] {
        let mut engine = new_auction(policy, HasherKind::Keccak256Abi);
        let bids = vec![
            BidBuilder::new(ETHER)
                .fake(true)
                .secret("abc")
                .build(&Keccak256AbiHasher, &mut OsRng)
                .unwrap(),
            BidBuilder::new(2 * ETHER)
                .secret("abc")
                .build(&Keccak256AbiHasher, &mut OsRng)
                .unwrap(),
        ];
        for bid in &bids {
            submit(&mut engine, ALICE, bid);
        }

        engine.clock().advance(60);
        let outcomes = reveal(&mut engine, ALICE, &bids);
        assert_eq!(
            outcomes,
            vec![
                RevealOutcome::FakeRefunded { refund: ETHER },
                RevealOutcome::PlacedWithExcessRefund {
                    amount: 2 * ETHER,
                    refund: 0
                },
            ]
        );
        assert_eq!(engine.state().highest_bid, 2 * ETHER);
        assert_conserved(&engine);

        match policy {
            RefundPolicy::Credit => {
                assert_eq!(engine.state().get_pending_return(&ALICE), ETHER);
                assert_eq!(engine.ledger().escrow_balance(), 3 * ETHER);
            }
            RefundPolicy::PayOnReveal => {
                assert_eq!(engine.state().get_pending_return(&ALICE), 0);
                assert_eq!(engine.ledger().escrow_balance(), 2 * ETHER);
            }
        }
    }
}

/// A reveal with the wrong number of disclosures changes nothing.
#[test]
fn test_reveal_arity_mismatch() {
    let mut engine = new_auction(RefundPolicy::Credit, HasherKind::Keccak256Abi);
    let hasher = AnyHasher::from(HasherKind::Keccak256Abi);
    let bids = vec![
        create_bid(&hasher, ETHER, false, ETHER, &mut OsRng).unwrap(),
        create_bid(&hasher, 2 * ETHER, false, 2 * ETHER, &mut OsRng).unwrap(),
    ];
    for bid in &bids {
        submit(&mut engine, ALICE, bid);
    }
    engine.clock().advance(60);

    let err = engine
        .dispatch(ALICE, RevealBatch::from_bids(&bids[..1]).into_call())
        .unwrap_err();
    assert_eq!(
        err,
        AuctionError::ArityMismatch {
            expected: 2,
            values: 1,
            fakes: 1,
            secrets: 1
        }
    );
    assert_eq!(engine.state().highest_bid, 0);
    assert!(engine.state().get_bids(&ALICE).iter().all(|b| !b.revealed));
    assert!(engine.take_events().iter().all(|e| !matches!(
        e,
        auction_module::AuctionEvent::BidRevealed { .. }
    )));
}

/// Ending is refused before the reveal deadline and succeeds exactly once.
#[test]
fn test_auction_end_once() {
    let mut engine = new_auction(RefundPolicy::Credit, HasherKind::Sha256);
    let hasher = AnyHasher::from(HasherKind::Sha256);
    let bid = create_bid(&hasher, 2 * ETHER, false, 2 * ETHER, &mut OsRng).unwrap();
    submit(&mut engine, BOB, &bid);

    assert!(matches!(
        engine.auction_end(ALICE),
        Err(AuctionError::TooEarly { .. })
    ));

    engine.clock().advance(60);
    reveal(&mut engine, BOB, std::slice::from_ref(&bid));
    assert!(matches!(
        engine.auction_end(ALICE),
        Err(AuctionError::TooEarly { .. })
    ));

    engine.clock().advance(60);
    assert_eq!(engine.auction_end(ALICE).unwrap(), 2 * ETHER);
    assert_eq!(engine.auction_end(ALICE), Err(AuctionError::AlreadyEnded));
    assert_eq!(engine.ledger().balance_of(&BENEFICIARY), 2 * ETHER);
}

/// A failed payout leaves the auction open for a retry.
#[test]
fn test_failed_payouts_are_retryable() {
    let mut engine = new_auction(RefundPolicy::Credit, HasherKind::Keccak256Abi);
    let hasher = AnyHasher::from(HasherKind::Keccak256Abi);
    let bid = create_bid(&hasher, ETHER, false, 3 * ETHER, &mut OsRng).unwrap();
    submit(&mut engine, ALICE, &bid);
    engine.clock().advance(60);
    reveal(&mut engine, ALICE, std::slice::from_ref(&bid));
    engine.clock().advance(60);

    engine.ledger_mut().fail_transfers_to(BENEFICIARY);
    engine.ledger_mut().fail_transfers_to(ALICE);

    assert!(matches!(
        engine.auction_end(BOB),
        Err(AuctionError::TransferFailed(_))
    ));
    assert!(!engine.state().ended);
    assert!(matches!(
        engine.withdraw(ALICE),
        Err(AuctionError::TransferFailed(_))
    ));
    assert_eq!(engine.state().get_pending_return(&ALICE), 2 * ETHER);
    assert_conserved(&engine);

    engine.ledger_mut().allow_transfers_to(&BENEFICIARY);
    engine.ledger_mut().allow_transfers_to(&ALICE);
    assert_eq!(engine.auction_end(BOB).unwrap(), ETHER);
    assert_eq!(engine.withdraw(ALICE).unwrap(), 2 * ETHER);
    assert_eq!(engine.ledger().escrow_balance(), 0);
}

/// A mistyped secret forfeits nothing as long as the bidder corrects it in time.
#[test]
fn test_mismatched_reveal_can_be_corrected() {
    let mut engine = new_auction(RefundPolicy::Credit, HasherKind::Keccak256Abi);
    let bid = BidBuilder::new(ETHER)
        .secret("right")
        .build(&Keccak256AbiHasher, &mut OsRng)
        .unwrap();
    submit(&mut engine, ALICE, &bid);
    engine.clock().advance(60);

    let mut wrong = bid.clone();
    wrong.secret = "wrong".to_string();
    assert_eq!(
        reveal(&mut engine, ALICE, std::slice::from_ref(&wrong)),
        vec![RevealOutcome::Invalid]
    );
    assert_eq!(engine.state().highest_bid, 0);
    assert_eq!(engine.state().unrevealed_deposits(), ETHER);

    assert_eq!(
        reveal(&mut engine, ALICE, std::slice::from_ref(&bid)),
        vec![RevealOutcome::PlacedWithExcessRefund {
            amount: ETHER,
            refund: 0
        }]
    );

    // Unrevealed deposits stay locked once the window closes
    engine.clock().advance(60);
    assert!(matches!(
        engine.dispatch(ALICE, RevealBatch::from_bids([&bid]).into_call()),
        Err(AuctionError::PhaseViolation { .. })
    ));
}

/// Equal bids: the first one revealed keeps the lead.
#[test]
fn test_tie_goes_to_first_revealer() {
    let mut engine = new_auction(RefundPolicy::Credit, HasherKind::Keccak256Abi);
    let hasher = AnyHasher::from(HasherKind::Keccak256Abi);
    let bob_bid = create_bid(&hasher, 2 * ETHER, false, 2 * ETHER, &mut OsRng).unwrap();
    let carol_bid = create_bid(&hasher, 2 * ETHER, false, 2 * ETHER, &mut OsRng).unwrap();
    submit(&mut engine, BOB, &bob_bid);
    submit(&mut engine, CAROL, &carol_bid);
    engine.clock().advance(60);

    reveal(&mut engine, BOB, std::slice::from_ref(&bob_bid));
    assert_eq!(
        reveal(&mut engine, CAROL, std::slice::from_ref(&carol_bid)),
        vec![RevealOutcome::NotHighRefunded { refund: 2 * ETHER }]
    );
    assert_eq!(engine.state().highest_bidder, Some(BOB));
    assert_conserved(&engine);
}

/// Bids committed under one scheme do not open under the other.
#[test]
fn test_commitment_scheme_must_match() {
    let mut engine = new_auction(RefundPolicy::Credit, HasherKind::Sha256);
    let bid = BidBuilder::new(ETHER)
        .secret("abc")
        .build(&Keccak256AbiHasher, &mut OsRng)
        .unwrap();
    submit(&mut engine, ALICE, &bid);
    engine.clock().advance(60);

    assert_eq!(
        reveal(&mut engine, ALICE, std::slice::from_ref(&bid)),
        vec![RevealOutcome::Invalid]
    );
}

/// Deposits come out of the bidder's balance and must be covered.
#[test]
fn test_deposit_requires_funds() {
    let mut engine = new_auction(RefundPolicy::Credit, HasherKind::Keccak256Abi);
    let hasher = AnyHasher::from(HasherKind::Keccak256Abi);
    let bid = create_bid(&hasher, ETHER, true, 51 * ETHER, &mut OsRng).unwrap();

    assert!(matches!(
        engine.bid(ALICE, bid.commitment, bid.deposit),
        Err(AuctionError::TransferFailed(_))
    ));
    assert!(engine.state().get_bids(&ALICE).is_empty());
    assert_eq!(engine.ledger().balance_of(&ALICE), 50 * ETHER);

    // The ledger trait is all the engine needs
    let ledger: &mut dyn Ledger = engine.ledger_mut();
    assert!(ledger.transfer_out(&ALICE, 1).is_err());
}
