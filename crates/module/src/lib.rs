//! Commit-reveal blind auction engine.
//!
//! One auction runs in three time-derived phases:
//!
//! - Bidding: accounts commit to hidden bids and escrow a deposit with each
//! - Reveal: accounts disclose every bid; matching disclosures are settled
//! - Ended: the highest bid is paid once to the beneficiary
//!
//! # Architecture
//!
//! - `call`: Encoded operations and their outcomes
//! - `handlers`: Business logic for processing calls
//! - `settlement`: Staged settlement of a reveal
//! - `queries`: Read-only state access
//! - `state`: Auction state and its bookkeeping
//! - `engine`: The auction bound to a clock, a ledger and a hasher
//! - `clock`, `ledger`: Collaborators the host provides
//! - `genesis`: Construction-time configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use auction_module::{AuctionEngine, AuctionGenesisConfig, InMemoryLedger, ManualClock};
//! use auction_crypto::Keccak256AbiHasher;
//!
//! let config = AuctionGenesisConfig::new(beneficiary, 60, 60);
//! let mut engine = AuctionEngine::new(&config, ManualClock::new(0), InMemoryLedger::new(), Keccak256AbiHasher)?;
//!
//! engine.bid(alice, commitment, deposit)?;
//! engine.clock().advance(60);
//! engine.reveal(alice, &values, &fakes, &secrets)?;
//! ```

pub mod call;
pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod genesis;
pub mod handlers;
pub mod ledger;
pub mod queries;
pub mod settlement;
pub mod state;

pub use call::{AuctionCall, CallOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::AuctionEngine;
pub use error::AuctionError;
pub use events::AuctionEvent;
pub use genesis::{AuctionGenesisConfig, GenesisValidationError, RefundPolicy};
pub use handlers::{CallContext, HandlerResult};
pub use ledger::{InMemoryLedger, Ledger, LedgerError};
pub use queries::{AuctionQuery, AuctionQueryResponse, AuctionSummary};
pub use state::AuctionState;
