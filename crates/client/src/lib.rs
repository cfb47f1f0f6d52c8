//! Client SDK for bidding in commit-reveal blind auctions.
//!
//! This crate provides a high-level API for:
//! - Preparing bid commitments with random secrets
//! - Keeping prepared bids until the reveal window
//! - Batching the disclosures of a reveal call

pub mod bid;
pub mod store;

pub use bid::{create_bid, parse_amount, BidBuilder, BidError, PreparedBid, RevealBatch};
pub use store::{BidStore, StoreError};
