//! Construction-time configuration for an auction.
//!
//! Everything here is fixed when the auction is created and never changes.

use auction_crypto::HasherKind;
use auction_types::{Address, AuctionConfig, Timestamp};
use serde::{Deserialize, Serialize};

/// When refunds credited by a reveal reach the bidder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefundPolicy {
    /// Refunds wait in pending returns until the bidder withdraws
    #[default]
    Credit,
    /// The reveal pays the bidder's pending returns out immediately
    PayOnReveal,
}

/// Genesis configuration for an auction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionGenesisConfig {
    /// Receives the winning amount
    pub beneficiary: Address,

    /// Length of the commit window (seconds)
    pub bidding_duration_secs: u64,

    /// Length of the reveal window (seconds)
    pub reveal_duration_secs: u64,

    #[serde(default)]
    pub refund_policy: RefundPolicy,

    /// Commitment scheme bidders must use
    #[serde(default)]
    pub hasher: HasherKind,
}

impl Default for AuctionGenesisConfig {
    fn default() -> Self {
        Self {
            beneficiary: [0u8; 32],
            bidding_duration_secs: 60,
            reveal_duration_secs: 60,
            refund_policy: RefundPolicy::default(),
            hasher: HasherKind::default(),
        }
    }
}

impl AuctionGenesisConfig {
    /// Create a config paying out to `beneficiary` with the given windows.
    pub fn new(beneficiary: Address, bidding_duration_secs: u64, reveal_duration_secs: u64) -> Self {
        Self {
            beneficiary,
            bidding_duration_secs,
            reveal_duration_secs,
            ..Default::default()
        }
    }

    pub fn with_refund_policy(mut self, refund_policy: RefundPolicy) -> Self {
        self.refund_policy = refund_policy;
        self
    }

    pub fn with_hasher(mut self, hasher: HasherKind) -> Self {
        self.hasher = hasher;
        self
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.beneficiary == [0u8; 32] {
            return Err(GenesisValidationError::MissingBeneficiary);
        }
        if self.bidding_duration_secs == 0 {
            return Err(GenesisValidationError::InvalidTiming(
                "Bidding window cannot be empty".into(),
            ));
        }
        if self.reveal_duration_secs == 0 {
            return Err(GenesisValidationError::InvalidTiming(
                "Reveal window cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Validate and derive the auction deadlines for a creation time.
    pub fn deadlines(&self, created_at: Timestamp) -> Result<AuctionConfig, GenesisValidationError> {
        self.validate()?;
        AuctionConfig::from_durations(
            self.beneficiary,
            created_at,
            self.bidding_duration_secs,
            self.reveal_duration_secs,
        )
        .ok_or(GenesisValidationError::DeadlineOverflow)
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Beneficiary must be set")]
    MissingBeneficiary,

    #[error("Invalid timing configuration: {0}")]
    InvalidTiming(String),

    #[error("Deadlines overflow the timestamp range")]
    DeadlineOverflow,
}
