//! Bid preparation and reveal batching.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use auction_crypto::{generate_secret, CommitmentHasher};
use auction_module::AuctionCall;
use auction_types::{Amount, BidReveal, Commitment, WEI_PER_ETHER};

/// Errors that can occur during bid creation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BidError {
    #[error("Bid value {value} exceeds deposit {deposit}; it could never win")]
    Underfunded { value: Amount, deposit: Amount },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Secret must be valid UTF-8")]
    InvalidSecret,
}

/// A prepared bid ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedBid {
    /// Digest published while bidding is open
    pub commitment: Commitment,
    /// Value escrowed with the commitment
    pub deposit: Amount,
    /// Bid value (keep secret until the reveal window)
    pub value: Amount,
    pub fake: bool,
    /// Blinding secret (keep secret until the reveal window)
    pub secret: String,
}

impl PreparedBid {
    /// What the bidder discloses for this bid during the reveal window.
    pub fn disclosure(&self) -> BidReveal {
        BidReveal {
            value: self.value,
            fake: self.fake,
            secret: self.secret.as_bytes().to_vec(),
        }
    }
}

/// Create a bid with a freshly generated secret.
///
/// Real bids must be covered by their deposit. Fake bids may carry any value:
/// they only exist to obscure how many real bids an account placed.
pub fn create_bid<H, R>(
    hasher: &H,
    value: Amount,
    fake: bool,
    deposit: Amount,
    rng: &mut R,
) -> Result<PreparedBid, BidError>
where
    H: CommitmentHasher + ?Sized,
    R: RngCore + CryptoRng,
{
    let secret = String::from_utf8(generate_secret(rng)).map_err(|_| BidError::InvalidSecret)?;
    prepare(hasher, value, fake, deposit, secret)
}

fn prepare<H: CommitmentHasher + ?Sized>(
    hasher: &H,
    value: Amount,
    fake: bool,
    deposit: Amount,
    secret: String,
) -> Result<PreparedBid, BidError> {
    if !fake && value > deposit {
        return Err(BidError::Underfunded { value, deposit });
    }
    Ok(PreparedBid {
        commitment: hasher.commit(value, fake, secret.as_bytes()),
        deposit,
        value,
        fake,
        secret,
    })
}

/// Builder for creating bids with additional options.
pub struct BidBuilder {
    value: Amount,
    fake: bool,
    deposit: Option<Amount>,
    secret: Option<String>,
}

impl BidBuilder {
    /// Create a new bid builder for `value`.
    pub fn new(value: Amount) -> Self {
        Self {
            value,
            fake: false,
            deposit: None,
            secret: None,
        }
    }

    /// Mark the bid fake.
    pub fn fake(mut self, fake: bool) -> Self {
        self.fake = fake;
        self
    }

    /// Escrow more than the value. Defaults to exactly the value.
    pub fn deposit(mut self, deposit: Amount) -> Self {
        self.deposit = Some(deposit);
        self
    }

    /// Use a chosen secret instead of a random one.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Build the prepared bid.
    pub fn build<H, R>(self, hasher: &H, rng: &mut R) -> Result<PreparedBid, BidError>
    where
        H: CommitmentHasher + ?Sized,
        R: RngCore + CryptoRng,
    {
        let deposit = self.deposit.unwrap_or(self.value);
        match self.secret {
            Some(secret) => prepare(hasher, self.value, self.fake, deposit, secret),
            None => create_bid(hasher, self.value, self.fake, deposit, rng),
        }
    }
}

/// Disclosures for every bid of one account, in bid order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealBatch {
    pub values: Vec<Amount>,
    pub fakes: Vec<bool>,
    pub secrets: Vec<Vec<u8>>,
}

impl RevealBatch {
    pub fn from_bids<'a>(bids: impl IntoIterator<Item = &'a PreparedBid>) -> Self {
        Self::from_reveals(bids.into_iter().map(PreparedBid::disclosure))
    }

    pub fn from_reveals(reveals: impl IntoIterator<Item = BidReveal>) -> Self {
        let mut batch = Self::default();
        for reveal in reveals {
            batch.values.push(reveal.value);
            batch.fakes.push(reveal.fake);
            batch.secrets.push(reveal.secret);
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_call(self) -> AuctionCall {
        AuctionCall::Reveal {
            values: self.values,
            fakes: self.fakes,
            secrets: self.secrets,
        }
    }
}

/// Parse an amount: plain wei (`"1500"`, `"1500wei"`) or ether with up to 18
/// decimals (`"1.5ether"`, `"2eth"`).
pub fn parse_amount(s: &str) -> Result<Amount, BidError> {
    let s = s.trim();
    let invalid = || BidError::InvalidAmount(s.to_string());

    let ether = s
        .strip_suffix("ether")
        .or_else(|| s.strip_suffix("eth"))
        .map(str::trim);
    let Some(ether) = ether else {
        let wei = s.strip_suffix("wei").unwrap_or(s).trim();
        return wei.parse().map_err(|_| invalid());
    };

    let (whole, frac) = ether.split_once('.').unwrap_or((ether, ""));
    if frac.len() > 18 || (whole.is_empty() && frac.is_empty()) {
        return Err(invalid());
    }
    let whole: Amount = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac_wei: Amount = if frac.is_empty() {
        0
    } else {
        let digits: Amount = frac.parse().map_err(|_| invalid())?;
        digits * 10u128.pow(18 - frac.len() as u32)
    };

    whole
        .checked_mul(WEI_PER_ETHER)
        .and_then(|w| w.checked_add(frac_wei))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_crypto::{Keccak256AbiHasher, Sha256Hasher};
    use rand::rngs::OsRng;
    use test_case::test_case;

    #[test]
    fn test_create_bid() {
        let bid = create_bid(&Keccak256AbiHasher, 1000, false, 1500, &mut OsRng).unwrap();
        assert_eq!(bid.value, 1000);
        assert_eq!(bid.deposit, 1500);
        assert_eq!(bid.secret.len(), 32);
        assert!(Keccak256AbiHasher.verify(&bid.commitment, 1000, false, bid.secret.as_bytes()));
    }

    #[test]
    fn test_underfunded_real_bid_rejected() {
        assert_eq!(
            create_bid(&Sha256Hasher, 10, false, 5, &mut OsRng),
            Err(BidError::Underfunded {
                value: 10,
                deposit: 5
            })
        );
        // Fake bids are not bound by their deposit
        assert!(create_bid(&Sha256Hasher, 10, true, 5, &mut OsRng).is_ok());
    }

    #[test]
    fn test_bid_builder() {
        let bid = BidBuilder::new(WEI_PER_ETHER)
            .fake(true)
            .secret("abc")
            .build(&Keccak256AbiHasher, &mut OsRng)
            .unwrap();

        assert_eq!(bid.deposit, WEI_PER_ETHER);
        assert_eq!(
            bid.commitment.to_string(),
            "0x864ec6bd5d4a57247ab287f1fe26a0d7090a2751ae1a0b94c9b45657e3dad82a"
        );
    }

    #[test]
    fn test_reveal_batch_keeps_bid_order() {
        let first = BidBuilder::new(1).secret("a").build(&Sha256Hasher, &mut OsRng).unwrap();
        let second = BidBuilder::new(2)
            .fake(true)
            .secret("b")
            .build(&Sha256Hasher, &mut OsRng)
            .unwrap();

        let batch = RevealBatch::from_bids([&first, &second]);
        assert_eq!(batch.len(), 2);
        assert_eq!(
            batch.into_call(),
            AuctionCall::Reveal {
                values: vec![1, 2],
                fakes: vec![false, true],
                secrets: vec![b"a".to_vec(), b"b".to_vec()],
            }
        );
    }

    #[test_case("1500" => Ok(1500); "plain wei")]
    #[test_case("1500wei" => Ok(1500); "wei suffix")]
    #[test_case("2ether" => Ok(2 * WEI_PER_ETHER); "whole ether")]
    #[test_case("1.5eth" => Ok(WEI_PER_ETHER + WEI_PER_ETHER / 2); "fractional ether")]
    #[test_case(".000000000000000001ether" => Ok(1); "one wei as ether")]
    #[test_case("0.0000000000000000001ether" => Err(BidError::InvalidAmount("0.0000000000000000001ether".into())); "too many decimals")]
    #[test_case("ether" => Err(BidError::InvalidAmount("ether".into())); "missing number")]
    #[test_case("-1" => Err(BidError::InvalidAmount("-1".into())); "negative")]
    fn test_parse_amount(input: &str) -> Result<Amount, BidError> {
        parse_amount(input)
    }
}
