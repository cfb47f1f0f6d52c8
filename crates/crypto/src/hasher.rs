//! Commitment hashers.
//!
//! A commitment binds a bidder to `(value, fake, secret)` during the bidding
//! window. The engine only ever recomputes and compares digests.

use std::fmt;
use std::str::FromStr;

use auction_types::{Amount, Commitment};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Keccak256};

use crate::abi::encode_commitment_preimage;
use crate::error::CryptoError;

/// Domain tag for SHA-256 commitments.
const SHA256_DOMAIN: &[u8] = b"BLIND_AUCTION_COMMIT_V1:";

/// Computes the commitment digest for disclosed bid parameters.
pub trait CommitmentHasher {
    fn commit(&self, value: Amount, fake: bool, secret: &[u8]) -> Commitment;

    /// Check a disclosure against a stored commitment.
    fn verify(&self, commitment: &Commitment, value: Amount, fake: bool, secret: &[u8]) -> bool {
        self.commit(value, fake, secret) == *commitment
    }
}

/// `keccak256(abi.encode(uint256, bool, string))`, Ethereum compatible.
#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256AbiHasher;

impl CommitmentHasher for Keccak256AbiHasher {
    fn commit(&self, value: Amount, fake: bool, secret: &[u8]) -> Commitment {
        let preimage = encode_commitment_preimage(value, fake, secret);
        Commitment(Keccak256::digest(&preimage).into())
    }
}

/// Domain-separated SHA-256 over a compact little-endian encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl CommitmentHasher for Sha256Hasher {
    fn commit(&self, value: Amount, fake: bool, secret: &[u8]) -> Commitment {
        let mut hasher = Sha256::new();
        hasher.update(SHA256_DOMAIN);
        hasher.update(value.to_le_bytes());
        hasher.update([fake as u8]);
        hasher.update((secret.len() as u32).to_le_bytes());
        hasher.update(secret);
        Commitment(hasher.finalize().into())
    }
}

/// Hasher selection for configuration files and CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HasherKind {
    #[default]
    Keccak256Abi,
    Sha256,
}

impl FromStr for HasherKind {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keccak256-abi" | "keccak" => Ok(HasherKind::Keccak256Abi),
            "sha256" => Ok(HasherKind::Sha256),
            other => Err(CryptoError::UnknownHasher(other.to_string())),
        }
    }
}

impl fmt::Display for HasherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HasherKind::Keccak256Abi => f.write_str("keccak256-abi"),
            HasherKind::Sha256 => f.write_str("sha256"),
        }
    }
}

/// Runtime-selected hasher.
#[derive(Debug, Clone, Copy)]
pub enum AnyHasher {
    Keccak256Abi(Keccak256AbiHasher),
    Sha256(Sha256Hasher),
}

impl From<HasherKind> for AnyHasher {
    fn from(kind: HasherKind) -> Self {
        match kind {
            HasherKind::Keccak256Abi => AnyHasher::Keccak256Abi(Keccak256AbiHasher),
            HasherKind::Sha256 => AnyHasher::Sha256(Sha256Hasher),
        }
    }
}

impl CommitmentHasher for AnyHasher {
    fn commit(&self, value: Amount, fake: bool, secret: &[u8]) -> Commitment {
        match self {
            AnyHasher::Keccak256Abi(h) => h.commit(value, fake, secret),
            AnyHasher::Sha256(h) => h.commit(value, fake, secret),
        }
    }
}

/// Generate a blinding secret: 16 random bytes, hex encoded.
///
/// Hex keeps the secret a valid UTF-8 `string` for the ABI encoding.
pub fn generate_secret<R: RngCore + CryptoRng>(rng: &mut R) -> Vec<u8> {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    hex::encode(bytes).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction_types::WEI_PER_ETHER;
    use rand::rngs::OsRng;
    use test_case::test_case;

    #[test]
    fn test_keccak_known_vectors() {
        let hasher = Keccak256AbiHasher;

        // keccak256(defaultAbiCoder.encode(["uint256","bool","string"], [1 ether, true, "abc"]))
        assert_eq!(
            hasher.commit(WEI_PER_ETHER, true, b"abc").to_string(),
            "0x864ec6bd5d4a57247ab287f1fe26a0d7090a2751ae1a0b94c9b45657e3dad82a"
        );
        assert_eq!(
            hasher.commit(2 * WEI_PER_ETHER, false, b"abc").to_string(),
            "0x864d660a5e6ef0821ed87bc88555ef0323605a9dc720ac831c513c10a7bcbc11"
        );
    }

    #[test_case(HasherKind::Keccak256Abi; "keccak")]
    #[test_case(HasherKind::Sha256; "sha256")]
    fn test_commitment_binds_every_field(kind: HasherKind) {
        let hasher = AnyHasher::from(kind);
        let base = hasher.commit(100, false, b"secret");

        assert_eq!(base, hasher.commit(100, false, b"secret"));
        assert_ne!(base, hasher.commit(101, false, b"secret"));
        assert_ne!(base, hasher.commit(100, true, b"secret"));
        assert_ne!(base, hasher.commit(100, false, b"secreT"));
        assert!(hasher.verify(&base, 100, false, b"secret"));
        assert!(!hasher.verify(&base, 100, true, b"secret"));
    }

    #[test]
    fn test_hashers_disagree() {
        assert_ne!(
            Keccak256AbiHasher.commit(1, false, b"x"),
            Sha256Hasher.commit(1, false, b"x")
        );
    }

    #[test]
    fn test_hasher_kind_parse() {
        assert_eq!("keccak256-abi".parse::<HasherKind>().unwrap(), HasherKind::Keccak256Abi);
        assert_eq!("sha256".parse::<HasherKind>().unwrap(), HasherKind::Sha256);
        assert!(matches!(
            "md5".parse::<HasherKind>(),
            Err(CryptoError::UnknownHasher(_))
        ));
        assert_eq!(HasherKind::Sha256.to_string().parse::<HasherKind>().unwrap(), HasherKind::Sha256);
    }

    #[test]
    fn test_generate_secret() {
        let mut rng = OsRng;
        let a = generate_secret(&mut rng);
        let b = generate_secret(&mut rng);

        assert_eq!(a.len(), 32);
        assert!(std::str::from_utf8(&a).is_ok());
        assert_ne!(a, b);
    }
}
