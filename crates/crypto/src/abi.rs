//! Solidity ABI encoding of commitment preimages.
//!
//! Produces the same bytes as `abi.encode(uint256 value, bool fake, string secret)`,
//! so commitments built by Ethereum tooling (e.g. ethers' `defaultAbiCoder`) verify
//! against this engine unchanged.

use auction_types::Amount;

/// ABI word size in bytes.
pub const WORD: usize = 32;

/// Offset of the dynamic `string` tail: three head words.
const STRING_OFFSET: u64 = (3 * WORD) as u64;

/// Encode `(uint256, bool, string)` as a Solidity ABI tuple.
///
/// Layout: `value | fake | offset(0x60) | len(secret) | secret padded to 32 bytes`.
pub fn encode_commitment_preimage(value: Amount, fake: bool, secret: &[u8]) -> Vec<u8> {
    let padded = secret.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(4 * WORD + padded);

    out.extend_from_slice(&uint_word(value));
    out.extend_from_slice(&uint_word(fake as Amount));
    out.extend_from_slice(&uint_word(STRING_OFFSET as Amount));
    out.extend_from_slice(&uint_word(secret.len() as Amount));
    out.extend_from_slice(secret);
    out.resize(4 * WORD + padded, 0);

    out
}

/// Big-endian, left zero padded 32-byte word.
fn uint_word(value: Amount) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}
