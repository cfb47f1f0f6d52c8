//! Local storage for prepared bids.
//!
//! Secrets never leave the bidder's machine until the reveal window opens, so
//! the CLI keeps every prepared bid in a JSON file keyed by bidder address.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use auction_types::{format_address, Address};

use crate::bid::PreparedBid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Bid store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed bid store: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    bids: BTreeMap<String, Vec<PreparedBid>>,
}

/// Prepared bids per bidder, persisted as JSON.
#[derive(Debug)]
pub struct BidStore {
    path: PathBuf,
    file: StoreFile,
}

impl BidStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bids of `bidder` in submission order.
    pub fn bids(&self, bidder: &Address) -> &[PreparedBid] {
        self.file
            .bids
            .get(&format_address(bidder))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Append a bid that the chain accepted.
    pub fn push(&mut self, bidder: &Address, bid: PreparedBid) {
        self.file
            .bids
            .entry(format_address(bidder))
            .or_default()
            .push(bid);
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(&self.file)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bid::BidBuilder;
    use auction_crypto::Sha256Hasher;
    use rand::rngs::OsRng;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("auction-bids-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let store = BidStore::open(temp_path("missing")).unwrap();
        assert!(store.bids(&[1u8; 32]).is_empty());
    }

    #[test]
    fn test_save_and_reopen() {
        let path = temp_path("reopen");
        let alice = [1u8; 32];
        let bid = BidBuilder::new(u128::MAX)
            .secret("abc")
            .build(&Sha256Hasher, &mut OsRng)
            .unwrap();

        let mut store = BidStore::open(&path).unwrap();
        store.push(&alice, bid.clone());
        store.save().unwrap();

        let reopened = BidStore::open(&path).unwrap();
        assert_eq!(reopened.bids(&alice), &[bid]);
        assert!(reopened.bids(&[2u8; 32]).is_empty());

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_malformed_file() {
        let path = temp_path("malformed");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(BidStore::open(&path), Err(StoreError::Json(_))));
        fs::remove_file(path).unwrap();
    }
}
