//! Value transfer between accounts and the auction escrow.
//!
//! The engine never moves funds itself. It asks a [`Ledger`] to escrow deposits
//! and to pay refunds and the winning amount, and it applies fail-and-restore
//! semantics when the ledger reports a failure.

use std::collections::{HashMap, HashSet};

use auction_types::{format_address, Address, Amount};
use thiserror::Error;

/// Errors reported by a ledger transfer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Insufficient funds in {account}: need {needed}, have {available}")]
    InsufficientFunds {
        account: String,
        needed: Amount,
        available: Amount,
    },

    #[error("Insufficient escrow: need {needed}, have {available}")]
    InsufficientEscrow { needed: Amount, available: Amount },

    #[error("Transfer rejected: {0}")]
    Rejected(String),

    #[error("Balance overflow")]
    Overflow,
}

/// Moves value into and out of the engine's escrow.
///
/// Both calls are synchronous: success or failure is known before they return,
/// and a failed transfer must not have moved any value.
pub trait Ledger {
    /// Escrow `amount` from `from` into the engine.
    fn transfer_in(&mut self, from: &Address, amount: Amount) -> Result<(), LedgerError>;

    /// Pay `amount` from the engine's escrow to `to`.
    fn transfer_out(&mut self, to: &Address, amount: Amount) -> Result<(), LedgerError>;
}

/// Account balances plus the engine's escrow, held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: HashMap<Address, Amount>,
    escrow: Amount,
    rejected: HashSet<Address>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint funds into an account.
    pub fn credit(&mut self, account: Address, amount: Amount) -> Result<Amount, LedgerError> {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(*balance)
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Value currently held for the engine.
    pub fn escrow_balance(&self) -> Amount {
        self.escrow
    }

    /// Make every transfer touching `account` fail until allowed again.
    pub fn fail_transfers_to(&mut self, account: Address) {
        self.rejected.insert(account);
    }

    pub fn allow_transfers_to(&mut self, account: &Address) {
        self.rejected.remove(account);
    }

    fn check_allowed(&self, account: &Address) -> Result<(), LedgerError> {
        if self.rejected.contains(account) {
            return Err(LedgerError::Rejected(format!(
                "{} does not accept transfers",
                format_address(account)
            )));
        }
        Ok(())
    }
}

impl Ledger for InMemoryLedger {
    fn transfer_in(&mut self, from: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.check_allowed(from)?;

        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: format_address(from),
                needed: amount,
                available,
            });
        }
        let escrow = self.escrow.checked_add(amount).ok_or(LedgerError::Overflow)?;

        self.balances.insert(*from, available - amount);
        self.escrow = escrow;
        Ok(())
    }

    fn transfer_out(&mut self, to: &Address, amount: Amount) -> Result<(), LedgerError> {
        self.check_allowed(to)?;

        if self.escrow < amount {
            return Err(LedgerError::InsufficientEscrow {
                needed: amount,
                available: self.escrow,
            });
        }
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.escrow -= amount;
        self.balances.insert(*to, balance);
        Ok(())
    }
}
