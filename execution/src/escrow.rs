use commonware_cryptography::ed25519::PublicKey;
use thiserror::Error as ThisError;

#[cfg(any(test, feature = "mocks"))]
use std::collections::BTreeMap;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum TransferError {
    #[error("transfer of {amount} to recipient rejected")]
    Rejected { amount: u64 },
    #[error("vault holds {held}, cannot transfer {amount}")]
    InsufficientHoldings { held: u64, amount: u64 },
}

/// The funds/escrow primitive (out of scope for this crate).
///
/// `transfer` is fallible; callers must not decrement their own bookkeeping
/// unless it reports success, or accounting diverges from actual holdings.
pub trait Escrow {
    fn receive(&mut self, from: &PublicKey, amount: u64);
    fn transfer(&mut self, to: &PublicKey, amount: u64) -> Result<(), TransferError>;
    fn balance(&self) -> u64;
}

/// In-memory vault with per-recipient payout tracking and transfer-failure
/// injection for teardown tests.
#[cfg(any(test, feature = "mocks"))]
#[derive(Default)]
pub struct MockVault {
    held: u64,
    paid: BTreeMap<PublicKey, u64>,
    /// Recipients whose transfers are forced to fail.
    reject: Vec<PublicKey>,
}

#[cfg(any(test, feature = "mocks"))]
impl MockVault {
    pub fn paid_to(&self, recipient: &PublicKey) -> u64 {
        self.paid.get(recipient).copied().unwrap_or(0)
    }

    pub fn reject_transfers_to(&mut self, recipient: PublicKey) {
        self.reject.push(recipient);
    }

    pub fn allow_transfers_to(&mut self, recipient: &PublicKey) {
        self.reject.retain(|r| r != recipient);
    }

    /// Seed holdings that are not attached to any session pot.
    pub fn fund(&mut self, amount: u64) {
        self.held = self.held.saturating_add(amount);
    }
}

#[cfg(any(test, feature = "mocks"))]
impl Escrow for MockVault {
    fn receive(&mut self, _from: &PublicKey, amount: u64) {
        self.held = self.held.saturating_add(amount);
    }

    fn transfer(&mut self, to: &PublicKey, amount: u64) -> Result<(), TransferError> {
        if self.reject.contains(to) {
            return Err(TransferError::Rejected { amount });
        }
        if amount > self.held {
            return Err(TransferError::InsufficientHoldings {
                held: self.held,
                amount,
            });
        }
        self.held -= amount;
        *self.paid.entry(to.clone()).or_default() += amount;
        Ok(())
    }

    fn balance(&self) -> u64 {
        self.held
    }
}
