use std::time::Duration;

use coinshop_shared::{AccountId, Coins};
use coinshop_store::StoreError;
use thiserror::Error;

use crate::gate::AdmissionError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Coins, required: Coins },

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Receiver not found: {0}")]
    ReceiverNotFound(String),

    #[error("Cannot transfer coins to yourself")]
    SelfTransfer,

    #[error("Invalid amount: {0} (must be positive)")]
    InvalidAmount(Coins),

    #[error("Receiver {0} cannot hold any more coins")]
    ReceiverBalanceFull(String),

    #[error("Invalid credentials for {0:?}")]
    InvalidCredentials(String),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("No admission slot within {0:?}")]
    Busy(Duration),

    #[error("Ledger is shutting down")]
    Closed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AdmissionError> for LedgerError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::TimedOut(deadline) => LedgerError::Busy(deadline),
            AdmissionError::Closed => LedgerError::Closed,
        }
    }
}

impl LedgerError {
    /// `true` for expected business outcomes the caller should report as a
    /// rejected operation; `false` for faults an operator should see.
    ///
    /// `AccountNotFound` counts as a fault: callers hand in authenticated
    /// ids, so a missing account means the store and the dispatcher
    /// disagree.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientFunds { .. }
                | LedgerError::ItemNotFound(_)
                | LedgerError::ReceiverNotFound(_)
                | LedgerError::SelfTransfer
                | LedgerError::InvalidAmount(_)
                | LedgerError::ReceiverBalanceFull(_)
                | LedgerError::InvalidCredentials(_)
        )
    }
}
