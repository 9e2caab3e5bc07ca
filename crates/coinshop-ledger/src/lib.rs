//! # coinshop-ledger
//!
//! Admission-controlled ledger for the coin shop.
//!
//! Callers hand in an already authenticated [`AccountId`] and get back
//! either success or a typed [`LedgerError`].  Every operation runs as one
//! unit of work against the SQLite store, and at most
//! [`LedgerConfig::max_in_flight`] operations execute at once.
//!
//! [`AccountId`]: coinshop_shared::AccountId

pub mod config;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod summary;

pub use config::LedgerConfig;
pub use error::LedgerError;
pub use gate::{AdmissionError, AdmissionGate, AdmissionPermit};
pub use ledger::Ledger;
pub use summary::AccountSummary;
