//! # coinshop-shared
//!
//! Identifiers and constants shared by the store and the ledger crates.

pub mod constants;
pub mod types;

pub use types::{AccountId, Coins, EntryId, ItemId};
