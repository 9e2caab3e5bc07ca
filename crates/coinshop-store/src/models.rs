//! Domain model structs persisted in the ledger database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to whatever dispatcher sits in front of the ledger.  Account
//! secrets never leave the store and have no field here.

use chrono::{DateTime, Utc};
use coinshop_shared::{AccountId, Coins, EntryId, ItemId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A coin-holding account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Opaque numeric identity.
    pub id: AccountId,
    /// Unique display handle, immutable after creation.
    pub handle: String,
    /// Current balance; never negative at a commit point.
    pub balance: Coins,
    /// When the account was created (first authentication).
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Catalog item
// ---------------------------------------------------------------------------

/// Purchasable merchandise.  Reference data, never mutated by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: ItemId,
    /// Unique item name used to address the item in a purchase.
    pub name: String,
    /// Unit price in coins.
    pub price: Coins,
}

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

/// An item held by an account, joined with its catalog metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnedItem {
    pub item_id: ItemId,
    pub name: String,
    pub price: Coins,
    /// Number of units bought so far (at least 1).
    pub quantity: i64,
}

// ---------------------------------------------------------------------------
// Ledger entry
// ---------------------------------------------------------------------------

/// One committed coin transfer.  Entries are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub sender: AccountId,
    pub receiver: AccountId,
    pub amount: Coins,
    pub created_at: DateTime<Utc>,
}

/// A ledger entry joined with the handles of both parties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferRecord {
    pub entry: LedgerEntry,
    pub sender_handle: String,
    pub receiver_handle: String,
}

// ---------------------------------------------------------------------------
// Statement
// ---------------------------------------------------------------------------

/// Balance, holdings and transfer history of one account, read from a single
/// snapshot of the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountStatement {
    pub account: Account,
    /// Owned items ordered by item name.
    pub inventory: Vec<OwnedItem>,
    /// Transfers in either direction, most recent first.
    pub history: Vec<TransferRecord>,
}
