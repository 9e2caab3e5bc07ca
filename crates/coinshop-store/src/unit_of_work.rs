//! Scoped read/modify/write primitives for one ledger unit of work.
//!
//! A [`UnitOfWork`] only exists inside
//! [`Database::unit_of_work`](crate::Database::unit_of_work), which decides
//! whether it commits or aborts.  Balance mutations are relative adjustments
//! executed by SQLite, never a write-back of a value computed earlier.

use chrono::Utc;
use coinshop_shared::{AccountId, Coins, EntryId, ItemId};
use rusqlite::{params, Connection, Transaction};

use crate::accounts;
use crate::catalog;
use crate::error::{Result, StoreError};
use crate::models::{Account, CatalogItem};

pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> UnitOfWork<'conn> {
    pub(crate) fn new(tx: Transaction<'conn>) -> Self {
        Self { tx }
    }

    pub(crate) fn commit(self) -> Result<()> {
        self.tx.commit().map_err(StoreError::from)
    }

    pub(crate) fn abort(self) {
        if let Err(e) = self.tx.rollback() {
            // Dropping the connection discards the transaction anyway.
            tracing::warn!(error = %e, "rollback failed");
        }
    }

    /// Raw access for provisioning code and tests.
    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn account(&self, id: AccountId) -> Result<Option<Account>> {
        accounts::find_by_id(&self.tx, id)
    }

    pub fn account_by_handle(&self, handle: &str) -> Result<Option<Account>> {
        accounts::find_by_handle(&self.tx, handle)
    }

    pub fn item_by_name(&self, name: &str) -> Result<Option<CatalogItem>> {
        catalog::find_by_name(&self.tx, name)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Decrement a balance by `amount` if, and only if, it stays
    /// non-negative.  Returns `false` when the account lacks funds (or does
    /// not exist); nothing is written in that case.
    pub fn debit(&self, id: AccountId, amount: Coins) -> Result<bool> {
        let affected = self.tx.execute(
            "UPDATE accounts SET balance = balance - ?1
             WHERE id = ?2 AND balance >= ?1",
            params![amount, id.get()],
        )?;
        Ok(affected == 1)
    }

    /// Increment a balance by `amount` (positive).
    ///
    /// Fails with [`StoreError::BalanceOverflow`] instead of letting SQLite
    /// promote the sum to a REAL, and with [`StoreError::NotFound`] when
    /// the account does not exist.
    pub fn credit(&self, id: AccountId, amount: Coins) -> Result<()> {
        let affected = self.tx.execute(
            "UPDATE accounts SET balance = balance + ?1
             WHERE id = ?2 AND balance <= ?3 - ?1",
            params![amount, id.get(), Coins::MAX],
        )?;
        if affected == 1 {
            return Ok(());
        }
        match accounts::find_by_id(&self.tx, id)? {
            Some(_) => Err(StoreError::BalanceOverflow(id)),
            None => Err(StoreError::NotFound),
        }
    }

    /// Record one more unit of `item` for `account`, creating the ownership
    /// row on first purchase.  Returns the new quantity.
    pub fn increment_ownership(&self, account: AccountId, item: ItemId) -> Result<i64> {
        let quantity = self.tx.query_row(
            "INSERT INTO ownership (account_id, item_id, quantity)
             VALUES (?1, ?2, 1)
             ON CONFLICT (account_id, item_id)
             DO UPDATE SET quantity = ownership.quantity + 1
             RETURNING quantity",
            params![account.get(), item.get()],
            |row| row.get(0),
        )?;
        Ok(quantity)
    }

    /// Append a transfer to the ledger log.
    pub fn append_entry(
        &self,
        sender: AccountId,
        receiver: AccountId,
        amount: Coins,
    ) -> Result<EntryId> {
        self.tx.execute(
            "INSERT INTO ledger_entries (sender_id, receiver_id, amount, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![sender.get(), receiver.get(), amount, Utc::now().to_rfc3339()],
        )?;
        Ok(EntryId(self.tx.last_insert_rowid()))
    }
}
