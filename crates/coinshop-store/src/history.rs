//! Reads over the append-only transfer log.

use chrono::{DateTime, Utc};
use coinshop_shared::{AccountId, EntryId};
use rusqlite::{params, Connection, TransactionBehavior};

use crate::accounts;
use crate::catalog;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{AccountStatement, LedgerEntry, TransferRecord};

impl Database {
    /// Every transfer the account sent or received, most recent first.
    pub fn history(&self, account: AccountId) -> Result<Vec<TransferRecord>> {
        history_of(self.conn(), account)
    }

    /// Number of entries in the whole log.
    pub fn entry_count(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM ledger_entries", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Balance, inventory and history of one account, all read inside the
    /// same read transaction so they describe a single committed state.
    pub fn statement(&mut self, account: AccountId) -> Result<AccountStatement> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Deferred)?;

        let owner = accounts::find_by_id(&tx, account)?.ok_or(StoreError::NotFound)?;
        let inventory = catalog::inventory_of(&tx, account)?;
        let history = history_of(&tx, account)?;

        tx.finish()?;
        Ok(AccountStatement {
            account: owner,
            inventory,
            history,
        })
    }
}

fn history_of(conn: &Connection, account: AccountId) -> Result<Vec<TransferRecord>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.sender_id, s.handle, e.receiver_id, r.handle, e.amount, e.created_at
         FROM ledger_entries e
         JOIN accounts s ON s.id = e.sender_id
         JOIN accounts r ON r.id = e.receiver_id
         WHERE e.sender_id = ?1 OR e.receiver_id = ?1
         ORDER BY e.id DESC",
    )?;

    let rows = stmt.query_map(params![account.get()], row_to_record)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TransferRecord> {
    let id: i64 = row.get(0)?;
    let sender: i64 = row.get(1)?;
    let sender_handle: String = row.get(2)?;
    let receiver: i64 = row.get(3)?;
    let receiver_handle: String = row.get(4)?;
    let amount: i64 = row.get(5)?;
    let ts_str: String = row.get(6)?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(TransferRecord {
        entry: LedgerEntry {
            id: EntryId(id),
            sender: AccountId(sender),
            receiver: AccountId(receiver),
            amount,
            created_at,
        },
        sender_handle,
        receiver_handle,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::database::Store;

    #[test]
    fn history_is_two_sided_and_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("ledger.db"), Duration::from_secs(1)).unwrap();
        let mut db = store.connect().unwrap();
        let alice = db.open_account("alice", "pw", 100).unwrap();
        let bob = db.open_account("bob", "pw", 100).unwrap();
        let carol = db.open_account("carol", "pw", 100).unwrap();

        db.unit_of_work(|uow| {
            uow.append_entry(alice.id, bob.id, 10)?;
            uow.append_entry(bob.id, alice.id, 3)?;
            uow.append_entry(bob.id, carol.id, 7)
        })
        .unwrap();

        let history = db.history(alice.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender_handle, "bob");
        assert_eq!(history[0].entry.amount, 3);
        assert_eq!(history[1].receiver_handle, "bob");
        assert!(history[0].entry.id > history[1].entry.id);

        assert_eq!(db.history(carol.id).unwrap().len(), 1);
        assert_eq!(db.entry_count().unwrap(), 3);
    }

    #[test]
    fn statement_of_unknown_account_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("ledger.db"), Duration::from_secs(1)).unwrap();
        let mut db = store.connect().unwrap();

        assert!(matches!(db.statement(AccountId(1)), Err(StoreError::NotFound)));

        let dave = db.open_account("dave", "pw", 9).unwrap();
        let statement = db.statement(dave.id).unwrap();
        assert_eq!(statement.account.balance, 9);
        assert!(statement.inventory.is_empty());
        assert!(statement.history.is_empty());
    }
}
