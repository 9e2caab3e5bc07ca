//! Account lookups and provisioning.

use chrono::{DateTime, Utc};
use coinshop_shared::{AccountId, Coins};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use subtle::ConstantTimeEq;

use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::Account;

const ACCOUNT_COLUMNS: &str = "id, handle, balance, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Find the account registered under `handle`, or create it with
    /// `starting_balance` if the handle is unknown.
    ///
    /// An existing account is only returned when `secret` matches the one
    /// it was created with.  The comparison is verbatim (no hashing) but
    /// runs in constant time.
    pub fn open_account(
        &mut self,
        handle: &str,
        secret: &str,
        starting_balance: Coins,
    ) -> Result<Account> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored: Option<(i64, String)> = tx
            .query_row(
                "SELECT id, secret FROM accounts WHERE handle = ?1",
                params![handle],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let id = match stored {
            Some((id, stored_secret)) => {
                let matches: bool = stored_secret.as_bytes().ct_eq(secret.as_bytes()).into();
                if !matches {
                    return Err(StoreError::CredentialMismatch(handle.to_string()));
                }
                AccountId(id)
            }
            None => {
                tx.execute(
                    "INSERT INTO accounts (handle, secret, balance, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![handle, secret, starting_balance, Utc::now().to_rfc3339()],
                )?;
                let id = AccountId(tx.last_insert_rowid());
                tracing::info!(%id, handle, balance = starting_balance, "account created");
                id
            }
        };

        let account = find_by_id(&tx, id)?.ok_or(StoreError::NotFound)?;
        tx.commit()?;
        Ok(account)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single account by id.
    pub fn account(&self, id: AccountId) -> Result<Account> {
        find_by_id(self.conn(), id)?.ok_or(StoreError::NotFound)
    }

    /// Fetch a single account by handle, if it exists.
    pub fn account_by_handle(&self, handle: &str) -> Result<Option<Account>> {
        find_by_handle(self.conn(), handle)
    }

    /// Current balance of an account.
    pub fn balance(&self, id: AccountId) -> Result<Coins> {
        self.conn()
            .query_row(
                "SELECT balance FROM accounts WHERE id = ?1",
                params![id.get()],
                |row| row.get(0),
            )
            .map_err(not_found)
    }
}

// ---------------------------------------------------------------------------
// Helpers (shared with the unit of work)
// ---------------------------------------------------------------------------

pub(crate) fn find_by_id(conn: &Connection, id: AccountId) -> Result<Option<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id.get()], row_to_account)
        .optional()?)
}

pub(crate) fn find_by_handle(conn: &Connection, handle: &str) -> Result<Option<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE handle = ?1");
    Ok(conn
        .query_row(&sql, params![handle], row_to_account)
        .optional()?)
}

/// Map a `rusqlite::Row` to an [`Account`].
fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let id: i64 = row.get(0)?;
    let handle: String = row.get(1)?;
    let balance: Coins = row.get(2)?;
    let created_str: String = row.get(3)?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Account {
        id: AccountId(id),
        handle,
        balance,
        created_at,
    })
}
