//! v001 -- Initial schema creation.
//!
//! Creates the four ledger tables: `accounts`, `items`, `ownership`, and
//! `ledger_entries`.  The non-negative balance rule is enforced by the
//! schema as well as by the conditional debit in the unit of work.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Accounts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS accounts (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    handle     TEXT NOT NULL UNIQUE,               -- immutable display handle
    secret     TEXT NOT NULL,                      -- compared verbatim
    balance    INTEGER NOT NULL CHECK (balance >= 0),
    created_at TEXT NOT NULL                       -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Catalog items (seed data)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS items (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE,
    price INTEGER NOT NULL CHECK (price >= 0)
);

-- ----------------------------------------------------------------
-- Ownership (account, item) -> quantity
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ownership (
    account_id INTEGER NOT NULL,
    item_id    INTEGER NOT NULL,
    quantity   INTEGER NOT NULL CHECK (quantity >= 1),

    PRIMARY KEY (account_id, item_id),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (item_id) REFERENCES items(id)
);

-- ----------------------------------------------------------------
-- Ledger entries (append-only transfer log)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ledger_entries (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,  -- never reused, defines order
    sender_id   INTEGER NOT NULL,
    receiver_id INTEGER NOT NULL,
    amount      INTEGER NOT NULL CHECK (amount > 0),
    created_at  TEXT NOT NULL,

    CHECK (sender_id <> receiver_id),
    FOREIGN KEY (sender_id) REFERENCES accounts(id),
    FOREIGN KEY (receiver_id) REFERENCES accounts(id)
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
