use rusqlite::Connection;

// History reads filter on either side of a transfer.
const UP_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_ledger_entries_sender
    ON ledger_entries(sender_id, id DESC);

CREATE INDEX IF NOT EXISTS idx_ledger_entries_receiver
    ON ledger_entries(receiver_id, id DESC);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
