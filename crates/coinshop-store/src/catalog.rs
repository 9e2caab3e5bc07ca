//! Catalog reference data and per-account holdings.

use coinshop_shared::{AccountId, Coins, ItemId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{CatalogItem, OwnedItem};

impl Database {
    /// Insert catalog items that do not exist yet.  Existing names keep
    /// their price.  Returns how many items were added.
    pub fn seed_catalog(&mut self, items: &[(&str, Coins)]) -> Result<usize> {
        let tx = self.conn_mut().transaction()?;

        let mut inserted = 0;
        for &(name, price) in items {
            inserted += tx.execute(
                "INSERT OR IGNORE INTO items (name, price) VALUES (?1, ?2)",
                params![name, price],
            )?;
        }

        tx.commit()?;
        if inserted > 0 {
            tracing::info!(inserted, "catalog seeded");
        }
        Ok(inserted)
    }

    pub fn item_by_name(&self, name: &str) -> Result<Option<CatalogItem>> {
        find_by_name(self.conn(), name)
    }

    /// List every catalog item, ordered by name.
    pub fn list_items(&self) -> Result<Vec<CatalogItem>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name, price FROM items ORDER BY name ASC")?;
        let rows = stmt.query_map([], row_to_item)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Items owned by an account joined with catalog metadata, ordered by
    /// item name.  Empty when the account owns nothing (or does not exist).
    pub fn inventory(&self, account: AccountId) -> Result<Vec<OwnedItem>> {
        inventory_of(self.conn(), account)
    }

    pub fn owns_item(&self, account: AccountId, item: ItemId) -> Result<bool> {
        let exists = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM ownership WHERE account_id = ?1 AND item_id = ?2)",
            params![account.get(), item.get()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn find_by_name(conn: &Connection, name: &str) -> Result<Option<CatalogItem>> {
    Ok(conn
        .query_row(
            "SELECT id, name, price FROM items WHERE name = ?1",
            params![name],
            row_to_item,
        )
        .optional()?)
}

pub(crate) fn inventory_of(conn: &Connection, account: AccountId) -> Result<Vec<OwnedItem>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.name, i.price, o.quantity
         FROM ownership o
         JOIN items i ON i.id = o.item_id
         WHERE o.account_id = ?1
         ORDER BY i.name ASC",
    )?;

    let rows = stmt.query_map(params![account.get()], |row| {
        Ok(OwnedItem {
            item_id: ItemId(row.get(0)?),
            name: row.get(1)?,
            price: row.get(2)?,
            quantity: row.get(3)?,
        })
    })?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogItem> {
    Ok(CatalogItem {
        id: ItemId(row.get(0)?),
        name: row.get(1)?,
        price: row.get(2)?,
    })
}
