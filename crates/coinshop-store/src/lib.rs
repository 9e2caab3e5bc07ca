//! # coinshop-store
//!
//! Durable storage for the coin ledger, backed by SQLite.
//!
//! The crate holds account balances, the item catalog, ownership quantities
//! and the append-only transfer log.  Mutations go through
//! [`Database::unit_of_work`], which runs a closure against a
//! [`UnitOfWork`] inside one immediate transaction and commits only on
//! success.  Everything else is a plain typed read.

pub mod accounts;
pub mod catalog;
pub mod database;
pub mod history;
pub mod migrations;
pub mod models;
pub mod unit_of_work;

mod error;

pub use database::{Database, Store};
pub use error::{Result, StoreError};
pub use models::*;
pub use unit_of_work::UnitOfWork;
