//! # coinshop-ledger
//!
//! Provisioning entry point for the coin shop ledger.
//!
//! Opens (and migrates) the configured database, seeds the default
//! merchandise when asked to, and reports what the ledger would serve.
//! Request dispatch lives in front of the library, not here.

use anyhow::Context;
use coinshop_ledger::{Ledger, LedgerConfig};
use coinshop_shared::constants::SEED_CATALOG;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,coinshop_ledger=debug")),
        )
        .init();

    info!("Starting coinshop ledger v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = LedgerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the store
    // -----------------------------------------------------------------------
    let ledger = Ledger::open(&config).with_context(|| {
        format!("opening ledger database at {}", config.database_path.display())
    })?;

    if config.seed_catalog {
        let store = ledger.store().clone();
        let inserted = tokio::task::spawn_blocking(move || {
            let mut db = store.connect()?;
            db.seed_catalog(&SEED_CATALOG)
        })
        .await
        .context("seeding task panicked")??;
        info!(inserted, "Catalog seeded");
    }

    // -----------------------------------------------------------------------
    // 4. Report
    // -----------------------------------------------------------------------
    let catalog = ledger.catalog().await?;
    for item in &catalog {
        info!(name = %item.name, price = item.price, "Catalog item");
    }
    info!(
        path = %ledger.store().path().display(),
        items = catalog.len(),
        max_in_flight = ledger.gate().limit(),
        "Ledger ready"
    );

    Ok(())
}
