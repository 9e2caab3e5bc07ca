//! End-to-end properties of the ledger under sequential and concurrent load.

use std::time::Duration;

use coinshop_ledger::{Ledger, LedgerConfig, LedgerError};
use coinshop_shared::constants::SEED_CATALOG;
use coinshop_shared::{AccountId, Coins};
use futures::future::join_all;
use tempfile::TempDir;

struct Shop {
    _dir: TempDir,
    ledger: Ledger,
}

fn shop_with(configure: impl FnOnce(&mut LedgerConfig)) -> Shop {
    let dir = tempfile::tempdir().unwrap();
    let mut config = LedgerConfig {
        database_path: dir.path().join("shop.db"),
        busy_timeout: Duration::from_secs(30),
        ..LedgerConfig::default()
    };
    configure(&mut config);

    let ledger = Ledger::open(&config).unwrap();
    ledger
        .store()
        .connect()
        .unwrap()
        .seed_catalog(&SEED_CATALOG)
        .unwrap();
    Shop { _dir: dir, ledger }
}

fn shop() -> Shop {
    shop_with(|_| {})
}

/// Balances, inventory rows and entry count: everything a failed operation
/// must leave untouched.
#[derive(Debug, PartialEq, Eq)]
struct Snapshot {
    balances: Vec<Coins>,
    inventories: Vec<Vec<(String, i64)>>,
    entries: i64,
}

fn snapshot(ledger: &Ledger, accounts: &[AccountId]) -> Snapshot {
    let db = ledger.store().connect().unwrap();
    Snapshot {
        balances: accounts.iter().map(|&a| db.balance(a).unwrap()).collect(),
        inventories: accounts
            .iter()
            .map(|&a| {
                db.inventory(a)
                    .unwrap()
                    .into_iter()
                    .map(|owned| (owned.name, owned.quantity))
                    .collect()
            })
            .collect(),
        entries: db.entry_count().unwrap(),
    }
}

fn total_coins(ledger: &Ledger, accounts: &[AccountId]) -> Coins {
    let db = ledger.store().connect().unwrap();
    accounts.iter().map(|&a| db.balance(a).unwrap()).sum()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_buying_the_pink_hoody() {
    let shop = shop();
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();
    assert_eq!(alice.balance, 1000);

    shop.ledger.purchase(alice.id, "pink-hoody").await.unwrap();

    let summary = shop.ledger.account_summary(alice.id).await.unwrap();
    assert_eq!(summary.coins, 500);
    assert_eq!(summary.inventory.len(), 1);
    assert_eq!(summary.inventory[0].item, "pink-hoody");
    assert_eq!(summary.inventory[0].quantity, 1);
}

#[tokio::test]
async fn test_purchase_beyond_balance_leaves_no_ownership() {
    let shop = shop_with(|c| c.starting_balance = 400);
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();

    let err = shop.ledger.purchase(alice.id, "pink-hoody").await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds {
            balance: 400,
            required: 500
        }
    ));

    let db = shop.ledger.store().connect().unwrap();
    assert_eq!(db.balance(alice.id).unwrap(), 400);
    let hoody = db.item_by_name("pink-hoody").unwrap().unwrap();
    assert!(!db.owns_item(alice.id, hoody.id).unwrap());
}

#[tokio::test]
async fn test_repeat_purchase_increments_quantity() {
    let shop = shop();
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();

    shop.ledger.purchase(alice.id, "cup").await.unwrap();
    shop.ledger.purchase(alice.id, "cup").await.unwrap();

    let summary = shop.ledger.account_summary(alice.id).await.unwrap();
    assert_eq!(summary.coins, 960);
    assert_eq!(summary.inventory.len(), 1);
    assert_eq!(summary.inventory[0].quantity, 2);
}

#[tokio::test]
async fn test_transfer_to_unknown_handle_changes_nothing() {
    let shop = shop();
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();
    let before = snapshot(&shop.ledger, &[alice.id]);

    let err = shop.ledger.transfer(alice.id, "ghost", 100).await.unwrap_err();
    assert!(matches!(err, LedgerError::ReceiverNotFound(ref h) if h == "ghost"));
    assert!(err.is_rejection());

    assert_eq!(snapshot(&shop.ledger, &[alice.id]), before);
}

// ---------------------------------------------------------------------------
// Atomicity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failed_operations_leave_state_untouched() {
    let shop = shop_with(|c| c.starting_balance = 100);
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();
    let bob = shop.ledger.open_account("bob", "pw").await.unwrap();
    shop.ledger.purchase(alice.id, "cup").await.unwrap();
    shop.ledger.transfer(alice.id, "bob", 30).await.unwrap();

    let accounts = [alice.id, bob.id];
    let before = snapshot(&shop.ledger, &accounts);

    let failures = [
        shop.ledger.purchase(alice.id, "hoody").await,
        shop.ledger.purchase(alice.id, "yacht").await,
        shop.ledger.transfer(alice.id, "bob", 51).await,
        shop.ledger.transfer(alice.id, "alice", 1).await,
        shop.ledger.transfer(alice.id, "nobody", 1).await,
        shop.ledger.transfer(alice.id, "bob", 0).await,
    ];
    for result in failures {
        let err = result.unwrap_err();
        assert!(err.is_rejection(), "unexpected fault: {err}");
    }

    assert_eq!(snapshot(&shop.ledger, &accounts), before);
}

#[tokio::test]
async fn test_purchase_fault_after_debit_rolls_back() {
    let shop = shop();
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();
    shop.ledger
        .store()
        .connect()
        .unwrap()
        .conn()
        .execute("DROP TABLE ownership", [])
        .unwrap();

    // The item and account resolve and the debit runs; the ownership
    // upsert is the step that fails.
    let err = shop.ledger.purchase(alice.id, "cup").await.unwrap_err();
    assert!(matches!(err, LedgerError::Store(_)));
    assert!(!err.is_rejection());

    let db = shop.ledger.store().connect().unwrap();
    assert_eq!(db.balance(alice.id).unwrap(), 1000);
    assert_eq!(db.entry_count().unwrap(), 0);
}

#[tokio::test]
async fn test_credit_past_largest_balance_is_refused() {
    let shop = shop_with(|c| c.starting_balance = Coins::MAX);
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();
    let bob = shop.ledger.open_account("bob", "pw").await.unwrap();
    let before = snapshot(&shop.ledger, &[alice.id, bob.id]);

    let err = shop.ledger.transfer(alice.id, "bob", 1).await.unwrap_err();
    assert!(matches!(err, LedgerError::ReceiverBalanceFull(ref h) if h == "bob"));
    assert!(err.is_rejection());

    assert_eq!(snapshot(&shop.ledger, &[alice.id, bob.id]), before);
    let summary = shop.ledger.account_summary(bob.id).await.unwrap();
    assert_eq!(summary.coins, Coins::MAX);
}

#[tokio::test]
async fn test_transfer_of_exact_balance_empties_sender() {
    let shop = shop_with(|c| c.starting_balance = 75);
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();
    let bob = shop.ledger.open_account("bob", "pw").await.unwrap();

    shop.ledger.transfer(alice.id, "bob", 75).await.unwrap();

    let db = shop.ledger.store().connect().unwrap();
    assert_eq!(db.balance(alice.id).unwrap(), 0);
    assert_eq!(db.balance(bob.id).unwrap(), 150);
    assert_eq!(db.entry_count().unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_transfers_are_all_applied() {
    const N: Coins = 60;
    let shop = shop_with(|c| c.max_in_flight = N as usize);
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();
    let bob = shop.ledger.open_account("bob", "pw").await.unwrap();

    let results = join_all((0..N).map(|_| {
        let ledger = shop.ledger.clone();
        tokio::spawn(async move { ledger.transfer(alice.id, "bob", 1).await })
    }))
    .await;
    for result in results {
        result.unwrap().unwrap();
    }

    let db = shop.ledger.store().connect().unwrap();
    assert_eq!(db.balance(alice.id).unwrap(), 1000 - N);
    assert_eq!(db.balance(bob.id).unwrap(), 1000 + N);
    assert_eq!(db.entry_count().unwrap(), N as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_overdraw_attempts_never_go_negative() {
    let shop = shop_with(|c| c.starting_balance = 100);
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();
    let bob = shop.ledger.open_account("bob", "pw").await.unwrap();

    // 40 transfers of 10 against a balance of 100: exactly 10 can succeed.
    let results = join_all((0..40).map(|_| {
        let ledger = shop.ledger.clone();
        tokio::spawn(async move { ledger.transfer(alice.id, "bob", 10).await })
    }))
    .await;

    let mut committed = 0;
    for result in results {
        match result.unwrap() {
            Ok(()) => committed += 1,
            Err(LedgerError::InsufficientFunds { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(committed, 10);

    let db = shop.ledger.store().connect().unwrap();
    assert_eq!(db.balance(alice.id).unwrap(), 0);
    assert_eq!(db.balance(bob.id).unwrap(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_admission_never_exceeds_limit() {
    const LIMIT: usize = 3;
    let shop = shop_with(|c| c.max_in_flight = LIMIT);
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();

    let results = join_all((0..LIMIT * 10).map(|_| {
        let ledger = shop.ledger.clone();
        tokio::spawn(async move { ledger.purchase(alice.id, "pen").await })
    }))
    .await;
    for result in results {
        result.unwrap().unwrap();
    }

    let gate = shop.ledger.gate();
    assert!(gate.peak_in_flight() <= LIMIT);
    assert!(gate.peak_in_flight() >= 1);
    assert_eq!(gate.in_flight(), 0);

    let summary = shop.ledger.account_summary(alice.id).await.unwrap();
    assert_eq!(summary.coins, 1000 - 10 * (LIMIT as Coins) * 10);
    assert_eq!(summary.inventory[0].quantity, (LIMIT * 10) as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_mixed_traffic_conserves_coins() {
    let shop = shop_with(|c| c.max_in_flight = 8);
    let handles = ["alice", "bob", "carol", "dave"];
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(shop.ledger.open_account(handle, "pw").await.unwrap().id);
    }
    let before = total_coins(&shop.ledger, &ids);

    let tasks = (0..80).map(|i| {
        let ledger = shop.ledger.clone();
        let sender = ids[i % ids.len()];
        let receiver = handles[(i + 1) % handles.len()];
        tokio::spawn(async move {
            let amount = (i as Coins % 7) * 40 + 1;
            ledger.transfer(sender, receiver, amount).await
        })
    });
    for result in join_all(tasks).await {
        match result.unwrap() {
            Ok(()) | Err(LedgerError::InsufficientFunds { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(total_coins(&shop.ledger, &ids), before);
    let db = shop.ledger.store().connect().unwrap();
    for &id in &ids {
        assert!(db.balance(id).unwrap() >= 0);
    }
}

#[tokio::test]
async fn test_acquire_timeout_reports_busy() {
    let shop = shop_with(|c| {
        c.max_in_flight = 1;
        c.acquire_timeout = Some(Duration::from_millis(20));
    });
    let alice = shop.ledger.open_account("alice", "pw").await.unwrap();

    let held = shop.ledger.gate().acquire().await.unwrap();
    let err = shop.ledger.purchase(alice.id, "pen").await.unwrap_err();
    assert!(matches!(err, LedgerError::Busy(_)));
    assert!(!err.is_rejection());
    drop(held);

    shop.ledger.purchase(alice.id, "pen").await.unwrap();
}
