use crate::types::Coins;

/// Balance credited to an account when it is first created
pub const DEFAULT_STARTING_BALANCE: Coins = 1000;

/// Default number of ledger operations allowed in flight at once
pub const DEFAULT_MAX_IN_FLIGHT: usize = 50;

/// Default SQLite busy timeout in milliseconds
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Database file name inside the data directory
pub const DATABASE_FILE_NAME: &str = "coinshop.db";

/// Merchandise available in a freshly provisioned shop (name, price).
pub const SEED_CATALOG: [(&str, Coins); 10] = [
    ("t-shirt", 80),
    ("cup", 20),
    ("book", 50),
    ("pen", 10),
    ("powerbank", 200),
    ("hoody", 300),
    ("umbrella", 200),
    ("socks", 10),
    ("wallet", 50),
    ("pink-hoody", 500),
];
