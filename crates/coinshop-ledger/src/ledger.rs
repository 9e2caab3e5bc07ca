//! Purchase and transfer as all-or-nothing units of work.
//!
//! Every operation takes the caller's authenticated [`AccountId`], holds an
//! admission slot for its whole duration, and runs its reads and writes in
//! one [`UnitOfWork`] on the blocking pool.  Balance checks happen inside
//! the unit of work, never against a value read before it began.

use std::time::Duration;

use coinshop_shared::{AccountId, Coins, EntryId};
use coinshop_store::{Account, CatalogItem, Database, Store, StoreError, UnitOfWork};
use tracing::{debug, error, info};

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::gate::{AdmissionGate, AdmissionPermit};
use crate::summary::AccountSummary;

#[derive(Debug, Clone)]
pub struct Ledger {
    store: Store,
    gate: AdmissionGate,
    acquire_timeout: Option<Duration>,
    starting_balance: Coins,
}

impl Ledger {
    pub fn new(store: Store, gate: AdmissionGate, config: &LedgerConfig) -> Self {
        Self {
            store,
            gate,
            acquire_timeout: config.acquire_timeout,
            starting_balance: config.starting_balance,
        }
    }

    /// Open the configured database and build a ledger with a fresh gate.
    pub fn open(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let store = Store::open(&config.database_path, config.busy_timeout)?;
        let gate = AdmissionGate::new(config.max_in_flight);
        Ok(Self::new(store, gate, config))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Stop admitting operations.  Callers still queued fail with
    /// [`LedgerError::Closed`]; operations already admitted finish normally.
    pub fn close(&self) {
        self.gate.close();
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Buy one unit of `item_name` for `account`.
    ///
    /// Debits the item price and increments the account's ownership of the
    /// item in one unit of work.  Purchases do not append a ledger entry.
    pub async fn purchase(&self, account: AccountId, item_name: &str) -> Result<(), LedgerError> {
        let result = self.purchase_inner(account, item_name).await;
        match &result {
            Ok((price, quantity)) => info!(
                %account,
                item = item_name,
                price,
                quantity,
                "item purchased"
            ),
            Err(e) => report_failure("purchase", account, e),
        }
        result.map(|_| ())
    }

    /// Move `amount` coins from `sender` to the account called
    /// `receiver_handle`, appending one ledger entry.
    pub async fn transfer(
        &self,
        sender: AccountId,
        receiver_handle: &str,
        amount: Coins,
    ) -> Result<(), LedgerError> {
        let result = self.transfer_inner(sender, receiver_handle, amount).await;
        match &result {
            Ok(entry) => info!(
                %sender,
                receiver = receiver_handle,
                amount,
                %entry,
                "coins transferred"
            ),
            Err(e) => report_failure("transfer", sender, e),
        }
        result.map(|_| ())
    }

    /// Balance, holdings and transfer history of `account`, read from one
    /// consistent snapshot.
    pub async fn account_summary(&self, account: AccountId) -> Result<AccountSummary, LedgerError> {
        let result = self.summary_inner(account).await;
        if let Err(e) = &result {
            report_failure("account_summary", account, e);
        }
        result
    }

    /// Find or create the account for `handle`.  New accounts start with
    /// the configured balance.
    pub async fn open_account(&self, handle: &str, secret: &str) -> Result<Account, LedgerError> {
        if handle.is_empty() {
            return Err(LedgerError::InvalidCredentials(handle.to_string()));
        }

        let permit = self.admit().await?;
        let handle = handle.to_string();
        let secret = secret.to_string();
        let starting_balance = self.starting_balance;
        self.run_blocking(Some(permit), move |db| {
            match db.open_account(&handle, &secret, starting_balance) {
                Ok(account) => Ok(account),
                Err(StoreError::CredentialMismatch(h)) => {
                    debug!(handle = %h, "credentials rejected");
                    Err(LedgerError::InvalidCredentials(h))
                }
                Err(e) => {
                    error!(handle = %handle, error = %e, "account lookup failed");
                    Err(e.into())
                }
            }
        })
        .await
    }

    /// Everything that can be bought, ordered by name.  Reference data, so
    /// no admission slot is taken.
    pub async fn catalog(&self) -> Result<Vec<CatalogItem>, LedgerError> {
        self.run_blocking(None, |db| Ok(db.list_items()?)).await
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn purchase_inner(
        &self,
        account: AccountId,
        item_name: &str,
    ) -> Result<(Coins, i64), LedgerError> {
        if item_name.is_empty() {
            return Err(LedgerError::ItemNotFound(String::new()));
        }

        let permit = self.admit().await?;
        let name = item_name.to_string();
        self.run_blocking(Some(permit), move |db| {
            db.unit_of_work(|uow| purchase_unit(uow, account, &name))
        })
        .await
    }

    async fn transfer_inner(
        &self,
        sender: AccountId,
        receiver_handle: &str,
        amount: Coins,
    ) -> Result<EntryId, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if receiver_handle.is_empty() {
            return Err(LedgerError::ReceiverNotFound(String::new()));
        }

        let permit = self.admit().await?;
        let receiver = receiver_handle.to_string();
        self.run_blocking(Some(permit), move |db| {
            db.unit_of_work(|uow| transfer_unit(uow, sender, &receiver, amount))
        })
        .await
    }

    async fn summary_inner(&self, account: AccountId) -> Result<AccountSummary, LedgerError> {
        let permit = self.admit().await?;
        self.run_blocking(Some(permit), move |db| match db.statement(account) {
            Ok(statement) => Ok(AccountSummary::from(statement)),
            Err(StoreError::NotFound) => Err(LedgerError::AccountNotFound(account)),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn admit(&self) -> Result<AdmissionPermit, LedgerError> {
        let permit = match self.acquire_timeout {
            Some(deadline) => self.gate.acquire_timeout(deadline).await?,
            None => self.gate.acquire().await?,
        };
        Ok(permit)
    }

    /// Run `f` against a fresh connection on the blocking pool.
    ///
    /// The permit moves into the blocking task: the slot stays taken until
    /// the unit of work has committed or aborted, even if the caller stops
    /// waiting for the result.
    async fn run_blocking<T, F>(
        &self,
        permit: Option<AdmissionPermit>,
        f: F,
    ) -> Result<T, LedgerError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database) -> Result<T, LedgerError> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut db = store.connect()?;
            f(&mut db)
        })
        .await
        .map_err(|e| LedgerError::Internal(format!("ledger task failed: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Units of work
// ---------------------------------------------------------------------------

fn purchase_unit(
    uow: &UnitOfWork<'_>,
    account: AccountId,
    item_name: &str,
) -> Result<(Coins, i64), LedgerError> {
    let item = uow
        .item_by_name(item_name)?
        .ok_or_else(|| LedgerError::ItemNotFound(item_name.to_string()))?;
    let owner = uow
        .account(account)?
        .ok_or(LedgerError::AccountNotFound(account))?;

    let insufficient = LedgerError::InsufficientFunds {
        balance: owner.balance,
        required: item.price,
    };
    if owner.balance < item.price || !uow.debit(account, item.price)? {
        return Err(insufficient);
    }

    let quantity = uow.increment_ownership(account, item.id)?;
    Ok((item.price, quantity))
}

fn transfer_unit(
    uow: &UnitOfWork<'_>,
    sender: AccountId,
    receiver_handle: &str,
    amount: Coins,
) -> Result<EntryId, LedgerError> {
    let from = uow
        .account(sender)?
        .ok_or(LedgerError::AccountNotFound(sender))?;
    if from.handle == receiver_handle {
        return Err(LedgerError::SelfTransfer);
    }

    let insufficient = LedgerError::InsufficientFunds {
        balance: from.balance,
        required: amount,
    };
    if from.balance < amount || !uow.debit(sender, amount)? {
        return Err(insufficient);
    }

    let to = uow
        .account_by_handle(receiver_handle)?
        .ok_or_else(|| LedgerError::ReceiverNotFound(receiver_handle.to_string()))?;
    match uow.credit(to.id, amount) {
        Ok(()) => {}
        Err(StoreError::BalanceOverflow(_)) => {
            return Err(LedgerError::ReceiverBalanceFull(receiver_handle.to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(uow.append_entry(sender, to.id, amount)?)
}

fn report_failure(operation: &'static str, account: AccountId, err: &LedgerError) {
    if err.is_rejection() {
        debug!(operation, %account, reason = %err, "operation rejected");
    } else {
        error!(operation, %account, error = %err, "operation failed");
    }
}
