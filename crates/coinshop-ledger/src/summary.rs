//! The account view handed back to callers.
//!
//! Serializes as
//! `{"coins":..,"inventory":[{"item":..,"quantity":..}],"coinHistory":{"received":[{"fromUser":..,"amount":..}],"sent":[{"toUser":..,"amount":..}]}}`.

use coinshop_shared::{AccountId, Coins};
use coinshop_store::{AccountStatement, TransferRecord};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub coins: Coins,
    pub inventory: Vec<InventoryLine>,
    pub coin_history: CoinHistory,
    /// Raw transfer records, most recent first.
    #[serde(skip)]
    pub history: Vec<TransferRecord>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InventoryLine {
    pub item: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CoinHistory {
    pub received: Vec<Received>,
    pub sent: Vec<Sent>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Received {
    pub from_user: String,
    pub amount: Coins,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Sent {
    pub to_user: String,
    pub amount: Coins,
}

impl From<AccountStatement> for AccountSummary {
    fn from(statement: AccountStatement) -> Self {
        let me: AccountId = statement.account.id;

        let inventory = statement
            .inventory
            .into_iter()
            .map(|owned| InventoryLine {
                item: owned.name,
                quantity: owned.quantity,
            })
            .collect();

        let mut coin_history = CoinHistory::default();
        for record in &statement.history {
            if record.entry.receiver == me {
                coin_history.received.push(Received {
                    from_user: record.sender_handle.clone(),
                    amount: record.entry.amount,
                });
            }
            if record.entry.sender == me {
                coin_history.sent.push(Sent {
                    to_user: record.receiver_handle.clone(),
                    amount: record.entry.amount,
                });
            }
        }

        Self {
            coins: statement.account.balance,
            inventory,
            coin_history,
            history: statement.history,
        }
    }
}
