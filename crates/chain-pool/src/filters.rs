use chain_types::{Address, Transaction, TxId};
use serde::{Deserialize, Serialize};

/// Optional narrowing for `getPooledTransactions`/`getTransactionsFromPool`.
/// Every unset field matches everything, mirroring `get_pooled_transactions`'s
/// existing `tx_type.map_or(true, ...)` idiom.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolFilters {
    pub id: Option<TxId>,
    pub sender_id: Option<Address>,
    pub recipient_id: Option<Address>,
}

impl PoolFilters {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.id.as_ref().map_or(true, |id| tx.id == *id)
            && self.sender_id.as_ref().map_or(true, |sender_id| tx.sender_id == *sender_id)
            && self.recipient_id.as_ref().map_or(true, |recipient_id| tx.recipient_id.as_ref() == Some(recipient_id))
    }
}
