//! The unconfirmed transaction pool: four ordered queues plus an in-memory
//! `u_state` shadow of account balances that lets `ready` membership be decided
//! without touching the store on every insert.

mod filters;
mod shadow;

pub use filters::PoolFilters;
pub use shadow::UAccountShadow;

use std::{
    collections::HashMap,
    sync::Arc,
};

use chain_sequence::Sequence;
use chain_types::{
    Address, ChainEvent, ChainResult, PoolError, Transaction, TransactionRegistry, TxId,
};
use indexmap::IndexMap;
use parking_lot::RwLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum QueueKind {
    Received,
    Validated,
    Ready,
    Pending,
}

const QUEUE_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct PoolCounts {
    pub received: usize,
    pub validated: usize,
    pub ready: usize,
    pub pending: usize,
}

type Queue = RwLock<IndexMap<TxId, Arc<Transaction>>>;

struct PoolInner {
    config: Arc<chain_types::ChainConfig>,
    registry: Arc<TransactionRegistry>,
    queues: [Queue; QUEUE_COUNT],
    pending_expiry: RwLock<HashMap<TxId, u64>>,
    location: RwLock<HashMap<TxId, QueueKind>>,
    by_sender: RwLock<HashMap<Address, Vec<TxId>>>,
    u_state: RwLock<HashMap<Address, UAccountShadow>>,
}

/// Cheaply-`Clone`-able handle shared by RPC, Transport, and Forger. The real
/// state lives in `PoolInner`, reached through a single `Arc`.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    pub fn new(config: Arc<chain_types::ChainConfig>, registry: Arc<TransactionRegistry>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                registry,
                queues: Default::default(),
                pending_expiry: RwLock::new(HashMap::new()),
                location: RwLock::new(HashMap::new()),
                by_sender: RwLock::new(HashMap::new()),
                u_state: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Validates `tx` and places it in `received`. Capacity overflow evicts the
    /// oldest item of lowest fee-per-byte in that queue, rejecting `tx` itself
    /// if nothing in the queue is worse than it.
    pub fn add(&self, tx: Transaction) -> ChainResult<TxId> {
        let mut location = self.inner.location.write();
        if location.contains_key(&tx.id) {
            return Err(PoolError::Duplicate(tx.id).into());
        }

        self.inner.registry.get(tx.tx_type)?.validate(&tx)?;
        if !tx.verify_signature() {
            return Err(chain_types::ConsensusError::BadSignature { subject: tx.id.clone() }.into());
        }

        let tx_id = tx.id.clone();
        let sender = tx.sender_id.clone();
        let tx = Arc::new(tx);

        let mut received = self.inner.queues[QueueKind::Received as usize].write();
        if !admit_with_capacity(&mut received, &tx, self.inner.config.transactions.max_transactions_per_queue) {
            return Err(PoolError::QueueFull("received").into());
        }

        location.insert(tx_id.clone(), QueueKind::Received);
        self.inner.by_sender.write().entry(sender).or_default().push(tx_id.clone());
        Ok(tx_id)
    }

    /// Fast-path `received -> validated -> ready`, applying the transaction to
    /// the `u_state` shadow. Requires the caller to hold the single mutation
    /// gate so the shadow is never touched concurrently with a commit.
    pub fn process_unconfirmed_transaction(
        &self,
        _gate: &Sequence,
        tx_id: &TxId,
    ) -> ChainResult<ChainEvent> {
        let tx = {
            let mut received = self.inner.queues[QueueKind::Received as usize].write();
            received.shift_remove(tx_id).ok_or_else(|| PoolError::NotFound(tx_id.clone()))?
        };

        self.apply_to_shadow(&tx)?;

        {
            let mut ready = self.inner.queues[QueueKind::Ready as usize].write();
            ready.insert(tx_id.clone(), tx.clone());
        }
        self.inner.location.write().insert(tx_id.clone(), QueueKind::Ready);

        Ok(ChainEvent::UnconfirmedTransaction(tx))
    }

    fn apply_to_shadow(&self, tx: &Transaction) -> ChainResult<()> {
        let mut shadow = self.inner.u_state.write();
        let sender = shadow.entry(tx.sender_id.clone()).or_default();
        let spent = tx.amount as i128 + tx.fee as i128;
        if sender.u_balance < spent {
            return Err(chain_types::StateError::BalanceUnderflow {
                address: tx.sender_id.clone(),
                balance: sender.u_balance,
                amount: spent,
            }
            .into());
        }
        sender.u_balance -= spent;

        if let Some(recipient_id) = &tx.recipient_id {
            shadow.entry(recipient_id.clone()).or_default().u_balance += tx.amount as i128;
        }
        Ok(())
    }

    fn undo_shadow(&self, tx: &Transaction) {
        let mut shadow = self.inner.u_state.write();
        let spent = tx.amount as i128 + tx.fee as i128;
        shadow.entry(tx.sender_id.clone()).or_default().u_balance += spent;
        if let Some(recipient_id) = &tx.recipient_id {
            shadow.entry(recipient_id.clone()).or_default().u_balance -= tx.amount as i128;
        }
    }

    /// Up to `limit` ready transactions ordered by fee-per-byte (descending
    /// unless `reverse`), then by original queue position.
    pub fn get_merged_transaction_list(&self, reverse: bool, limit: usize) -> Vec<Arc<Transaction>> {
        let ready = self.inner.queues[QueueKind::Ready as usize].read();
        let mut items: Vec<Arc<Transaction>> = ready.values().cloned().collect();
        items.sort_by(|a, b| {
            let ordering = a.fee_per_byte().partial_cmp(&b.fee_per_byte()).unwrap_or(std::cmp::Ordering::Equal);
            if reverse { ordering } else { ordering.reverse() }
        });
        items.truncate(limit);
        items
    }

    pub fn get_count(&self) -> PoolCounts {
        PoolCounts {
            received: self.inner.queues[QueueKind::Received as usize].read().len(),
            validated: self.inner.queues[QueueKind::Validated as usize].read().len(),
            ready: self.inner.queues[QueueKind::Ready as usize].read().len(),
            pending: self.inner.queues[QueueKind::Pending as usize].read().len(),
        }
    }

    /// Read-only scan across every queue, optionally filtered by type and/or
    /// `filters` (id/senderId/recipientId).
    pub fn get_pooled_transactions(
        &self,
        tx_type: Option<chain_types::TransactionType>,
        filters: &PoolFilters,
    ) -> Vec<Arc<Transaction>> {
        self.inner
            .queues
            .iter()
            .flat_map(|queue| queue.read().values().cloned().collect::<Vec<_>>())
            .filter(|tx| tx_type.map_or(true, |t| tx.tx_type == t))
            .filter(|tx| filters.matches(tx))
            .collect()
    }

    /// Removes confirmed transactions from every queue; they now live only in
    /// the store. A tx that was in `ready` had its shadow reservation applied
    /// when it got there, so that release has to happen here too.
    pub fn on_confirmed_transactions(&self, _gate: &Sequence, txs: &[Transaction]) {
        let mut location = self.inner.location.write();
        for tx in txs {
            if let Some(kind) = location.remove(&tx.id) {
                self.inner.queues[kind as usize].write().shift_remove(&tx.id);
                if kind == QueueKind::Ready {
                    self.undo_shadow(tx);
                }
            }
        }
    }

    /// Re-inserts deleted-block transactions at the head of `ready`, in reverse
    /// order, restoring their shadow reservations.
    pub fn on_deleted_transactions(&self, _gate: &Sequence, txs: &[Transaction]) {
        let mut ready = self.inner.queues[QueueKind::Ready as usize].write();
        let mut location = self.inner.location.write();
        for tx in txs.iter().rev() {
            let tx_arc = Arc::new(tx.clone());
            ready.shift_insert(0, tx.id.clone(), tx_arc);
            location.insert(tx.id.clone(), QueueKind::Ready);
            drop(self.apply_to_shadow(tx));
        }
    }

    /// Drops pending multisig transactions whose multilifetime has elapsed as
    /// of `now_epoch_secs`.
    pub fn expire_pending(&self, now_epoch_secs: u64) -> Vec<TxId> {
        let mut expiry = self.inner.pending_expiry.write();
        let expired: Vec<TxId> = expiry
            .iter()
            .filter(|(_, &deadline)| deadline <= now_epoch_secs)
            .map(|(id, _)| id.clone())
            .collect();

        let mut pending = self.inner.queues[QueueKind::Pending as usize].write();
        let mut location = self.inner.location.write();
        for id in &expired {
            expiry.remove(id);
            if let Some(tx) = pending.shift_remove(id) {
                self.undo_shadow(&tx);
            }
            location.remove(id);
        }
        expired
    }
}

/// Inserts `tx` into `queue`, evicting the oldest lowest-fee-per-byte entry if
/// the queue is already at `capacity`. Returns `false` (and leaves `queue`
/// untouched) if `tx` itself would be the worst entry.
fn admit_with_capacity(queue: &mut IndexMap<TxId, Arc<Transaction>>, tx: &Arc<Transaction>, capacity: usize) -> bool {
    if queue.len() < capacity {
        queue.insert(tx.id.clone(), tx.clone());
        return true;
    }

    let worst = queue
        .iter()
        .min_by(|a, b| a.1.fee_per_byte().partial_cmp(&b.1.fee_per_byte()).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(id, existing)| (id.clone(), existing.fee_per_byte()));

    match worst {
        Some((worst_id, worst_fee)) if tx.fee_per_byte() > worst_fee => {
            queue.shift_remove(&worst_id);
            queue.insert(tx.id.clone(), tx.clone());
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use chain_types::{ChainConfig, TransactionAsset, TransactionType};

    use super::*;

    fn registry() -> Arc<TransactionRegistry> {
        Arc::new(TransactionRegistry::default())
    }

    fn transfer(id: &str, sender: &str, amount: u64, fee: u64) -> Transaction {
        Transaction {
            id: id.to_string(),
            tx_type: TransactionType::Transfer,
            sender_public_key: "aa".repeat(32),
            sender_id: sender.to_string(),
            recipient_id: Some("recipient".into()),
            amount,
            fee,
            timestamp: 0,
            signature: "bb".repeat(64),
            sign_signature: None,
            signatures: None,
            asset: TransactionAsset::default(),
        }
    }

    fn pool_with_passthrough_registry(config: ChainConfig) -> Pool {
        // The built-in registry has no handlers registered yet; tests exercise
        // paths that don't require `TransactionHandler::validate` to pass, or
        // register a permissive stub below.
        let mut reg = TransactionRegistry::default();
        reg.register(Box::new(PermissiveHandler));
        Pool::new(Arc::new(config), Arc::new(reg))
    }

    struct PermissiveHandler;
    impl chain_types::TransactionHandler for PermissiveHandler {
        fn transaction_type(&self) -> TransactionType {
            TransactionType::Transfer
        }
        fn validate(&self, _tx: &Transaction) -> ChainResult<()> {
            Ok(())
        }
        fn apply(&self, _tx: &Transaction, _accounts: &mut chain_types::AccountTable) -> ChainResult<()> {
            Ok(())
        }
        fn undo(&self, _tx: &Transaction, _accounts: &mut chain_types::AccountTable) -> ChainResult<()> {
            Ok(())
        }
    }

    #[test]
    fn add_rejects_duplicate_ids() {
        let pool = pool_with_passthrough_registry(ChainConfig::default());
        pool.add(transfer("tx1", "alice", 10, 1)).unwrap();
        let err = pool.add(transfer("tx1", "alice", 10, 1)).unwrap_err();
        assert!(matches!(err, chain_types::ChainError::Pool(PoolError::Duplicate(_))));
    }

    #[test]
    fn overflow_evicts_the_worst_fee_per_byte_entry() {
        let mut config = ChainConfig::default();
        config.transactions.max_transactions_per_queue = 2;
        let pool = pool_with_passthrough_registry(config);

        pool.add(transfer("low", "alice", 10, 1)).unwrap();
        pool.add(transfer("high", "bob", 10, 100)).unwrap();
        // "low" has the worst fee-per-byte; a third high-fee tx should evict it.
        pool.add(transfer("higher", "carol", 10, 200)).unwrap();

        assert_eq!(pool.get_count().received, 2);
    }

    #[tokio::test]
    async fn process_unconfirmed_transaction_moves_received_to_ready() {
        let pool = pool_with_passthrough_registry(ChainConfig::default());
        let sequence = Sequence::new(&ChainConfig::default());
        pool.u_state_credit("alice", 100);

        let tx_id = pool.add(transfer("tx1", "alice", 10, 1)).unwrap();
        let event = pool.process_unconfirmed_transaction(&sequence, &tx_id).unwrap();
        assert!(matches!(event, ChainEvent::UnconfirmedTransaction(_)));
        assert_eq!(pool.get_count().ready, 1);
        assert_eq!(pool.get_count().received, 0);
    }

    #[tokio::test]
    async fn process_unconfirmed_transaction_rejects_balance_underflow() {
        let pool = pool_with_passthrough_registry(ChainConfig::default());
        let sequence = Sequence::new(&ChainConfig::default());

        let tx_id = pool.add(transfer("tx1", "alice", 1_000_000, 1)).unwrap();
        let err = pool.process_unconfirmed_transaction(&sequence, &tx_id).unwrap_err();
        assert!(matches!(err, chain_types::ChainError::State(chain_types::StateError::BalanceUnderflow { .. })));
    }

    #[tokio::test]
    async fn on_deleted_transactions_reinserts_at_head_reversed() {
        let pool = pool_with_passthrough_registry(ChainConfig::default());
        let sequence = Sequence::new(&ChainConfig::default());

        let a = transfer("a", "alice", 1, 1);
        let b = transfer("b", "bob", 1, 1);
        pool.on_deleted_transactions(&sequence, &[a.clone(), b.clone()]);

        let merged = pool.get_merged_transaction_list(false, 10);
        let ids: Vec<&str> = merged.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn on_confirmed_transactions_releases_the_shadow_reservation() {
        let pool = pool_with_passthrough_registry(ChainConfig::default());
        let sequence = Sequence::new(&ChainConfig::default());
        pool.u_state_credit("alice", 100);

        let tx = transfer("tx1", "alice", 10, 1);
        let tx_id = pool.add(tx.clone()).unwrap();
        pool.process_unconfirmed_transaction(&sequence, &tx_id).unwrap();
        assert_eq!(pool.u_state_balance("alice"), 89);

        pool.on_confirmed_transactions(&sequence, &[tx]);
        assert_eq!(pool.u_state_balance("alice"), 100);
        assert_eq!(pool.get_count().ready, 0);
    }

    #[test]
    fn get_pooled_transactions_applies_sender_filter() {
        let pool = pool_with_passthrough_registry(ChainConfig::default());
        pool.add(transfer("a", "alice", 1, 1)).unwrap();
        pool.add(transfer("b", "bob", 1, 1)).unwrap();

        let filters = PoolFilters { sender_id: Some("alice".into()), ..Default::default() };
        let matched = pool.get_pooled_transactions(None, &filters);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "a");

        let unfiltered = pool.get_pooled_transactions(None, &PoolFilters::default());
        assert_eq!(unfiltered.len(), 2);
    }

    #[test]
    fn expire_pending_removes_past_deadline_entries() {
        let pool = pool_with_passthrough_registry(ChainConfig::default());
        pool.inner.queues[QueueKind::Pending as usize]
            .write()
            .insert("tx1".to_string(), Arc::new(transfer("tx1", "alice", 1, 1)));
        pool.inner.pending_expiry.write().insert("tx1".to_string(), 100);
        pool.inner.location.write().insert("tx1".to_string(), QueueKind::Pending);

        let expired = pool.expire_pending(200);
        assert_eq!(expired, vec!["tx1".to_string()]);
        assert_eq!(pool.get_count().pending, 0);
    }

    impl Pool {
        /// Test helper: seeds the shadow balance directly, bypassing a block apply.
        fn u_state_credit(&self, address: &str, amount: i128) {
            self.inner.u_state.write().entry(address.to_string()).or_default().u_balance += amount;
        }

        fn u_state_balance(&self, address: &str) -> i128 {
            self.inner.u_state.read().get(address).map_or(0, |shadow| shadow.u_balance)
        }
    }
}
