use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use chain_pool::Pool;
use chain_sequence::Sequence;
use chain_slots::Slots;
use chain_store::{ChainStore, StoreTx};
use chain_types::{
    broadhash::compute_broadhash, crypto, Account, Address, Block, BlockId, ChainConfig,
    ChainEvent, ChainResult, ConsensusError, EventBus, PersistenceError, RoundReward, Transaction,
    TransactionRegistry, ValidationError,
};
use parking_lot::{Mutex, RwLock};

use crate::{rounds::Rounds, state::BlockchainState};

/// The append/delete/load/receive-from-network pipeline and the lastBlock /
/// lastReceipt / broadhash state it owns.
pub struct Blocks {
    config: Arc<ChainConfig>,
    slots: Slots,
    store: Arc<dyn ChainStore>,
    pool: Pool,
    registry: Arc<TransactionRegistry>,
    events: EventBus,
    rounds: Rounds,

    state: RwLock<BlockchainState>,
    last_block: RwLock<Option<Block>>,
    last_receipt: AtomicU64,
    broadhash: RwLock<String>,
    recent_ids: RwLock<VecDeque<BlockId>>,
    current_delegate_list: RwLock<Vec<String>>,
}

fn touched_addresses(tx: &Transaction) -> Vec<Address> {
    let mut addresses = vec![tx.sender_id.clone()];
    if let Some(recipient) = &tx.recipient_id {
        addresses.push(recipient.clone());
    }
    addresses
}

fn now_unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Applies each reward row's `fees` to its delegate's `balance` (negated to
/// undo). The block `reward` itself is handled separately at append/delete
/// time, since it's paid to the generator directly rather than via a round row.
fn apply_round_rewards(tx: &mut dyn StoreTx, rewards: &[RoundReward], sign: i128) -> ChainResult<()> {
    for reward in rewards {
        let Ok(address) = crypto::derive_address(&reward.public_key) else { continue };
        let mut account = tx.get_account(&address)?.unwrap_or_else(|| Account::new(address));
        account.balance += sign * reward.fees as i128;
        tx.upsert_account(account)?;
    }
    Ok(())
}

impl Blocks {
    pub fn new(
        config: Arc<ChainConfig>,
        slots: Slots,
        store: Arc<dyn ChainStore>,
        pool: Pool,
        registry: Arc<TransactionRegistry>,
        events: EventBus,
    ) -> Self {
        let rounds = Rounds::new(config.active_delegates);
        Self {
            config,
            slots,
            store,
            pool,
            registry,
            events,
            rounds,
            state: RwLock::new(BlockchainState::Loading),
            last_block: RwLock::new(None),
            last_receipt: AtomicU64::new(0),
            broadhash: RwLock::new(String::new()),
            recent_ids: RwLock::new(VecDeque::with_capacity(5)),
            current_delegate_list: RwLock::new(Vec::new()),
        }
    }

    pub fn state(&self) -> BlockchainState {
        self.state.read().clone()
    }

    fn set_state(&self, next: BlockchainState) {
        *self.state.write() = next;
    }

    pub fn last_block(&self) -> Option<Block> {
        self.last_block.read().clone()
    }

    pub fn broadhash(&self) -> String {
        self.broadhash.read().clone()
    }

    pub fn is_stale(&self, now_unix_secs: u64) -> bool {
        now_unix_secs.saturating_sub(self.last_receipt.load(Ordering::Acquire)) > self.config.block_receipt_timeout_secs
    }

    /// Set by whichever component (Forger or the round-boundary settlement
    /// path) last regenerated the round's delegate list; `receiveBlockFromNetwork`
    /// and `verify_block` check incoming generators against this.
    pub fn set_delegate_list(&self, delegates: Vec<String>) {
        *self.current_delegate_list.write() = delegates;
    }

    pub fn rounds(&self) -> &Rounds {
        &self.rounds
    }

    /// Read-only snapshot of the round's shuffled delegate list.
    pub fn current_delegate_list(&self) -> Vec<String> {
        self.current_delegate_list.read().clone()
    }

    /// The delegate assigned to `slot` under the currently active list, or
    /// `None` before any list has been generated.
    pub fn delegate_for_slot(&self, slot: u64) -> Option<String> {
        let delegates = self.current_delegate_list.read();
        if delegates.is_empty() {
            return None;
        }
        let index = self.slots.slot_delegate_index(slot) % delegates.len();
        delegates.get(index).cloned()
    }

    /// Flips between `Synced`/`Syncing`; a no-op while `Loading` or `Rebuilding`,
    /// since those are entered and left by `load_blockchain` alone.
    pub fn set_syncing(&self, syncing: bool) {
        let mut state = self.state.write();
        if matches!(*state, BlockchainState::Synced | BlockchainState::Syncing) {
            *state = if syncing { BlockchainState::Syncing } else { BlockchainState::Synced };
        }
    }

    /// On an empty store, persists `genesis` and applies its transactions;
    /// otherwise resumes from the store's current tip. `rebuild_up_to_round`,
    /// if set, is terminal: the caller is expected to shut down afterwards.
    pub async fn load_blockchain(
        &self,
        gate: &Sequence,
        genesis: Block,
        rebuild_up_to_round: Option<u32>,
    ) -> ChainResult<()> {
        self.set_state(BlockchainState::Loading);

        match self.store.get_last_block().await? {
            None => {
                self.commit_block(gate, genesis, false).await?;
            }
            Some(last) => {
                self.refresh_recent_ids(&last).await?;
                self.last_receipt.store(last.timestamp, Ordering::Release);
                *self.last_block.write() = Some(last);
            }
        }

        if let Some(target_round) = rebuild_up_to_round {
            self.set_state(BlockchainState::Rebuilding { target_round });
            return Ok(());
        }

        self.set_state(BlockchainState::Synced);
        self.events.publish(ChainEvent::Bootstrap);
        Ok(())
    }

    async fn refresh_recent_ids(&self, last: &Block) -> ChainResult<()> {
        let from = last.height.saturating_sub(5);
        let window = self.store.get_blocks_between_heights(from, last.height, 5).await?;
        let mut recent = self.recent_ids.write();
        recent.clear();
        recent.extend(window.into_iter().map(|b| b.id));
        let ids: Vec<BlockId> = recent.iter().cloned().collect();
        *self.broadhash.write() = compute_broadhash(&ids);
        Ok(())
    }

    /// Full verify-then-commit pipeline for a forged or network-received block.
    pub async fn process_block(&self, gate: &Sequence, block: Block, broadcast: bool) -> ChainResult<()> {
        self.verify_block(&block)?;
        self.commit_block(gate, block, broadcast).await
    }

    fn verify_block(&self, block: &Block) -> ChainResult<()> {
        if !block.verify_payload_hash() {
            return Err(ValidationError::Schema(format!("block {} payload hash mismatch", block.id)).into());
        }
        if block.payload_bytes_used() > self.config.max_payload_length {
            return Err(ValidationError::PayloadTooLarge(block.id.clone(), self.config.max_payload_length).into());
        }
        if block.transactions.len() > self.config.max_transactions_per_block {
            return Err(ValidationError::Schema(format!(
                "block {} carries more than {} transactions",
                block.id, self.config.max_transactions_per_block
            ))
            .into());
        }

        if block.height > 1 {
            if !block.verify_signature() {
                return Err(ConsensusError::BadSignature { subject: block.id.clone() }.into());
            }
            let slot = self.slots.get_slot_number(Some(block.timestamp as i64));
            if let Some(expected) = self.delegate_for_slot(slot) {
                if expected != block.generator_public_key {
                    return Err(ConsensusError::WrongGenerator {
                        generator: block.generator_public_key.clone(),
                        slot,
                    }
                    .into());
                }
            }
        }

        for tx in &block.transactions {
            self.registry.get(tx.tx_type)?.validate(tx)?;
            if !tx.verify_signature() {
                return Err(ConsensusError::BadSignature { subject: tx.id.clone() }.into());
            }
        }
        Ok(())
    }

    async fn commit_block(&self, gate: &Sequence, block: Block, broadcast: bool) -> ChainResult<()> {
        let registry = self.registry.clone();
        let height = block.height;
        let staged = block.clone();

        self.store
            .with_transaction(Box::new(move |tx| {
                let mut accounts: HashMap<Address, Account> = HashMap::new();
                for transaction in &staged.transactions {
                    for address in touched_addresses(transaction) {
                        if let std::collections::hash_map::Entry::Vacant(slot) = accounts.entry(address.clone()) {
                            let account = tx.get_account(&address)?.unwrap_or_else(|| Account::new(address));
                            slot.insert(account);
                        }
                    }
                    let handler = registry.get(transaction.tx_type)?;
                    handler.apply(transaction, &mut accounts)?;
                }

                if let Ok(generator_address) = crypto::derive_address(&staged.generator_public_key) {
                    let generator =
                        accounts.entry(generator_address.clone()).or_insert_with(|| Account::new(generator_address));
                    generator.balance += staged.reward as i128;
                    generator.produced_blocks += 1;
                }

                tx.insert_block(&staged)?;
                for account in accounts.into_values() {
                    tx.upsert_account(account)?;
                }
                Ok(())
            }))
            .await?;

        let block = Arc::new(block);
        *self.last_block.write() = Some((*block).clone());
        self.last_receipt.store(now_unix_secs(), Ordering::Release);
        self.pool.on_confirmed_transactions(gate, &block.transactions);

        let broadhash_changed = self.push_recent_id(block.id.clone());

        self.events.publish(ChainEvent::NewBlock(block.clone()));
        if broadhash_changed {
            self.events.publish(ChainEvent::NewBroadhash { broadhash: self.broadhash(), height });
        }
        if broadcast {
            self.events.publish(ChainEvent::BroadcastBlock(block));
        }

        self.maybe_settle_round(height).await?;
        Ok(())
    }

    fn push_recent_id(&self, id: BlockId) -> bool {
        let mut recent = self.recent_ids.write();
        recent.push_back(id);
        while recent.len() > 5 {
            recent.pop_front();
        }
        let ids: Vec<BlockId> = recent.iter().cloned().collect();
        let new_hash = compute_broadhash(&ids);
        let mut broadhash = self.broadhash.write();
        let changed = *broadhash != new_hash;
        *broadhash = new_hash;
        changed
    }

    fn pop_recent_id(&self) -> bool {
        let mut recent = self.recent_ids.write();
        recent.pop_back();
        let ids: Vec<BlockId> = recent.iter().cloned().collect();
        let new_hash = compute_broadhash(&ids);
        let mut broadhash = self.broadhash.write();
        let changed = *broadhash != new_hash;
        *broadhash = new_hash;
        changed
    }

    async fn maybe_settle_round(&self, height: u64) -> ChainResult<()> {
        if height % self.config.active_delegates as u64 != 0 {
            return Ok(());
        }
        if !self.rounds.begin_tick() {
            return Ok(());
        }

        let round = self.slots.calc_round(height);
        let from = height.saturating_sub(self.config.active_delegates as u64);
        let round_blocks = self
            .store
            .get_blocks_between_heights(from, height, self.config.active_delegates as usize)
            .await?;
        let rewards = self.rounds.settle_round(round, &round_blocks, now_unix_secs());

        if !rewards.is_empty() {
            self.store
                .with_transaction(Box::new(move |tx| {
                    tx.record_round_rewards(&rewards)?;
                    apply_round_rewards(tx, &rewards, 1)
                }))
                .await?;
        }

        self.rounds.end_tick();
        Ok(())
    }

    /// Accept/reject/reconcile an incoming block per the fork-choice rule:
    /// extend the tip, replace it on a lower (timestamp, id) tie-break, ignore
    /// a duplicate, or reject otherwise.
    pub async fn receive_block_from_network(&self, gate: &Sequence, block: Block) -> ChainResult<()> {
        let Some(last) = self.last_block() else {
            return Err(PersistenceError::NotFound("no local tip to compare against".into()).into());
        };

        if block.previous_block_id.as_deref() == Some(last.id.as_str()) && block.height == last.height + 1 {
            return self.process_block(gate, block, true).await;
        }

        if block.height == last.height && block.id == last.id {
            return Ok(());
        }

        if block.height == last.height && block.id != last.id {
            let incoming_wins = block.timestamp < last.timestamp || (block.timestamp == last.timestamp && block.id < last.id);
            if incoming_wins {
                self.delete_last_block(gate).await?;
                return self.process_block(gate, block, true).await;
            }
            return Ok(());
        }

        Err(ConsensusError::HeightMismatch { block_id: block.id, height: block.height, tip_height: last.height }.into())
    }

    /// Reverses the tip: undoes its transactions, removes its row, restores the
    /// previous lastBlock, and reinserts its transactions into the pool.
    pub async fn delete_last_block(&self, gate: &Sequence) -> ChainResult<Block> {
        let last = self
            .last_block()
            .ok_or_else(|| PersistenceError::NotFound("no block to delete".into()))?;
        if last.height <= 1 {
            return Err(PersistenceError::Transaction("cannot delete the genesis block".into()).into());
        }

        let registry = self.registry.clone();
        let block_id = last.id.clone();
        let settled_round =
            (last.height % self.config.active_delegates as u64 == 0).then(|| self.slots.calc_round(last.height));
        let removed_slot: Arc<Mutex<Option<Block>>> = Arc::new(Mutex::new(None));
        let removed_slot_writer = removed_slot.clone();

        self.store
            .with_transaction(Box::new(move |tx| {
                let removed = tx.delete_block(&block_id)?;
                let mut accounts: HashMap<Address, Account> = HashMap::new();
                for transaction in removed.transactions.iter().rev() {
                    for address in touched_addresses(transaction) {
                        if let std::collections::hash_map::Entry::Vacant(slot) = accounts.entry(address.clone()) {
                            let account = tx.get_account(&address)?.unwrap_or_else(|| Account::new(address));
                            slot.insert(account);
                        }
                    }
                    let handler = registry.get(transaction.tx_type)?;
                    handler.undo(transaction, &mut accounts)?;
                }

                if let Ok(generator_address) = crypto::derive_address(&removed.generator_public_key) {
                    let generator = match accounts.entry(generator_address.clone()) {
                        std::collections::hash_map::Entry::Occupied(slot) => slot.into_mut(),
                        std::collections::hash_map::Entry::Vacant(slot) => {
                            let account = tx.get_account(&generator_address)?.unwrap_or_else(|| Account::new(generator_address));
                            slot.insert(account)
                        }
                    };
                    generator.balance -= removed.reward as i128;
                    generator.produced_blocks = generator.produced_blocks.saturating_sub(1);
                }

                for account in accounts.into_values() {
                    tx.upsert_account(account)?;
                }

                if let Some(round) = settled_round {
                    let rewards = tx.take_round_rewards(round)?;
                    apply_round_rewards(tx, &rewards, -1)?;
                }

                *removed_slot_writer.lock() = Some(removed);
                Ok(())
            }))
            .await?;

        let removed = removed_slot.lock().take().expect("transaction succeeded, so the closure ran");

        let previous = match &removed.previous_block_id {
            Some(id) => self.store.get_block_by_id(id).await?,
            None => None,
        };
        self.last_receipt.store(previous.as_ref().map(|b| b.timestamp).unwrap_or(0), Ordering::Release);
        *self.last_block.write() = previous;

        self.pop_recent_id();
        self.pool.on_deleted_transactions(gate, &removed.transactions);
        self.events.publish(ChainEvent::DeleteBlock(Arc::new(removed.clone())));

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chain_store::InMemoryChainStore;
    use chain_types::{TransactionAsset, TransactionType};
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    use super::*;

    struct PermissiveHandler;
    impl chain_types::TransactionHandler for PermissiveHandler {
        fn transaction_type(&self) -> TransactionType {
            TransactionType::Transfer
        }
        fn validate(&self, _tx: &Transaction) -> ChainResult<()> {
            Ok(())
        }
        fn apply(&self, tx: &Transaction, accounts: &mut chain_types::AccountTable) -> ChainResult<()> {
            let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
            sender.balance -= tx.amount as i128 + tx.fee as i128;
            if let Some(recipient_id) = &tx.recipient_id {
                let recipient =
                    accounts.entry(recipient_id.clone()).or_insert_with(|| Account::new(recipient_id.clone()));
                recipient.balance += tx.amount as i128;
            }
            Ok(())
        }
        fn undo(&self, tx: &Transaction, accounts: &mut chain_types::AccountTable) -> ChainResult<()> {
            let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
            sender.balance += tx.amount as i128 + tx.fee as i128;
            if let Some(recipient_id) = &tx.recipient_id {
                let recipient =
                    accounts.entry(recipient_id.clone()).or_insert_with(|| Account::new(recipient_id.clone()));
                recipient.balance -= tx.amount as i128;
            }
            Ok(())
        }
    }

    fn genesis() -> Block {
        Block {
            id: "genesis".into(),
            height: 1,
            previous_block_id: None,
            timestamp: 0,
            generator_public_key: String::new(),
            block_signature: String::new(),
            payload_hash: Block::compute_payload_hash(&[]),
            payload_length: 0,
            number_of_transactions: 0,
            total_amount: 0,
            total_fee: 0,
            reward: 0,
            transactions: Vec::new(),
        }
    }

    fn harness() -> (Blocks, Sequence, Arc<ChainConfig>) {
        let mut config = ChainConfig::default();
        config.active_delegates = 101;
        let config = Arc::new(config);
        let slots = Slots::new(config.clone());
        let store: Arc<dyn ChainStore> = Arc::new(InMemoryChainStore::new());
        let mut registry = TransactionRegistry::default();
        registry.register(Box::new(PermissiveHandler));
        let registry = Arc::new(registry);
        let pool = Pool::new(config.clone(), registry.clone());
        let events = EventBus::default();
        let sequence = Sequence::new(&config);
        (Blocks::new(config.clone(), slots, store, pool, registry, events), sequence, config)
    }

    fn signed_transfer(key: &SigningKey, id: &str, sender: &str, recipient: &str, amount: u64, fee: u64) -> Transaction {
        let mut tx = Transaction {
            id: id.to_string(),
            tx_type: TransactionType::Transfer,
            sender_public_key: hex::encode(key.verifying_key().to_bytes()),
            sender_id: sender.to_string(),
            recipient_id: Some(recipient.to_string()),
            amount,
            fee,
            timestamp: 0,
            signature: String::new(),
            sign_signature: None,
            signatures: None,
            asset: TransactionAsset::default(),
        };
        tx.signature = hex::encode(key.sign(&tx.canonical_bytes()).to_bytes());
        tx
    }

    #[tokio::test]
    async fn load_blockchain_persists_genesis_on_an_empty_store() {
        let (blocks, gate, _config) = harness();
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        assert_eq!(blocks.state(), BlockchainState::Synced);
        assert_eq!(blocks.last_block().unwrap().id, "genesis");
    }

    #[tokio::test]
    async fn load_blockchain_enters_rebuilding_state_when_configured() {
        let (blocks, gate, _config) = harness();
        blocks.load_blockchain(&gate, genesis(), Some(7)).await.unwrap();
        assert_eq!(blocks.state(), BlockchainState::Rebuilding { target_round: 7 });
    }

    fn child_block(key: &SigningKey, previous: &Block, id: &str, transactions: Vec<Transaction>) -> Block {
        let mut block = Block {
            id: id.to_string(),
            height: previous.height + 1,
            previous_block_id: Some(previous.id.clone()),
            timestamp: previous.timestamp + 10,
            generator_public_key: hex::encode(key.verifying_key().to_bytes()),
            block_signature: String::new(),
            payload_hash: Block::compute_payload_hash(&transactions),
            payload_length: 0,
            number_of_transactions: transactions.len(),
            total_amount: transactions.iter().map(|t| t.amount).sum(),
            total_fee: transactions.iter().map(|t| t.fee).sum(),
            reward: 0,
            transactions,
        };
        block.block_signature = hex::encode(key.sign(&block.canonical_bytes()).to_bytes());
        block
    }

    #[tokio::test]
    async fn process_block_appends_and_applies_transactions() {
        let (blocks, gate, _config) = harness();
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        let tip = blocks.last_block().unwrap();
        let key = SigningKey::generate(&mut OsRng);

        let tx = signed_transfer(&key, "tx1", "alice", "bob", 50, 1);
        let next = child_block(&key, &tip, "b2", vec![tx]);
        blocks.process_block(&gate, next, false).await.unwrap();

        assert_eq!(blocks.last_block().unwrap().id, "b2");
    }

    #[tokio::test]
    async fn delete_last_block_restores_previous_tip_and_undoes_transactions() {
        let (blocks, gate, _config) = harness();
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        let tip = blocks.last_block().unwrap();
        let key = SigningKey::generate(&mut OsRng);
        let tx = signed_transfer(&key, "tx1", "alice", "bob", 50, 1);
        let next = child_block(&key, &tip, "b2", vec![tx]);
        blocks.process_block(&gate, next, false).await.unwrap();

        let removed = blocks.delete_last_block(&gate).await.unwrap();
        assert_eq!(removed.id, "b2");
        assert_eq!(blocks.last_block().unwrap().id, "genesis");
    }

    fn single_delegate_harness() -> (Blocks, Sequence, Arc<dyn ChainStore>) {
        let mut config = ChainConfig::default();
        config.active_delegates = 1;
        let config = Arc::new(config);
        let slots = Slots::new(config.clone());
        let store: Arc<dyn ChainStore> = Arc::new(InMemoryChainStore::new());
        let mut registry = TransactionRegistry::default();
        registry.register(Box::new(PermissiveHandler));
        let registry = Arc::new(registry);
        let pool = Pool::new(config.clone(), registry.clone());
        let events = EventBus::default();
        let sequence = Sequence::new(&config);
        (Blocks::new(config, slots, store.clone(), pool, registry, events), sequence, store)
    }

    #[tokio::test]
    async fn maybe_settle_round_credits_fees_to_the_generator() {
        let (blocks, gate, store) = single_delegate_harness();
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        let tip = blocks.last_block().unwrap();
        let key = SigningKey::generate(&mut OsRng);
        let generator_address = crypto::derive_address(&hex::encode(key.verifying_key().to_bytes())).unwrap();

        let tx = signed_transfer(&key, "tx1", "alice", "bob", 50, 7);
        let mut next = child_block(&key, &tip, "b2", vec![tx]);
        next.reward = 100;
        next.block_signature = hex::encode(key.sign(&next.canonical_bytes()).to_bytes());
        blocks.process_block(&gate, next, false).await.unwrap();

        let generator = store.get_account(&generator_address).await.unwrap().unwrap();
        assert_eq!(generator.balance, 100 + 7);
        assert_eq!(store.get_round_rewards(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_last_block_undoes_the_round_settlement_it_triggered() {
        let (blocks, gate, store) = single_delegate_harness();
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        let tip = blocks.last_block().unwrap();
        let key = SigningKey::generate(&mut OsRng);
        let generator_address = crypto::derive_address(&hex::encode(key.verifying_key().to_bytes())).unwrap();

        let tx = signed_transfer(&key, "tx1", "alice", "bob", 50, 7);
        let mut next = child_block(&key, &tip, "b2", vec![tx]);
        next.reward = 100;
        next.block_signature = hex::encode(key.sign(&next.canonical_bytes()).to_bytes());
        blocks.process_block(&gate, next, false).await.unwrap();
        assert_eq!(store.get_account(&generator_address).await.unwrap().unwrap().balance, 107);

        blocks.delete_last_block(&gate).await.unwrap();

        let generator = store.get_account(&generator_address).await.unwrap().unwrap();
        assert_eq!(generator.balance, 0);
        assert!(store.get_round_rewards(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_last_block_refuses_to_remove_genesis() {
        let (blocks, gate, _config) = harness();
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        let err = blocks.delete_last_block(&gate).await.unwrap_err();
        assert!(matches!(err, chain_types::ChainError::Persistence(chain_types::PersistenceError::Transaction(_))));
    }

    #[tokio::test]
    async fn receive_block_from_network_replaces_tip_on_lower_tiebreak() {
        let (blocks, gate, _config) = harness();
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        let tip = blocks.last_block().unwrap();
        let key = SigningKey::generate(&mut OsRng);

        let mut losing = child_block(&key, &tip, "b2-late", vec![]);
        losing.timestamp = tip.timestamp + 100;
        losing.block_signature = hex::encode(key.sign(&losing.canonical_bytes()).to_bytes());
        blocks.process_block(&gate, losing, false).await.unwrap();

        let mut winning = child_block(&key, &tip, "b2-early", vec![]);
        winning.timestamp = tip.timestamp + 10;
        winning.block_signature = hex::encode(key.sign(&winning.canonical_bytes()).to_bytes());
        blocks.receive_block_from_network(&gate, winning).await.unwrap();

        assert_eq!(blocks.last_block().unwrap().id, "b2-early");
    }

    #[tokio::test]
    async fn receive_block_from_network_rejects_a_non_contiguous_height() {
        let (blocks, gate, _config) = harness();
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        let tip = blocks.last_block().unwrap();
        let key = SigningKey::generate(&mut OsRng);
        let mut orphan = child_block(&key, &tip, "orphan", vec![]);
        orphan.height = tip.height + 5;
        orphan.block_signature = hex::encode(key.sign(&orphan.canonical_bytes()).to_bytes());

        let err = blocks.receive_block_from_network(&gate, orphan).await.unwrap_err();
        assert!(matches!(err, chain_types::ChainError::Consensus(chain_types::ConsensusError::HeightMismatch { .. })));
    }
}
