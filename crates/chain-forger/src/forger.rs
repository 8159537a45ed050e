use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chain_blocks::{Blocks, Rewards};
use chain_net::Peers;
use chain_pool::Pool;
use chain_sequence::Sequence;
use chain_slots::Slots;
use chain_store::ChainStore;
use chain_types::{Block, ChainConfig, ChainResult, ConfigError};
use ed25519_dalek::{Signer, SigningKey};
use parking_lot::RwLock;
use tracing::debug;

use crate::secrets;

const NO_SLOT_FORGED_YET: u64 = u64::MAX;

/// Delegate key unlock plus the slot-aligned block production loop.
pub struct Forger {
    config: Arc<ChainConfig>,
    slots: Slots,
    store: Arc<dyn ChainStore>,
    blocks: Arc<Blocks>,
    pool: Pool,
    peers: Arc<Peers>,
    rewards: Rewards,

    keys: RwLock<HashMap<String, SigningKey>>,
    enabled: RwLock<HashMap<String, bool>>,
    current_round: AtomicU64,
    last_forged_slot: AtomicU64,
}

impl Forger {
    pub fn new(
        config: Arc<ChainConfig>,
        slots: Slots,
        store: Arc<dyn ChainStore>,
        blocks: Arc<Blocks>,
        pool: Pool,
        peers: Arc<Peers>,
    ) -> Self {
        let rewards = Rewards::new(config.clone());
        Self {
            config,
            slots,
            store,
            blocks,
            pool,
            peers,
            rewards,
            keys: RwLock::new(HashMap::new()),
            enabled: RwLock::new(HashMap::new()),
            current_round: AtomicU64::new(0),
            last_forged_slot: AtomicU64::new(NO_SLOT_FORGED_YET),
        }
    }

    /// Decrypts every configured delegate's passphrase with `password`,
    /// enabling forging for each one that unlocks. Delegates that fail to
    /// unlock are logged and left disabled rather than aborting the rest.
    pub fn load_delegates(&self, password: &str) -> usize {
        let mut keys = self.keys.write();
        let mut enabled = self.enabled.write();
        let mut unlocked = 0;
        for delegate in &self.config.forging.delegates {
            match secrets::decrypt_passphrase(&delegate.encrypted_passphrase, password, &delegate.public_key) {
                Ok(signing_key) => {
                    keys.insert(delegate.public_key.clone(), signing_key);
                    enabled.insert(delegate.public_key.clone(), true);
                    unlocked += 1;
                }
                Err(error) => {
                    debug!(public_key = %delegate.public_key, %error, "failed to unlock configured delegate");
                }
            }
        }
        unlocked
    }

    /// Toggles one delegate's forging flag, verifying `password` by attempting
    /// decryption (and lazily unlocking the key if it wasn't loaded yet).
    pub fn update_forging_status(&self, public_key: &str, password: &str, forging: bool) -> ChainResult<()> {
        let delegate = self
            .config
            .forging
            .delegates
            .iter()
            .find(|d| d.public_key == public_key)
            .ok_or_else(|| ConfigError::Invalid(format!("no configured delegate {public_key}")))?;

        let signing_key = secrets::decrypt_passphrase(&delegate.encrypted_passphrase, password, public_key)?;
        self.keys.write().insert(public_key.to_string(), signing_key);
        self.enabled.write().insert(public_key.to_string(), forging);
        Ok(())
    }

    pub fn forging_status_for_all_delegates(&self) -> Vec<(String, bool)> {
        let enabled = self.enabled.read();
        self.config
            .forging
            .delegates
            .iter()
            .map(|d| (d.public_key.clone(), enabled.get(&d.public_key).copied().unwrap_or(false)))
            .collect()
    }

    /// Regenerates the round delegate list once `upcoming_height` has crossed
    /// into a round that hasn't been shuffled yet.
    async fn before_forge(&self, upcoming_height: u64, seed_block_id: &str) -> ChainResult<()> {
        let round = self.slots.calc_round(upcoming_height) as u64;
        if round == self.current_round.load(Ordering::Acquire) {
            return Ok(());
        }
        let accounts = self.store.get_all_accounts().await?;
        let list = self.blocks.rounds().generate_delegate_list(&accounts, seed_block_id);
        self.blocks.set_delegate_list(list);
        self.current_round.store(round, Ordering::Release);
        Ok(())
    }

    /// Builds, signs, and appends a block for the current slot if this node is
    /// the assigned delegate, that delegate is enabled, consensus allows it,
    /// and no block has been forged for this slot yet. A `None` return means
    /// any of those conditions wasn't met, not an error.
    pub async fn forge(&self, gate: &Sequence, now_epoch_secs: i64) -> ChainResult<Option<Block>> {
        let Some(last) = self.blocks.last_block() else {
            return Ok(None);
        };

        let current_slot = self.slots.get_slot_number(Some(now_epoch_secs));
        let last_slot = self.slots.get_slot_number(Some(last.timestamp as i64));
        if current_slot <= last_slot || self.last_forged_slot.load(Ordering::Acquire) == current_slot {
            return Ok(None);
        }

        self.before_forge(last.height + 1, &last.id).await?;

        let Some(delegate) = self.blocks.delegate_for_slot(current_slot) else {
            return Ok(None);
        };
        if !self.enabled.read().get(&delegate).copied().unwrap_or(false) {
            return Ok(None);
        }
        let Some(signing_key) = self.keys.read().get(&delegate).cloned() else {
            return Ok(None);
        };

        let consensus = self.peers.cached_last_consensus().unwrap_or(100.0);
        if self.peers.is_poor_consensus(consensus) {
            debug!(consensus, delegate, "skipping this slot: poor broadhash consensus");
            return Ok(None);
        }

        let block = self.build_block(&last, current_slot, &delegate, &signing_key);
        self.last_forged_slot.store(current_slot, Ordering::Release);
        self.blocks.process_block(gate, block.clone(), true).await?;
        Ok(Some(block))
    }

    fn build_block(&self, previous: &Block, slot: u64, delegate: &str, signing_key: &SigningKey) -> Block {
        let mut transactions = Vec::new();
        let mut payload_used = 0usize;
        for tx in self.pool.get_merged_transaction_list(false, self.config.max_transactions_per_block) {
            let size = tx.byte_size();
            if payload_used + size > self.config.max_payload_length {
                continue;
            }
            payload_used += size;
            transactions.push((*tx).clone());
            if transactions.len() >= self.config.max_transactions_per_block {
                break;
            }
        }

        let height = previous.height + 1;
        let timestamp = self.slots.get_slot_time(slot).max(0) as u64;
        let total_amount = transactions.iter().map(|t| t.amount).sum();
        let total_fee = transactions.iter().map(|t| t.fee).sum();
        let reward = self.rewards.calc_reward(height);

        let mut block = Block {
            id: String::new(),
            height,
            previous_block_id: Some(previous.id.clone()),
            timestamp,
            generator_public_key: delegate.to_string(),
            block_signature: String::new(),
            payload_hash: Block::compute_payload_hash(&transactions),
            payload_length: payload_used,
            number_of_transactions: transactions.len(),
            total_amount,
            total_fee,
            reward,
            transactions,
        };
        block.block_signature = hex::encode(signing_key.sign(&block.canonical_bytes()).to_bytes());
        block.id = block.compute_id();
        block
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chain_net::{PeerId, PeerInfo, PeerTransport};
    use chain_store::InMemoryChainStore;
    use chain_types::{
        Account, AccountTable, BlockId, EventBus, Transaction, TransactionAsset,
        TransactionHandler, TransactionRegistry, TransactionType,
    };
    use rand::rngs::OsRng;

    use super::*;

    struct PermissiveHandler;
    impl TransactionHandler for PermissiveHandler {
        fn transaction_type(&self) -> TransactionType {
            TransactionType::Transfer
        }
        fn validate(&self, _tx: &Transaction) -> ChainResult<()> {
            Ok(())
        }
        fn apply(&self, _tx: &Transaction, _accounts: &mut AccountTable) -> ChainResult<()> {
            Ok(())
        }
        fn undo(&self, _tx: &Transaction, _accounts: &mut AccountTable) -> ChainResult<()> {
            Ok(())
        }
    }

    struct NoPeers;
    #[async_trait]
    impl PeerTransport for NoPeers {
        async fn connected_peers(&self) -> ChainResult<Vec<PeerInfo>> {
            Ok(Vec::new())
        }
        async fn post_block(&self, _peer: &PeerId, _block: &Block) -> ChainResult<()> {
            Ok(())
        }
        async fn post_transactions(&self, _peer: &PeerId, _txs: &[Transaction]) -> ChainResult<()> {
            Ok(())
        }
        async fn get_transactions(&self, _peer: &PeerId, _limit: usize) -> ChainResult<Vec<Transaction>> {
            Ok(Vec::new())
        }
        async fn blocks_after(&self, _peer: &PeerId, _last: &BlockId, _limit: usize) -> ChainResult<Vec<Block>> {
            Ok(Vec::new())
        }
        async fn blocks_common(&self, _peer: &PeerId, _candidates: &[BlockId]) -> ChainResult<Option<BlockId>> {
            Ok(None)
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

    async fn harness() -> (Forger, Arc<Blocks>, Sequence, Pool, SigningKey, String) {
        let key = SigningKey::generate(&mut OsRng);
        let public_key = hex::encode(key.verifying_key().to_bytes());
        let delegate_address = chain_types::crypto::derive_address(&public_key).unwrap();

        let mut config = ChainConfig::default();
        config.active_delegates = 1;
        config.block_time_secs = 10;
        config.epoch_time_unix = 0;
        config.forging.delegates = vec![chain_types::config::EncryptedDelegate {
            public_key: public_key.clone(),
            encrypted_passphrase: secrets::encrypt_passphrase("hunter2", &key),
        }];
        let config = Arc::new(config);

        let slots = Slots::new(config.clone());
        let store: Arc<dyn ChainStore> = Arc::new(InMemoryChainStore::new());
        let mut registry = TransactionRegistry::default();
        registry.register(Box::new(PermissiveHandler));
        let registry = Arc::new(registry);
        let pool = Pool::new(config.clone(), registry.clone());
        let events = EventBus::default();
        let sequence = Sequence::new(&config);
        let blocks =
            Arc::new(Blocks::new(config.clone(), slots.clone(), store.clone(), pool.clone(), registry, events));
        let peers = Arc::new(Peers::new(config.clone(), Arc::new(NoPeers)));

        let forger = Forger::new(config.clone(), slots, store.clone(), blocks.clone(), pool.clone(), peers);

        // A single self-voted delegate account so `generate_delegate_list` has
        // something to pick.
        let mut account = Account::new(delegate_address);
        account.public_key = Some(public_key.clone());
        account.is_delegate = true;
        account.vote_weight = 100;
        store.with_transaction(Box::new(move |tx| tx.upsert_account(account))).await.unwrap();

        (forger, blocks, sequence, pool, key, public_key)
    }

    #[tokio::test]
    async fn forges_a_block_for_the_assigned_delegate_at_its_slot() {
        let (forger, blocks, gate, _pool, _key, public_key) = harness().await;
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        assert_eq!(forger.load_delegates("hunter2"), 1);

        let forged = forger.forge(&gate, 20).await.unwrap();
        let block = forged.expect("slot 2 is due and the delegate is enabled");
        assert_eq!(block.generator_public_key, public_key);
        assert_eq!(blocks.last_block().unwrap().id, block.id);
    }

    #[tokio::test]
    async fn does_not_forge_twice_for_the_same_slot() {
        let (forger, blocks, gate, _pool, _key, _public_key) = harness().await;
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        forger.load_delegates("hunter2");

        let first = forger.forge(&gate, 20).await.unwrap();
        assert!(first.is_some());
        let second = forger.forge(&gate, 21).await.unwrap();
        assert!(second.is_none(), "slot 2 was already forged");
    }

    #[tokio::test]
    async fn does_not_forge_when_the_delegate_key_is_locked() {
        let (forger, blocks, gate, _pool, _key, _public_key) = harness().await;
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        // load_delegates is never called, so no key is unlocked.

        let forged = forger.forge(&gate, 20).await.unwrap();
        assert!(forged.is_none());
    }

    #[tokio::test]
    async fn update_forging_status_rejects_the_wrong_password() {
        let (forger, _blocks, _gate, _pool, _key, public_key) = harness().await;
        let err = forger.update_forging_status(&public_key, "not the password", true).unwrap_err();
        assert!(matches!(err, chain_types::ChainError::Config(ConfigError::WrongPassword(_))));
    }

    #[tokio::test]
    async fn includes_ready_pool_transactions_in_the_forged_block() {
        let (forger, blocks, gate, pool, _key, public_key) = harness().await;
        blocks.load_blockchain(&gate, genesis(), None).await.unwrap();
        forger.load_delegates("hunter2");

        let sender_key = SigningKey::generate(&mut OsRng);
        let mut tx = Transaction {
            id: "tx1".into(),
            tx_type: TransactionType::Transfer,
            sender_public_key: hex::encode(sender_key.verifying_key().to_bytes()),
            sender_id: "alice".into(),
            recipient_id: Some("bob".into()),
            amount: 5,
            fee: 1,
            timestamp: 0,
            signature: String::new(),
            sign_signature: None,
            signatures: None,
            asset: TransactionAsset::default(),
        };
        tx.signature = hex::encode(sender_key.sign(&tx.canonical_bytes()).to_bytes());
        let tx_id = pool.add(tx).unwrap();
        pool.process_unconfirmed_transaction(&gate, &tx_id).unwrap();

        let block = forger.forge(&gate, 20).await.unwrap().unwrap();
        assert_eq!(block.number_of_transactions, 1);
        assert_eq!(block.generator_public_key, public_key);
    }
}
