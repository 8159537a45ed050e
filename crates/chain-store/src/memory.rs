use chain_types::{
    Account, Address, Block, BlockId, ChainResult, PersistenceError, RoundReward, Transaction,
};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::store::{ChainStore, StoreTx, TransferDirection, TrsListQuery};

#[derive(Clone, Default)]
struct StoreState {
    /// Insertion order doubles as height order: blocks are only ever appended
    /// at the tip and deleted from the tip.
    blocks: IndexMap<BlockId, Block>,
    accounts: std::collections::HashMap<Address, Account>,
    round_rewards: Vec<RoundReward>,
}

/// Reference `ChainStore` used by tests and local/dev runs. Every write goes
/// through `with_transaction`, which stages the whole state on a clone and only
/// swaps it in if the closure succeeds — a real rollback, not a convention.
pub struct InMemoryChainStore {
    state: RwLock<StoreState>,
}

impl InMemoryChainStore {
    pub fn new() -> Self {
        Self { state: RwLock::new(StoreState::default()) }
    }
}

impl Default for InMemoryChainStore {
    fn default() -> Self {
        Self::new()
    }
}

struct InMemoryTx<'a> {
    state: &'a mut StoreState,
}

impl StoreTx for InMemoryTx<'_> {
    fn insert_block(&mut self, block: &Block) -> ChainResult<()> {
        if self.state.blocks.contains_key(&block.id) {
            return Err(PersistenceError::Transaction(format!("block {} already stored", block.id)).into());
        }
        self.state.blocks.insert(block.id.clone(), block.clone());
        Ok(())
    }

    fn delete_block(&mut self, id: &BlockId) -> ChainResult<Block> {
        let (removed_index, _, _) = self
            .state
            .blocks
            .get_full(id)
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))?;
        if removed_index != self.state.blocks.len() - 1 {
            return Err(PersistenceError::Transaction(format!("block {id} is not the current tip")).into());
        }
        self.state
            .blocks
            .shift_remove(id)
            .ok_or_else(|| PersistenceError::NotFound(id.clone()).into())
    }

    fn get_account(&self, address: &Address) -> ChainResult<Option<Account>> {
        Ok(self.state.accounts.get(address).cloned())
    }

    fn upsert_account(&mut self, account: Account) -> ChainResult<()> {
        self.state.accounts.insert(account.address.clone(), account);
        Ok(())
    }

    fn record_round_rewards(&mut self, rewards: &[RoundReward]) -> ChainResult<()> {
        self.state.round_rewards.extend_from_slice(rewards);
        Ok(())
    }

    fn take_round_rewards(&mut self, round: u32) -> ChainResult<Vec<RoundReward>> {
        let (matching, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.state.round_rewards).into_iter().partition(|r| r.round == round);
        self.state.round_rewards = rest;
        Ok(matching)
    }
}

#[async_trait::async_trait]
impl ChainStore for InMemoryChainStore {
    async fn with_transaction(
        &self,
        op: Box<dyn FnOnce(&mut dyn StoreTx) -> ChainResult<()> + Send + '_>,
    ) -> ChainResult<()> {
        let mut guard = self.state.write();
        let mut staged = guard.clone();
        {
            let mut tx = InMemoryTx { state: &mut staged };
            op(&mut tx)?;
        }
        *guard = staged;
        Ok(())
    }

    async fn get_last_block(&self) -> ChainResult<Option<Block>> {
        Ok(self.state.read().blocks.values().next_back().cloned())
    }

    async fn get_block_by_id(&self, id: &BlockId) -> ChainResult<Option<Block>> {
        Ok(self.state.read().blocks.get(id).cloned())
    }

    async fn get_block_at_height(&self, height: u64) -> ChainResult<Option<Block>> {
        Ok(self.state.read().blocks.values().find(|b| b.height == height).cloned())
    }

    async fn get_blocks_after(&self, last_block_id: &BlockId, limit: usize) -> ChainResult<Vec<Block>> {
        let state = self.state.read();
        let Some((index, _, _)) = state.blocks.get_full(last_block_id) else {
            return Ok(Vec::new());
        };
        Ok(state.blocks.values().skip(index + 1).take(limit).cloned().collect())
    }

    async fn get_blocks_between_heights(
        &self,
        from_height: u64,
        to_height: u64,
        limit: usize,
    ) -> ChainResult<Vec<Block>> {
        Ok(self
            .state
            .read()
            .blocks
            .values()
            .filter(|b| b.height > from_height && b.height <= to_height)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_common_block(&self, candidate_ids: &[BlockId]) -> ChainResult<Option<Block>> {
        let state = self.state.read();
        Ok(state
            .blocks
            .values()
            .rev()
            .find(|b| candidate_ids.iter().any(|id| id == &b.id))
            .cloned())
    }

    async fn get_last_block_at_or_before_timestamp(&self, timestamp: u64) -> ChainResult<Option<Block>> {
        Ok(self
            .state
            .read()
            .blocks
            .values()
            .rev()
            .find(|b| b.timestamp <= timestamp)
            .cloned())
    }

    async fn get_max_block_height(&self) -> ChainResult<u64> {
        Ok(self.state.read().blocks.values().next_back().map(|b| b.height).unwrap_or(0))
    }

    async fn get_account(&self, address: &Address) -> ChainResult<Option<Account>> {
        Ok(self.state.read().accounts.get(address).cloned())
    }

    async fn get_all_accounts(&self) -> ChainResult<Vec<Account>> {
        Ok(self.state.read().accounts.values().cloned().collect())
    }

    async fn get_round_rewards(&self, round: u32) -> ChainResult<Vec<RoundReward>> {
        Ok(self.state.read().round_rewards.iter().filter(|r| r.round == round).cloned().collect())
    }

    async fn query_trs_list(&self, query: TrsListQuery) -> ChainResult<Vec<(Transaction, BlockId)>> {
        let state = self.state.read();
        let blocks: Vec<&Block> = match &query.block_id {
            Some(id) => state.blocks.get(id).into_iter().collect(),
            None => state.blocks.values().collect(),
        };

        let mut matches: Vec<(Transaction, BlockId)> = blocks
            .into_iter()
            .flat_map(|block| block.transactions.iter().map(move |tx| (block, tx)))
            .filter(|(_, tx)| match query.direction {
                TransferDirection::Outbound => tx.sender_id == query.wallet_address,
                TransferDirection::Inbound => tx.recipient_id.as_deref() == Some(query.wallet_address.as_str()),
            })
            .filter(|(_, tx)| query.from_timestamp.map_or(true, |from| tx.timestamp >= from))
            .map(|(block, tx)| (tx.clone(), block.id.clone()))
            .collect();

        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }
}
