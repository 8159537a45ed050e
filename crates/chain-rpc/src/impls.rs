use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use chain_blocks::{Blocks, BlockchainState, Rewards};
use chain_forger::Forger;
use chain_net::{Broadcaster, Peers};
use chain_pool::{Pool, PoolFilters};
use chain_sequence::Sequence;
use chain_slots::Slots;
use chain_store::{ChainStore, TransferDirection, TrsListQuery};
use chain_types::{
    crypto, Address, Block, BlockId, ChainConfig, SanitizedTransaction, Transaction, TransactionType,
};
use jsonrpsee::core::RpcResult;
use tracing::debug;

use crate::{
    api::{
        BlocksCommonResponse, BlocksResponse, ChainActionsApiServer, ForgingStatusEntry, GetTransactionsResponse,
        ModuleOptions, NodeStatusResponse, PostBlockResponse, PostTransactionResponse, PostTransactionsResponse,
        UpdateForgingStatusResponse,
    },
    error::ChainApiError,
};

/// `blocks`/`blocksCommon` batch caps, named the same as `chain-sync`'s loader limits.
const MAX_BLOCKS_PER_FETCH: usize = 34;
const MAX_COMMON_CANDIDATES: usize = 1000;

fn now_unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Read-through RPC façade over the node's in-process collaborators. Holds no
/// state of its own; every action defers to whichever component owns it.
pub struct ChainApi {
    config: Arc<ChainConfig>,
    slots: Slots,
    rewards: Rewards,
    store: Arc<dyn ChainStore>,
    pool: Pool,
    blocks: Arc<Blocks>,
    peers: Arc<Peers>,
    forger: Arc<Forger>,
    sequence: Sequence,
    broadcaster: Arc<Broadcaster>,
}

impl ChainApi {
    pub fn new(
        config: Arc<ChainConfig>,
        slots: Slots,
        store: Arc<dyn ChainStore>,
        pool: Pool,
        blocks: Arc<Blocks>,
        peers: Arc<Peers>,
        forger: Arc<Forger>,
        sequence: Sequence,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        let rewards = Rewards::new(config.clone());
        Self { config, slots, rewards, store, pool, blocks, peers, forger, sequence, broadcaster }
    }

    async fn sanitize_matches(
        &self,
        matches: Vec<(Transaction, BlockId)>,
    ) -> RpcResult<Vec<SanitizedTransaction>> {
        let mut sanitized = Vec::with_capacity(matches.len());
        for (tx, block_id) in matches {
            let sender = self.store.get_account(&tx.sender_id).await.map_err(ChainApiError::from)?;
            sanitized.push(SanitizedTransaction::from_transaction(&tx, Some(block_id), sender.as_ref()));
        }
        Ok(sanitized)
    }
}

#[async_trait::async_trait]
impl ChainActionsApiServer for ChainApi {
    async fn calculate_supply(&self, height: u64) -> RpcResult<String> {
        Ok(self.rewards.calc_supply(height).to_string())
    }

    async fn calculate_milestone(&self, height: u64) -> RpcResult<u64> {
        Ok(self.rewards.calc_milestone(height) as u64)
    }

    async fn calculate_reward(&self, height: u64) -> RpcResult<String> {
        Ok(self.rewards.calc_reward(height).to_string())
    }

    async fn generate_delegate_list(&self, _round: u32, source: Option<BlockId>) -> RpcResult<Vec<String>> {
        let seed_block_id = match source {
            Some(id) => id,
            None => self.blocks.last_block().map(|b| b.id).unwrap_or_default(),
        };
        let accounts = self.store.get_all_accounts().await.map_err(ChainApiError::from)?;
        Ok(self.blocks.rounds().generate_delegate_list(&accounts, &seed_block_id))
    }

    async fn update_forging_status(
        &self,
        public_key: String,
        password: String,
        forging: bool,
    ) -> RpcResult<UpdateForgingStatusResponse> {
        self.forger
            .update_forging_status(&public_key, &password, forging)
            .map_err(ChainApiError::from)?;
        Ok(UpdateForgingStatusResponse { status: forging })
    }

    async fn get_forging_status_for_all_delegates(&self) -> RpcResult<Vec<ForgingStatusEntry>> {
        Ok(self
            .forger
            .forging_status_for_all_delegates()
            .into_iter()
            .map(|(public_key, forging)| ForgingStatusEntry { public_key, forging })
            .collect())
    }

    async fn get_transactions(&self) -> RpcResult<GetTransactionsResponse> {
        let transactions = self
            .pool
            .get_merged_transaction_list(false, self.config.max_shared_transactions)
            .into_iter()
            .map(|tx| (*tx).clone())
            .collect();
        Ok(GetTransactionsResponse { success: true, transactions })
    }

    async fn get_transactions_from_pool(
        &self,
        tx_type: Option<TransactionType>,
        filters: PoolFilters,
    ) -> RpcResult<Vec<Transaction>> {
        Ok(self.pool.get_pooled_transactions(tx_type, &filters).into_iter().map(|tx| (*tx).clone()).collect())
    }

    async fn post_transaction(&self, transaction: Transaction) -> RpcResult<PostTransactionResponse> {
        let transaction_id = self.pool.add(transaction.clone()).map_err(ChainApiError::InvalidTransaction)?;
        self.broadcaster.enqueue_transactions(Arc::new(vec![transaction]), now_unix_secs());
        Ok(PostTransactionResponse { success: true, transaction_id })
    }

    async fn post_transactions(&self, transactions: Vec<Transaction>) -> RpcResult<PostTransactionsResponse> {
        let mut accepted = 0;
        for tx in transactions {
            match self.pool.add(tx) {
                Ok(_) => accepted += 1,
                Err(error) => debug!(%error, "skipped a peer-supplied unconfirmed transaction"),
            }
        }
        Ok(PostTransactionsResponse { success: true, accepted })
    }

    async fn post_block(&self, block: Block) -> RpcResult<PostBlockResponse> {
        if matches!(self.blocks.state(), BlockchainState::Syncing) {
            return Ok(PostBlockResponse { success: false });
        }
        self.blocks.receive_block_from_network(&self.sequence, block).await.map_err(ChainApiError::from)?;
        Ok(PostBlockResponse { success: true })
    }

    async fn get_node_status(&self) -> RpcResult<NodeStatusResponse> {
        let counts = self.pool.get_count();
        let state = self.blocks.state();
        Ok(NodeStatusResponse {
            consensus: self.peers.cached_last_consensus().unwrap_or(100.0),
            loaded: !matches!(state, BlockchainState::Loading),
            syncing: matches!(state, BlockchainState::Syncing),
            unconfirmed_transactions: counts.received + counts.validated + counts.ready + counts.pending,
            seconds_since_epoch: self.slots.get_epoch_time(None),
            broadhash: self.blocks.broadhash(),
            module_alias: self.config.module_alias.clone(),
            last_block: self.blocks.last_block(),
        })
    }

    async fn get_last_block(&self) -> RpcResult<Option<Block>> {
        Ok(self.blocks.last_block())
    }

    async fn blocks(&self, last_block_id: BlockId) -> RpcResult<BlocksResponse> {
        let blocks = self
            .store
            .get_blocks_after(&last_block_id, MAX_BLOCKS_PER_FETCH)
            .await
            .map_err(ChainApiError::from)?;
        Ok(BlocksResponse { success: true, blocks })
    }

    async fn blocks_common(&self, ids: Vec<BlockId>) -> RpcResult<BlocksCommonResponse> {
        if ids.len() > MAX_COMMON_CANDIDATES {
            return Err(ChainApiError::TooManyCandidates(ids.len()).into());
        }
        let common = self.store.find_common_block(&ids).await.map_err(ChainApiError::from)?.map(|b| b.id);
        Ok(BlocksCommonResponse { success: true, common })
    }

    async fn get_slot_number(&self, epoch_time: Option<i64>) -> RpcResult<u64> {
        Ok(self.slots.get_slot_number(epoch_time))
    }

    async fn calc_slot_round(&self, height: u64) -> RpcResult<u32> {
        Ok(self.slots.calc_round(height))
    }

    async fn get_multisig_wallet_members(&self, wallet_address: Address) -> RpcResult<Vec<Address>> {
        let account = self.store.get_account(&wallet_address).await.map_err(ChainApiError::from)?;
        Ok(account
            .map(|a| a.multisignatures.iter().filter_map(|pk| crypto::derive_address(pk).ok()).collect())
            .unwrap_or_default())
    }

    async fn get_min_multisig_required_signatures(&self, wallet_address: Address) -> RpcResult<u8> {
        let account = self.store.get_account(&wallet_address).await.map_err(ChainApiError::from)?;
        match account.filter(|a| a.is_multisig()) {
            Some(account) => Ok(account.multimin),
            None => Err(ChainApiError::NotMultisig(wallet_address).into()),
        }
    }

    async fn get_inbound_transactions(
        &self,
        wallet_address: Address,
        from_timestamp: Option<u64>,
        limit: Option<usize>,
    ) -> RpcResult<Vec<SanitizedTransaction>> {
        let matches = self
            .store
            .query_trs_list(TrsListQuery {
                wallet_address,
                direction: TransferDirection::Inbound,
                from_timestamp,
                block_id: None,
                limit,
            })
            .await
            .map_err(ChainApiError::from)?;
        self.sanitize_matches(matches).await
    }

    async fn get_outbound_transactions(
        &self,
        wallet_address: Address,
        from_timestamp: Option<u64>,
        limit: Option<usize>,
    ) -> RpcResult<Vec<SanitizedTransaction>> {
        let matches = self
            .store
            .query_trs_list(TrsListQuery {
                wallet_address,
                direction: TransferDirection::Outbound,
                from_timestamp,
                block_id: None,
                limit,
            })
            .await
            .map_err(ChainApiError::from)?;
        self.sanitize_matches(matches).await
    }

    async fn get_inbound_transactions_from_block(
        &self,
        wallet_address: Address,
        block_id: BlockId,
    ) -> RpcResult<Vec<SanitizedTransaction>> {
        let matches = self
            .store
            .query_trs_list(TrsListQuery {
                wallet_address,
                direction: TransferDirection::Inbound,
                from_timestamp: None,
                block_id: Some(block_id),
                limit: None,
            })
            .await
            .map_err(ChainApiError::from)?;
        self.sanitize_matches(matches).await
    }

    async fn get_outbound_transactions_from_block(
        &self,
        wallet_address: Address,
        block_id: BlockId,
    ) -> RpcResult<Vec<SanitizedTransaction>> {
        let matches = self
            .store
            .query_trs_list(TrsListQuery {
                wallet_address,
                direction: TransferDirection::Outbound,
                from_timestamp: None,
                block_id: Some(block_id),
                limit: None,
            })
            .await
            .map_err(ChainApiError::from)?;
        self.sanitize_matches(matches).await
    }

    async fn get_last_block_at_timestamp(&self, timestamp: u64) -> RpcResult<Option<Block>> {
        Ok(self.store.get_last_block_at_or_before_timestamp(timestamp).await.map_err(ChainApiError::from)?)
    }

    async fn get_max_block_height(&self) -> RpcResult<u64> {
        Ok(self.store.get_max_block_height().await.map_err(ChainApiError::from)?)
    }

    async fn get_blocks_between_heights(&self, from_height: u64, to_height: u64, limit: usize) -> RpcResult<Vec<Block>> {
        Ok(self.store.get_blocks_between_heights(from_height, to_height, limit).await.map_err(ChainApiError::from)?)
    }

    async fn get_block_at_height(&self, height: u64) -> RpcResult<Option<Block>> {
        Ok(self.store.get_block_at_height(height).await.map_err(ChainApiError::from)?)
    }

    async fn get_module_options(&self) -> RpcResult<ModuleOptions> {
        Ok(ModuleOptions {
            active_delegates: self.config.active_delegates,
            block_time_secs: self.config.block_time_secs,
            max_transactions_per_block: self.config.max_transactions_per_block,
            max_shared_transactions: self.config.max_shared_transactions,
            max_payload_length: self.config.max_payload_length,
            min_broadhash_consensus: self.config.min_broadhash_consensus,
        })
    }
}
