//! The module-action surface realized as one jsonrpsee trait, mirroring how
//! the teacher exposes `OrderApiServer`: every action in the table is a
//! method, named exactly as the action name on the wire.

use chain_pool::PoolFilters;
use chain_types::{Address, Block, BlockId, Transaction, TransactionType, TxId};
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub consensus: f64,
    pub loaded: bool,
    pub syncing: bool,
    pub unconfirmed_transactions: usize,
    pub seconds_since_epoch: i64,
    pub broadhash: String,
    pub module_alias: String,
    pub last_block: Option<Block>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocksResponse {
    pub success: bool,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocksCommonResponse {
    pub success: bool,
    pub common: Option<BlockId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostTransactionResponse {
    pub success: bool,
    pub transaction_id: TxId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTransactionsResponse {
    pub success: bool,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostBlockResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostTransactionsResponse {
    pub success: bool,
    pub accepted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgingStatusEntry {
    pub public_key: String,
    pub forging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateForgingStatusResponse {
    pub status: bool,
}

/// Echoes the boot-time constants `getModuleOptions` historically surfaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOptions {
    pub active_delegates: u32,
    pub block_time_secs: u64,
    pub max_transactions_per_block: usize,
    pub max_shared_transactions: usize,
    pub max_payload_length: usize,
    pub min_broadhash_consensus: f64,
}

#[rpc(server, client)]
pub trait ChainActionsApi {
    #[method(name = "calculateSupply")]
    async fn calculate_supply(&self, height: u64) -> RpcResult<String>;

    #[method(name = "calculateMilestone")]
    async fn calculate_milestone(&self, height: u64) -> RpcResult<u64>;

    #[method(name = "calculateReward")]
    async fn calculate_reward(&self, height: u64) -> RpcResult<String>;

    #[method(name = "generateDelegateList")]
    async fn generate_delegate_list(&self, round: u32, source: Option<BlockId>) -> RpcResult<Vec<String>>;

    #[method(name = "updateForgingStatus")]
    async fn update_forging_status(
        &self,
        public_key: String,
        password: String,
        forging: bool,
    ) -> RpcResult<UpdateForgingStatusResponse>;

    #[method(name = "getForgingStatusForAllDelegates")]
    async fn get_forging_status_for_all_delegates(&self) -> RpcResult<Vec<ForgingStatusEntry>>;

    #[method(name = "getTransactions")]
    async fn get_transactions(&self) -> RpcResult<GetTransactionsResponse>;

    #[method(name = "getTransactionsFromPool")]
    async fn get_transactions_from_pool(
        &self,
        tx_type: Option<TransactionType>,
        filters: PoolFilters,
    ) -> RpcResult<Vec<Transaction>>;

    #[method(name = "postTransaction")]
    async fn post_transaction(&self, transaction: Transaction) -> RpcResult<PostTransactionResponse>;

    /// Bundled peer-gossip ingest: best-effort, skips and logs transactions
    /// that fail pool admission rather than rejecting the whole batch.
    #[method(name = "postTransactions")]
    async fn post_transactions(&self, transactions: Vec<Transaction>) -> RpcResult<PostTransactionsResponse>;

    /// Inbound peer-gossip block ingest. Passes through to the same
    /// fork-aware commit path as a locally forged block.
    #[method(name = "postBlock")]
    async fn post_block(&self, block: Block) -> RpcResult<PostBlockResponse>;

    #[method(name = "getNodeStatus")]
    async fn get_node_status(&self) -> RpcResult<NodeStatusResponse>;

    #[method(name = "getLastBlock")]
    async fn get_last_block(&self) -> RpcResult<Option<Block>>;

    #[method(name = "blocks")]
    async fn blocks(&self, last_block_id: BlockId) -> RpcResult<BlocksResponse>;

    #[method(name = "blocksCommon")]
    async fn blocks_common(&self, ids: Vec<BlockId>) -> RpcResult<BlocksCommonResponse>;

    #[method(name = "getSlotNumber")]
    async fn get_slot_number(&self, epoch_time: Option<i64>) -> RpcResult<u64>;

    #[method(name = "calcSlotRound")]
    async fn calc_slot_round(&self, height: u64) -> RpcResult<u32>;

    #[method(name = "getMultisigWalletMembers")]
    async fn get_multisig_wallet_members(&self, wallet_address: Address) -> RpcResult<Vec<Address>>;

    #[method(name = "getMinMultisigRequiredSignatures")]
    async fn get_min_multisig_required_signatures(&self, wallet_address: Address) -> RpcResult<u8>;

    #[method(name = "getInboundTransactions")]
    async fn get_inbound_transactions(
        &self,
        wallet_address: Address,
        from_timestamp: Option<u64>,
        limit: Option<usize>,
    ) -> RpcResult<Vec<chain_types::SanitizedTransaction>>;

    #[method(name = "getOutboundTransactions")]
    async fn get_outbound_transactions(
        &self,
        wallet_address: Address,
        from_timestamp: Option<u64>,
        limit: Option<usize>,
    ) -> RpcResult<Vec<chain_types::SanitizedTransaction>>;

    #[method(name = "getInboundTransactionsFromBlock")]
    async fn get_inbound_transactions_from_block(
        &self,
        wallet_address: Address,
        block_id: BlockId,
    ) -> RpcResult<Vec<chain_types::SanitizedTransaction>>;

    #[method(name = "getOutboundTransactionsFromBlock")]
    async fn get_outbound_transactions_from_block(
        &self,
        wallet_address: Address,
        block_id: BlockId,
    ) -> RpcResult<Vec<chain_types::SanitizedTransaction>>;

    #[method(name = "getLastBlockAtTimestamp")]
    async fn get_last_block_at_timestamp(&self, timestamp: u64) -> RpcResult<Option<Block>>;

    #[method(name = "getMaxBlockHeight")]
    async fn get_max_block_height(&self) -> RpcResult<u64>;

    #[method(name = "getBlocksBetweenHeights")]
    async fn get_blocks_between_heights(&self, from_height: u64, to_height: u64, limit: usize) -> RpcResult<Vec<Block>>;

    #[method(name = "getBlockAtHeight")]
    async fn get_block_at_height(&self, height: u64) -> RpcResult<Option<Block>>;

    #[method(name = "getModuleOptions")]
    async fn get_module_options(&self) -> RpcResult<ModuleOptions>;
}
