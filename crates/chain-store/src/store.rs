use chain_types::{Account, Address, Block, BlockId, ChainResult, RoundReward, Transaction};

/// Which side of a wallet's transaction history a `query_trs_list` call wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Inbound,
    Outbound,
}

/// Parameters for the `getInboundTransactions`/`getOutboundTransactions` family
/// of module actions (including the `...FromBlock` variants, via `block_id`).
#[derive(Debug, Clone)]
pub struct TrsListQuery {
    pub wallet_address: Address,
    pub direction: TransferDirection,
    pub from_timestamp: Option<u64>,
    pub block_id: Option<BlockId>,
    pub limit: Option<usize>,
}

/// A single atomic write against the store. Handed to the closure passed to
/// `ChainStore::with_transaction`; nothing outside that closure can observe a
/// partial write, and an `Err` returned from the closure discards every change
/// made through it.
pub trait StoreTx: Send {
    fn insert_block(&mut self, block: &Block) -> ChainResult<()>;

    /// Removes and returns the block identified by `id`. Used by delete-block;
    /// callers are expected to only ever delete the current tip.
    fn delete_block(&mut self, id: &BlockId) -> ChainResult<Block>;

    /// Reads an account as it stands so far within this transaction.
    fn get_account(&self, address: &Address) -> ChainResult<Option<Account>>;

    fn upsert_account(&mut self, account: Account) -> ChainResult<()>;

    fn record_round_rewards(&mut self, rewards: &[RoundReward]) -> ChainResult<()>;

    /// Removes and returns `round`'s reward rows, used to mirror-undo a round
    /// settlement when the block that triggered it is reorged away.
    fn take_round_rewards(&mut self, round: u32) -> ChainResult<Vec<RoundReward>>;
}

/// The relational store boundary. Read methods take `&self` and never
/// participate in a `with_transaction` rollback; only writes issued through
/// `with_transaction` are atomic.
#[async_trait::async_trait]
pub trait ChainStore: Send + Sync {
    /// Runs `op` against a fresh transaction; commits iff `op` returns `Ok`.
    async fn with_transaction(
        &self,
        op: Box<dyn FnOnce(&mut dyn StoreTx) -> ChainResult<()> + Send + '_>,
    ) -> ChainResult<()>;

    async fn get_last_block(&self) -> ChainResult<Option<Block>>;

    async fn get_block_by_id(&self, id: &BlockId) -> ChainResult<Option<Block>>;

    async fn get_block_at_height(&self, height: u64) -> ChainResult<Option<Block>>;

    /// Up to `limit` blocks strictly after `last_block_id`, ascending by height.
    async fn get_blocks_after(&self, last_block_id: &BlockId, limit: usize) -> ChainResult<Vec<Block>>;

    /// Exclusive lower bound, inclusive upper bound, ascending by height.
    async fn get_blocks_between_heights(
        &self,
        from_height: u64,
        to_height: u64,
        limit: usize,
    ) -> ChainResult<Vec<Block>>;

    /// First block (searching from the tip backwards) whose id appears in
    /// `candidate_ids`, used for fork-point discovery.
    async fn find_common_block(&self, candidate_ids: &[BlockId]) -> ChainResult<Option<Block>>;

    async fn get_last_block_at_or_before_timestamp(&self, timestamp: u64) -> ChainResult<Option<Block>>;

    async fn get_max_block_height(&self) -> ChainResult<u64>;

    async fn get_account(&self, address: &Address) -> ChainResult<Option<Account>>;

    /// All accounts, used by `generateDelegateList`'s top-N-by-vote-weight scan.
    async fn get_all_accounts(&self) -> ChainResult<Vec<Account>>;

    async fn get_round_rewards(&self, round: u32) -> ChainResult<Vec<RoundReward>>;

    /// Raw matches for a wallet's transaction history; `(transaction, containing block id)`.
    /// Sanitizing into `SanitizedTransaction` (which needs the sender `Account` for
    /// multisig resolution) is the caller's job.
    async fn query_trs_list(&self, query: TrsListQuery) -> ChainResult<Vec<(Transaction, BlockId)>>;
}
