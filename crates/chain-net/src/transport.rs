use chain_types::{Block, BlockId, ChainResult, Transaction};

pub type PeerId = String;

/// What a connected peer last advertised about its own chain tip; used by
/// [`crate::peers::Peers::calculate_consensus`] to match against our own broadhash.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerInfo {
    pub id: PeerId,
    pub module_alias: String,
    pub broadhash: Option<String>,
    pub height: u64,
}

/// The network collaborator boundary: every outbound RPC the chain engine
/// issues to a single chosen peer. Implementations own their own connection
/// pooling, retries, and RPC timeouts — the engine only ever sees `ChainResult`.
#[async_trait::async_trait]
pub trait PeerTransport: Send + Sync {
    async fn connected_peers(&self) -> ChainResult<Vec<PeerInfo>>;

    async fn post_block(&self, peer: &PeerId, block: &Block) -> ChainResult<()>;

    async fn post_transactions(&self, peer: &PeerId, transactions: &[Transaction]) -> ChainResult<()>;

    async fn get_transactions(&self, peer: &PeerId, limit: usize) -> ChainResult<Vec<Transaction>>;

    /// Up to `limit` blocks (capped at 34 by callers) strictly after `last_block_id`.
    async fn blocks_after(&self, peer: &PeerId, last_block_id: &BlockId, limit: usize) -> ChainResult<Vec<Block>>;

    /// First of up to 1000 `candidate_ids` (tip-first) the peer still has.
    async fn blocks_common(&self, peer: &PeerId, candidate_ids: &[BlockId]) -> ChainResult<Option<BlockId>>;
}
