use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chain_blocks::Blocks;
use chain_net::PeerTransport;
use chain_pool::Pool;
use chain_sequence::Sequence;
use chain_store::ChainStore;
use chain_types::{BlockId, ChainResult, NetworkError};
use tracing::{debug, warn};

/// `blocksCommon`/`blocks` both cap their batch size at these limits.
const MAX_COMMON_CANDIDATES: usize = 1000;
const MAX_BLOCKS_PER_FETCH: usize = 34;

/// Bootstraps the unconfirmed-transaction pool from a peer at startup, and
/// drives the periodic catch-up sync against whichever peer is chosen.
pub struct Loader {
    store: Arc<dyn ChainStore>,
    blocks: Arc<Blocks>,
    pool: Pool,
    transport: Arc<dyn PeerTransport>,
    syncing: AtomicBool,
}

impl Loader {
    pub fn new(store: Arc<dyn ChainStore>, blocks: Arc<Blocks>, pool: Pool, transport: Arc<dyn PeerTransport>) -> Self {
        Self { store, blocks, pool, transport, syncing: AtomicBool::new(false) }
    }

    pub fn syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    async fn pick_peer(&self) -> ChainResult<String> {
        let peers = self.transport.connected_peers().await?;
        peers.into_iter().next().map(|p| p.id).ok_or_else(|| NetworkError::NoPeers.into())
    }

    /// Pulls the peer's shared unconfirmed-transaction pool once at startup.
    pub async fn load_unconfirmed_transactions(&self) -> ChainResult<()> {
        let peer = self.pick_peer().await?;
        let transactions = self.transport.get_transactions(&peer, usize::MAX).await?;
        for tx in transactions {
            if let Err(error) = self.pool.add(tx) {
                debug!(%error, "skipped a peer-supplied unconfirmed transaction");
            }
        }
        Ok(())
    }

    /// Tip-first block ids, newest first, used as `blocksCommon` candidates.
    async fn recent_candidate_ids(&self) -> ChainResult<Vec<BlockId>> {
        let tip_height = self.store.get_max_block_height().await?;
        let from = tip_height.saturating_sub(MAX_COMMON_CANDIDATES as u64);
        let mut ids: Vec<BlockId> = self
            .store
            .get_blocks_between_heights(from, tip_height, MAX_COMMON_CANDIDATES)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();
        ids.reverse();
        Ok(ids)
    }

    /// Finds the fork point with a chosen peer and replays everything after it
    /// until the peer reports no more blocks or our tip catches up.
    pub async fn sync(&self, gate: &Sequence) -> ChainResult<()> {
        if self.syncing.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.blocks.set_syncing(true);
        let result = self.run_sync(gate).await;
        self.blocks.set_syncing(false);
        self.syncing.store(false, Ordering::Release);
        result
    }

    async fn run_sync(&self, gate: &Sequence) -> ChainResult<()> {
        let peer = self.pick_peer().await?;
        let candidates = self.recent_candidate_ids().await?;
        let Some(common_id) = self.transport.blocks_common(&peer, &candidates).await? else {
            warn!(peer, "no common block found with peer; skipping this sync cycle");
            return Ok(());
        };

        let mut cursor = common_id;
        loop {
            let batch = self.transport.blocks_after(&peer, &cursor, MAX_BLOCKS_PER_FETCH).await?;
            if batch.is_empty() {
                break;
            }
            let advanced_to_last = batch.len() < MAX_BLOCKS_PER_FETCH;
            for block in &batch {
                cursor = block.id.clone();
                self.blocks.receive_block_from_network(gate, block.clone()).await?;
            }
            if advanced_to_last {
                break;
            }
        }
        Ok(())
    }

    /// The periodic 10s job: skipped while already syncing or while the local
    /// tip is still fresh.
    pub async fn tick(&self, gate: &Sequence, now_unix_secs: u64) -> ChainResult<()> {
        if self.syncing() || !self.blocks.is_stale(now_unix_secs) {
            return Ok(());
        }
        self.sync(gate).await
    }
}
