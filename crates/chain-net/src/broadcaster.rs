use std::sync::Arc;

use chain_types::{Block, ChainConfig, Transaction};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use tracing::warn;

use crate::transport::{PeerId, PeerTransport};

const ANNOUNCEMENT_TTL_SECS: u64 = 60;

#[derive(Clone)]
enum Announcement {
    Block(Arc<Block>),
    Transactions(Arc<Vec<Transaction>>),
}

struct QueuedAnnouncement {
    announcement: Announcement,
    enqueued_at_secs: u64,
}

/// Outbound announcement queue drained on a timer by the node binary. Disabled
/// entirely (both enqueue and release become no-ops) when `broadcasts.active`
/// is false — matching `Transport`'s identical gating on inbound gossip.
pub struct Broadcaster {
    config: Arc<ChainConfig>,
    transport: Arc<dyn PeerTransport>,
    queue: Mutex<IndexMap<String, QueuedAnnouncement>>,
}

impl Broadcaster {
    pub fn new(config: Arc<ChainConfig>, transport: Arc<dyn PeerTransport>) -> Self {
        Self { config, transport, queue: Mutex::new(IndexMap::new()) }
    }

    fn active(&self) -> bool {
        self.config.broadcasts.active
    }

    pub fn enqueue_block(&self, block: Arc<Block>, now_secs: u64) {
        if !self.active() {
            return;
        }
        let key = format!("block:{}", block.id);
        self.queue.lock().insert(key, QueuedAnnouncement { announcement: Announcement::Block(block), enqueued_at_secs: now_secs });
    }

    pub fn enqueue_transactions(&self, transactions: Arc<Vec<Transaction>>, now_secs: u64) {
        if !self.active() || transactions.is_empty() {
            return;
        }
        let key = format!("transactions:{}", transactions[0].id);
        self.queue
            .lock()
            .insert(key, QueuedAnnouncement { announcement: Announcement::Transactions(transactions), enqueued_at_secs: now_secs });
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Drains up to `broadcasts.release_limit` surviving (non-expired)
    /// announcements to a random subset of connected peers. Per-peer RPC
    /// failures are logged and do not block the rest of the batch, and do not
    /// re-queue the announcement — the next cycle covers it if still pending.
    pub async fn release_batch(&self, now_secs: u64) {
        if !self.active() {
            return;
        }

        let batch: Vec<(String, Announcement)> = {
            let mut queue = self.queue.lock();
            queue.retain(|_, queued| now_secs.saturating_sub(queued.enqueued_at_secs) < ANNOUNCEMENT_TTL_SECS);
            let limit = self.config.broadcasts.release_limit;
            queue
                .drain(..queue.len().min(limit))
                .map(|(key, queued)| (key, queued.announcement))
                .collect()
        };
        if batch.is_empty() {
            return;
        }

        let peers = match self.transport.connected_peers().await {
            Ok(peers) => peers,
            Err(error) => {
                warn!(%error, "failed to list connected peers for broadcast");
                return;
            }
        };
        if peers.is_empty() {
            return;
        }

        let subset = random_subset(&peers.iter().map(|p| p.id.clone()).collect::<Vec<_>>(), self.config.max_peers as usize);

        for (_, announcement) in &batch {
            for peer in &subset {
                let result = match announcement {
                    Announcement::Block(block) => self.transport.post_block(peer, block).await,
                    Announcement::Transactions(txs) => self.transport.post_transactions(peer, txs).await,
                };
                if let Err(error) = result {
                    warn!(%error, peer, "broadcast to peer failed");
                }
            }
        }
    }
}

fn random_subset(peers: &[PeerId], max: usize) -> Vec<PeerId> {
    let mut rng = rand::thread_rng();
    let mut shuffled = peers.to_vec();
    shuffled.shuffle(&mut rng);
    shuffled.truncate(max.max(1));
    shuffled
}
