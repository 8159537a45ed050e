//! Owns every long-lived collaborator and the background jobs that drive
//! them: forging, catch-up sync, consensus refresh, and broadcast release.
//! This is the only place in the binary that holds component lifetimes long
//! enough to tear them down in order on shutdown.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{SystemTime, UNIX_EPOCH};

use chain_blocks::Blocks;
use chain_forger::Forger;
use chain_net::{Broadcaster, PeerTransport, Peers};
use chain_pool::Pool;
use chain_rpc::ChainApi;
use chain_sequence::Sequence;
use chain_slots::Slots;
use chain_store::ChainStore;
use chain_sync::Loader;
use chain_types::{ChainConfig, ChainError, ChainEvent::BroadcastBlock, ChainResult, EventBus};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

fn now_unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Every component the binary assembles at boot, plus the handles of the
/// periodic jobs running against them.
pub struct Chain {
    config: Arc<ChainConfig>,
    slots: Slots,
    store: Arc<dyn ChainStore>,
    pool: Pool,
    blocks: Arc<Blocks>,
    peers: Arc<Peers>,
    forger: Arc<Forger>,
    loader: Arc<Loader>,
    broadcaster: Arc<Broadcaster>,
    sequence: Sequence,
    events: EventBus,

    jobs: std::sync::Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
}

impl Chain {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<ChainConfig>,
        slots: Slots,
        store: Arc<dyn ChainStore>,
        pool: Pool,
        blocks: Arc<Blocks>,
        transport: Arc<dyn PeerTransport>,
        sequence: Sequence,
        events: EventBus,
    ) -> Self {
        let peers = Arc::new(Peers::new(config.clone(), transport.clone()));
        let forger = Arc::new(Forger::new(
            config.clone(),
            slots.clone(),
            store.clone(),
            blocks.clone(),
            pool.clone(),
            peers.clone(),
        ));
        let loader = Arc::new(Loader::new(store.clone(), blocks.clone(), pool.clone(), transport.clone()));
        let broadcaster = Arc::new(Broadcaster::new(config.clone(), transport));

        Self {
            config,
            slots,
            store,
            pool,
            blocks,
            peers,
            forger,
            loader,
            broadcaster,
            sequence,
            events,
            jobs: std::sync::Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn to_api(&self) -> ChainApi {
        ChainApi::new(
            self.config.clone(),
            self.slots.clone(),
            self.store.clone(),
            self.pool.clone(),
            self.blocks.clone(),
            self.peers.clone(),
            self.forger.clone(),
            self.sequence.clone(),
            self.broadcaster.clone(),
        )
    }

    pub fn forger(&self) -> &Arc<Forger> {
        &self.forger
    }

    /// Pulls the peer pool's unconfirmed transactions once, then starts the
    /// forge/sync/consensus/broadcast timer loops and the `BroadcastBlock`
    /// subscriber. Idempotent: a second call is a no-op.
    pub async fn start(self: &Arc<Self>) -> ChainResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if self.config.syncing.active {
            if let Err(error) = self.loader.load_unconfirmed_transactions().await {
                warn!(%error, "failed to load unconfirmed transactions from a peer at startup");
            }
        }

        let mut jobs = self.jobs.lock().expect("jobs mutex poisoned");
        jobs.push(self.spawn_forge_loop());
        jobs.push(self.spawn_sync_loop());
        jobs.push(self.spawn_consensus_loop());
        jobs.push(self.spawn_broadcast_loop());
        jobs.push(self.spawn_broadcast_subscriber());
        drop(jobs);

        info!("chain started");
        Ok(())
    }

    fn spawn_forge_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let chain = self.clone();
        let interval_ms = self.config.forging.forge_interval_ms.max(1);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(interval_ms));
            loop {
                ticker.tick().await;
                let now = now_unix_secs() as i64;
                if let Err(error) = chain.forger.forge(&chain.sequence, now).await {
                    error!(%error, "forge attempt failed");
                }
            }
        })
    }

    fn spawn_sync_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let chain = self.clone();
        let interval_ms = self.config.syncing.sync_interval_ms.max(1);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(interval_ms));
            loop {
                ticker.tick().await;
                if !chain.config.syncing.active {
                    continue;
                }
                if let Err(error) = chain.loader.tick(&chain.sequence, now_unix_secs()).await {
                    error!(%error, "sync tick failed");
                }
            }
        })
    }

    fn spawn_consensus_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let chain = self.clone();
        let interval_ms = self.config.syncing.sync_interval_ms.max(1);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(interval_ms));
            loop {
                ticker.tick().await;
                let broadhash = chain.blocks.broadhash();
                if let Err(error) = chain.peers.refresh_consensus(&broadhash).await {
                    error!(%error, "consensus refresh failed");
                }
            }
        })
    }

    fn spawn_broadcast_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let chain = self.clone();
        let interval_ms = self.config.broadcasts.broadcast_interval_ms.max(1);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(interval_ms));
            loop {
                ticker.tick().await;
                if !chain.config.broadcasts.active {
                    continue;
                }
                chain.broadcaster.release_batch(now_unix_secs()).await;
            }
        })
    }

    /// Feeds every `BroadcastBlock` event straight onto the outbound queue.
    fn spawn_broadcast_subscriber(self: &Arc<Self>) -> JoinHandle<()> {
        let chain = self.clone();
        let mut receiver = self.events.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(BroadcastBlock(block)) => chain.broadcaster.enqueue_block(block, now_unix_secs()),
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "broadcast subscriber lagged behind the event bus");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Five-step shutdown: (1) unsubscribe by dropping the timer/subscriber
    /// tasks, (2) cancel them, (3)-(4) best-effort cleanup of each component
    /// and the store, logging failures rather than aborting the rest.
    pub async fn cleanup(&self, cause: Option<&ChainError>) {
        if let Some(error) = cause {
            error!(%error, "chain shutting down due to a fatal error");
        } else {
            info!("chain shutting down");
        }

        self.running.store(false, Ordering::Release);
        let jobs = std::mem::take(&mut *self.jobs.lock().expect("jobs mutex poisoned"));
        for job in jobs {
            job.abort();
        }

        self.sequence.shutdown();
    }
}
