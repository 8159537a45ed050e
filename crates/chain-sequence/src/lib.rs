//! The single global mutation gate. Every authoritative-state change — block
//! append, block delete, forging, a sync batch, pool ingest that touches the
//! `u_state` shadow — is enqueued here and runs strictly in FIFO order, one task
//! at a time. This replaces the source's promise-chaining serializer with an
//! explicit single-consumer task queue with a bounded-backlog warning and a
//! real shutdown path.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use chain_types::ChainConfig;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Job = Box<dyn FnOnce() -> BoxFuture + Send>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceError {
    #[error("sequence was shut down before this task ran")]
    Closed,
}

/// A FIFO serializer with a bounded-backlog warning. Cloning a `Sequence` shares
/// the same underlying worker and backlog counter.
#[derive(Clone)]
pub struct Sequence {
    sender: mpsc::UnboundedSender<Job>,
    backlog: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    warn_threshold: usize,
}

impl Sequence {
    pub fn new(config: &ChainConfig) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let backlog = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicBool::new(false));

        let worker_backlog = backlog.clone();
        let worker_closed = closed.clone();
        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                if !worker_closed.load(Ordering::Acquire) {
                    job().await;
                }
                worker_backlog.fetch_sub(1, Ordering::AcqRel);
            }
        });

        Self { sender, backlog, closed, warn_threshold: config.sequence.warn_threshold }
    }

    /// Enqueues `future` and awaits its result. Resolves only after every task
    /// enqueued earlier has fully resolved (or been rejected by `shutdown`).
    pub async fn add<F, T>(&self, future: F) -> Result<T, SequenceError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let value = future.await;
                let _ = reply_tx.send(value);
            })
        });

        let pending = self.backlog.fetch_add(1, Ordering::AcqRel) + 1;
        if pending > self.warn_threshold {
            tracing::warn!(pending, threshold = self.warn_threshold, "sequence backlog crossed warn threshold");
        }

        self.sender.send(job).map_err(|_| SequenceError::Closed)?;
        reply_rx.await.map_err(|_| SequenceError::Closed)
    }

    /// Current number of tasks enqueued but not yet completed.
    pub fn pending_len(&self) -> usize {
        self.backlog.load(Ordering::Acquire)
    }

    /// Rejects every task still queued (not yet started) with `SequenceError::Closed`
    /// and prevents new tasks from running. Already-running tasks finish normally.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
