use std::sync::Arc;

use crate::{block::Block, transaction::Transaction};

/// Immutable value messages published on the `EventBus`. Subscribers never mutate
/// them; this is the explicit message-passing replacement for the source's
/// event-emitter subscription cycle between Blocks, TransactionPool, and Transport.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    NewBlock(Arc<Block>),
    DeleteBlock(Arc<Block>),
    BroadcastBlock(Arc<Block>),
    NewBroadhash { broadhash: String, height: u64 },
    UnconfirmedTransaction(Arc<Transaction>),
    ConfirmedTransactions(Arc<Vec<Transaction>>),
    TransactionsChanged,
    SignatureChanged,
    StoreWarning(String),
    Bootstrap,
}
