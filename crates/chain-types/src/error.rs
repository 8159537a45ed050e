use thiserror::Error;

/// Malformed or schema-invalid inbound data (transaction, block, or RPC payload).
#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("transaction {0} has more than {1} bytes of asset payload")]
    PayloadTooLarge(String, usize),
    #[error("unknown transaction type tag {0}")]
    UnknownTransactionType(u8),
    #[error("{0}")]
    Schema(String),
}

/// Consensus-layer rejection: wrong slot, wrong generator, bad signature, broken chain link.
#[derive(Error, Debug, Clone)]
pub enum ConsensusError {
    #[error("block {block_id} previousBlockId {previous} does not match tip {expected}")]
    PreviousBlockMismatch { block_id: String, previous: String, expected: String },
    #[error("block {block_id} height {height} is not the successor of tip height {tip_height}")]
    HeightMismatch { block_id: String, height: u64, tip_height: u64 },
    #[error("generator {generator} is not assigned to slot {slot}")]
    WrongGenerator { generator: String, slot: u64 },
    #[error("signature verification failed for {subject}")]
    BadSignature { subject: String },
}

/// Failure applying a transaction or block against current account state.
#[derive(Error, Debug, Clone)]
pub enum StateError {
    #[error("account {0} not found")]
    MissingAccount(String),
    #[error("account {address} balance would go negative ({balance} - {amount})")]
    BalanceUnderflow { address: String, balance: i128, amount: i128 },
    #[error("transaction type {0} is not allowed at the current tip")]
    DisallowedTransaction(u8),
    #[error("multisignature wallet {0} did not meet multimin requirement")]
    MultisigThresholdNotMet(String),
    #[error("account {1} already has {0} registered")]
    AlreadyRegistered(&'static str, String),
}

/// Persistence-layer failure; any append/delete under Sequence aborts on this.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("store transaction failed: {0}")]
    Transaction(String),
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Peer transport / RPC failure.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("peer RPC '{action}' failed: {reason}")]
    Rpc { action: String, reason: String },
    #[error("no peers available")]
    NoPeers,
}

/// Transaction pool rejection.
#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("transaction {0} already present in the pool")]
    Duplicate(String),
    #[error("queue '{0}' is full")]
    QueueFull(&'static str),
    #[error("pending multisig transaction {0} expired")]
    Expired(String),
    #[error("transaction {0} not found in the pool")]
    NotFound(String),
}

/// Bad constants or delegate credentials discovered at boot or reconfiguration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("wrong password for delegate {0}")]
    WrongPassword(String),
}

/// Aggregate error type returned at component boundaries.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type ChainResult<T> = Result<T, ChainError>;

/// Raised only at the node binary boundary: the process cannot continue.
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("failed to boot: {0}")]
    Boot(String),
    #[error("critical migration failure: {0}")]
    Migration(String),
}
