use crate::{
    account::AccountTable,
    error::{ChainResult, StateError},
    transaction::{Transaction, TransactionType},
};

/// Per-type transaction logic: the re-architected replacement for the source's
/// dynamic `registeredTransactions` map keyed by numeric type tag. Handlers are
/// registered at boot into a `TransactionRegistry`; tags 0..=7 are reserved for
/// the built-in set implemented in `chain-pool`/`chain-blocks`.
pub trait TransactionHandler: Send + Sync {
    fn transaction_type(&self) -> TransactionType;

    /// Structural + asset-schema validation, independent of account state.
    fn validate(&self, tx: &Transaction) -> ChainResult<()>;

    /// Applies the transaction's effect to the (possibly unconfirmed) account table.
    fn apply(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()>;

    /// Reverses `apply`, used by `deleteLastBlock`.
    fn undo(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()>;
}

/// Dispatch table from type tag to handler, populated once at boot.
pub struct TransactionRegistry {
    handlers: [Option<Box<dyn TransactionHandler>>; 8],
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self { handlers: Default::default() }
    }

    pub fn register(&mut self, handler: Box<dyn TransactionHandler>) {
        let tag = handler.transaction_type().tag() as usize;
        self.handlers[tag] = Some(handler);
    }

    pub fn get(&self, tx_type: TransactionType) -> ChainResult<&dyn TransactionHandler> {
        self.handlers[tx_type.tag() as usize]
            .as_deref()
            .ok_or(StateError::DisallowedTransaction(tx_type.tag()).into())
    }
}

impl Default for TransactionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
