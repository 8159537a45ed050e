//! The built-in `TransactionType` tags 0..=7, each as a small `TransactionHandler`.
//! `register_builtin_handlers` wires all eight into a fresh `TransactionRegistry`,
//! the way `chain-node` boots one before handing it to `Pool`/`Blocks`.

mod dapp;
mod delegate;
mod multisignature;
mod second_signature;
mod transfer;
mod vote;

use chain_types::TransactionRegistry;

pub use dapp::{DappHandler, InTransferHandler, OutTransferHandler};
pub use delegate::DelegateHandler;
pub use multisignature::MultisignatureHandler;
pub use second_signature::SecondSignatureHandler;
pub use transfer::TransferHandler;
pub use vote::VoteHandler;

/// Registers the eight built-in handlers. Dapp-sidechain transfers (types 5-7)
/// charge the fee and validate shape only — a full dapp registry is
/// smart-contract-shaped state this chain doesn't model.
pub fn register_builtin_handlers() -> TransactionRegistry {
    let mut registry = TransactionRegistry::new();
    registry.register(Box::new(TransferHandler));
    registry.register(Box::new(SecondSignatureHandler));
    registry.register(Box::new(DelegateHandler));
    registry.register(Box::new(VoteHandler));
    registry.register(Box::new(MultisignatureHandler));
    registry.register(Box::new(DappHandler));
    registry.register(Box::new(InTransferHandler));
    registry.register(Box::new(OutTransferHandler));
    registry
}
