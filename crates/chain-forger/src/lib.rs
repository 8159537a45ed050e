//! Delegate key custody and the slot-aligned block production loop: decrypts
//! configured delegate passphrases, tracks which delegates are enabled, keeps
//! the round delegate list current, and forges a signed block when it is this
//! node's turn.

mod forger;
mod secrets;

pub use forger::Forger;
pub use secrets::{decrypt_passphrase, encrypt_passphrase};
