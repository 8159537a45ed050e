//! Data model and error taxonomy shared by every chain-engine crate.

pub mod account;
pub mod block;
pub mod broadhash;
pub mod config;
pub mod crypto;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod handler;
pub mod round;
pub mod sanitize;
pub mod transaction;

pub use account::{Account, AccountTable};
pub use block::{Block, BlockId};
pub use config::{ChainConfig, NetworkConfig, PeerEndpoint, RpcConfig};
pub use error::{ChainError, ChainResult, ConfigError, ConsensusError, FatalError, NetworkError, PersistenceError, PoolError, StateError, ValidationError};
pub use event_bus::EventBus;
pub use events::ChainEvent;
pub use handler::{TransactionHandler, TransactionRegistry};
pub use round::RoundReward;
pub use sanitize::{SanitizedSignerSignature, SanitizedTransaction};
pub use transaction::{Address, MultisigAsset, Transaction, TransactionAsset, TransactionType, TxId};
