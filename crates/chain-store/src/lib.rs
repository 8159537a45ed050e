//! The persistence and cache boundary. `ChainStore` is the only place the engine
//! touches the underlying relational store; every method is typed and fully
//! parameterized, never a SQL fragment. `ChainCache` is the write-through cache
//! Blocks keeps alongside it.

pub mod cache;
pub mod memory;
pub mod store;

pub use cache::{BlockCache, ChainCache};
pub use memory::InMemoryChainStore;
pub use store::{ChainStore, StoreTx, TransferDirection, TrsListQuery};
