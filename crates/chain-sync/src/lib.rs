//! Peer-driven bootstrap: pulling the shared unconfirmed-transaction pool at
//! startup and the periodic fork-aware catch-up sync.

mod loader;

pub use loader::Loader;
