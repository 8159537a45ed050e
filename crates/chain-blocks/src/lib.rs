//! The block/round state machine: genesis load, append-verify-commit, the
//! fork-choice rule for network-received blocks, delete-last-block rollback,
//! and the reward/supply and round-settlement math that backs them.

mod blocks;
mod rewards;
mod rounds;
mod state;

pub use blocks::Blocks;
pub use rewards::Rewards;
pub use rounds::Rounds;
pub use state::BlockchainState;
