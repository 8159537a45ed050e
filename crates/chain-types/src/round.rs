use serde::{Deserialize, Serialize};

/// One row of the `rounds_rewards` ledger: what a delegate earned for the blocks
/// they produced in a closed round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReward {
    pub round: u32,
    pub public_key: String,
    pub fees: u64,
    pub rewards: u64,
    pub timestamp: u64,
}
