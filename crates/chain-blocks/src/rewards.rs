use std::sync::Arc;

use chain_types::ChainConfig;

/// Milestone/supply math backing the `calculateSupply`/`calculateMilestone`/
/// `calculateReward` module actions.
#[derive(Clone)]
pub struct Rewards {
    config: Arc<ChainConfig>,
}

impl Rewards {
    pub fn new(config: Arc<ChainConfig>) -> Self {
        Self { config }
    }

    /// Index into `rewards.milestones` active at `height`; clamps to the last
    /// entry once the table is exhausted.
    pub fn calc_milestone(&self, height: u64) -> usize {
        let rewards = &self.config.rewards;
        let distance = rewards.distance.max(1);
        let elapsed = height.saturating_sub(rewards.offset);
        let index = elapsed / distance;
        let last = rewards.milestones.len().saturating_sub(1) as u64;
        index.min(last) as usize
    }

    pub fn calc_reward(&self, height: u64) -> u64 {
        let rewards = &self.config.rewards;
        if height <= rewards.offset || rewards.milestones.is_empty() {
            return 0;
        }
        rewards.milestones[self.calc_milestone(height)].1
    }

    /// Total supply at `height`: the genesis `total_amount` plus every
    /// per-block reward paid from `rewards.offset + 1` through `height`.
    pub fn calc_supply(&self, height: u64) -> u128 {
        let rewards = &self.config.rewards;
        let mut supply = self.config.total_amount as u128;
        if height <= rewards.offset || rewards.milestones.is_empty() {
            return supply;
        }

        let distance = rewards.distance.max(1);
        let mut remaining = height - rewards.offset;
        let last_index = rewards.milestones.len() - 1;

        for (index, (_, reward)) in rewards.milestones.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let span = if index == last_index { remaining } else { distance.min(remaining) };
            supply += *reward as u128 * span as u128;
            remaining -= span;
        }
        supply
    }
}
