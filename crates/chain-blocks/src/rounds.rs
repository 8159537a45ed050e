use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use chain_types::{crypto, Account, Block, RoundReward};

/// Delegate-list generation and per-round reward/fee settlement. `ticking`
/// tracks whether a round boundary is currently being applied under Sequence.
pub struct Rounds {
    active_delegates: u32,
    ticking: AtomicBool,
}

impl Rounds {
    pub fn new(active_delegates: u32) -> Self {
        Self { active_delegates, ticking: AtomicBool::new(false) }
    }

    pub fn ticking(&self) -> bool {
        self.ticking.load(Ordering::Acquire)
    }

    /// Marks a round boundary as in progress. Returns `false` (and leaves the
    /// flag untouched) if one was already ticking.
    pub fn begin_tick(&self) -> bool {
        !self.ticking.swap(true, Ordering::AcqRel)
    }

    pub fn end_tick(&self) {
        self.ticking.store(false, Ordering::Release);
    }

    /// Top-`ACTIVE_DELEGATES`-by-vote-weight accounts, shuffled deterministically
    /// from a seed derived from the previous round's last block id. Ties broken
    /// by address so the ordering is fully deterministic.
    pub fn generate_delegate_list(&self, accounts: &[Account], seed_block_id: &str) -> Vec<String> {
        let mut candidates: Vec<&Account> = accounts.iter().filter(|a| a.is_delegate).collect();
        candidates.sort_by(|a, b| b.vote_weight.cmp(&a.vote_weight).then_with(|| a.address.cmp(&b.address)));
        candidates.truncate(self.active_delegates as usize);

        let mut keys: Vec<String> =
            candidates.into_iter().filter_map(|a| a.public_key.clone()).collect();

        let mut seed = crypto::hash(seed_block_id.as_bytes());
        for i in (1..keys.len()).rev() {
            seed = crypto::hash(&seed);
            let draw = u64::from_be_bytes(seed[0..8].try_into().expect("8 bytes"));
            let j = (draw % (i as u64 + 1)) as usize;
            keys.swap(i, j);
        }
        keys
    }

    /// Distributes each round's total fees evenly across its blocks
    /// (`sum(fees) / ACTIVE_DELEGATES`, remainder to the last block's forger),
    /// on top of the block reward already paid at append time.
    pub fn settle_round(&self, round: u32, round_blocks: &[Block], now_secs: u64) -> Vec<RoundReward> {
        if round_blocks.is_empty() {
            return Vec::new();
        }

        let total_fees: u64 = round_blocks.iter().map(|b| b.total_fee).sum();
        let share = total_fees / self.active_delegates as u64;
        let remainder = total_fees - share * self.active_delegates as u64;

        let last_index = round_blocks.len() - 1;
        round_blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                let fees = if i == last_index { share + remainder } else { share };
                RoundReward {
                    round,
                    public_key: block.generator_public_key.clone(),
                    fees,
                    rewards: block.reward,
                    timestamp: now_secs,
                }
            })
            .collect()
    }

    /// Convenience: produced-block counts per delegate within `round_blocks`,
    /// used by `getForgingStatusForAllDelegates`-style diagnostics.
    pub fn produced_counts(round_blocks: &[Block]) -> HashMap<String, u64> {
        let mut counts = HashMap::new();
        for block in round_blocks {
            *counts.entry(block.generator_public_key.clone()).or_insert(0) += 1;
        }
        counts
    }
}
