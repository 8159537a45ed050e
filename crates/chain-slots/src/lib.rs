//! Pure time arithmetic: epoch time, slot numbers, and round numbers. Every
//! operation is a plain `&self` method over explicit integer inputs — "now" is
//! never read implicitly, so the whole module is deterministic and unit-testable.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use chain_types::ChainConfig;

#[derive(Clone)]
pub struct Slots {
    config: Arc<ChainConfig>,
}

impl Slots {
    pub fn new(config: Arc<ChainConfig>) -> Self {
        Self { config }
    }

    /// Seconds since the configured chain epoch for the given unix-epoch
    /// milliseconds (or the current wall clock, if `ms` is `None`).
    pub fn get_epoch_time(&self, ms: Option<u64>) -> i64 {
        let ms = ms.unwrap_or_else(Self::now_unix_ms);
        (ms / 1000) as i64 - self.config.epoch_time_unix as i64
    }

    /// Alias kept for parity with the source's naming; identical to `get_epoch_time`.
    pub fn get_time(&self, ms: Option<u64>) -> i64 {
        self.get_epoch_time(ms)
    }

    /// Converts chain-epoch seconds back to unix-epoch milliseconds.
    pub fn get_real_time(&self, epoch_time_secs: i64) -> u64 {
        ((epoch_time_secs + self.config.epoch_time_unix as i64) * 1000).max(0) as u64
    }

    pub fn get_slot_number(&self, epoch_time: Option<i64>) -> u64 {
        let epoch_time = epoch_time.unwrap_or_else(|| self.get_epoch_time(None));
        (epoch_time.max(0) as u64) / self.config.block_time_secs
    }

    pub fn get_slot_time(&self, slot: u64) -> i64 {
        (slot * self.config.block_time_secs) as i64
    }

    pub fn get_next_slot(&self) -> u64 {
        self.get_slot_number(None) + 1
    }

    pub fn get_last_slot(&self, next_slot: u64) -> u64 {
        next_slot + self.config.active_delegates as u64
    }

    /// The round a given block height belongs to: `ceil(height / ACTIVE_DELEGATES)`.
    pub fn calc_round(&self, height: u64) -> u32 {
        let active_delegates = self.config.active_delegates as u64;
        (height.saturating_sub(1) / active_delegates + 1) as u32
    }

    /// The delegate index within a round's shuffled list assigned to `slot`.
    pub fn slot_delegate_index(&self, slot: u64) -> usize {
        (slot % self.config.active_delegates as u64) as usize
    }

    fn now_unix_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
