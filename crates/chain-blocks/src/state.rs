/// The chain's coarse lifecycle state. Held behind a lock readers never block
/// on Sequence for — `getNodeStatus` and friends only ever take a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainState {
    Loading,
    Synced,
    Syncing,
    /// Entered only when `rebuildUpToRound` is configured; terminal, the
    /// process exits once the target round is replayed.
    Rebuilding { target_round: u32 },
}
