use serde::{Deserialize, Serialize};

/// Reward milestone table: `(height, reward)` pairs, sorted ascending by height.
pub type Milestones = Vec<(u64, u64)>;

/// Immutable, boot-time configuration shared by every component via `Arc<ChainConfig>`.
///
/// Loaded once (see `chain-node`'s CLI) and never mutated afterwards, which is the
/// direct replacement for the source's process-global constants table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub epoch_time_unix: u64,
    pub block_time_secs: u64,
    pub active_delegates: u32,
    pub max_payload_length: usize,
    pub max_transactions_per_block: usize,
    pub max_shared_transactions: usize,
    pub block_receipt_timeout_secs: u64,
    pub block_slot_window: u32,
    pub min_broadhash_consensus: f64,
    pub max_peers: u32,
    pub total_amount: u64,
    /// This chain's namespace on the wire (`{alias}:` endpoint/event prefix);
    /// `calculate_consensus` only counts peers advertising the same alias.
    pub module_alias: String,
    pub rewards: RewardsConfig,

    pub loading: LoadingConfig,
    pub syncing: SyncingConfig,
    pub broadcasts: BroadcastsConfig,
    pub forging: ForgingConfig,
    pub transactions: TransactionsConfig,
    pub sequence: SequenceConfig,
    pub network: NetworkConfig,
    pub rpc: RpcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    pub distance: u64,
    pub offset: u64,
    pub milestones: Milestones,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingConfig {
    pub load_per_iteration: usize,
    pub rebuild_up_to_round: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncingConfig {
    pub active: bool,
    pub sync_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastsConfig {
    pub active: bool,
    pub broadcast_interval_ms: u64,
    pub release_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgingConfig {
    pub force: bool,
    pub default_password: Option<String>,
    pub forge_interval_ms: u64,
    pub delegates: Vec<EncryptedDelegate>,
}

/// One configured delegate: its public key plus an AES-256-GCM-encrypted
/// passphrase, unlocked at boot with a password via `chain-forger::Forger::load_delegates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedDelegate {
    pub public_key: String,
    /// Hex-encoded `salt(16) || nonce(12) || ciphertext+tag`.
    pub encrypted_passphrase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionsConfig {
    pub max_transactions_per_queue: usize,
    pub expire_transactions_interval_ms: u64,
    pub multilifetime_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub warn_threshold: usize,
}

/// Static peer roster and outbound-call tuning for the inbound/outbound
/// gossip RPC surface (`postBlock`, `postTransactions`, `blocks`, `blocksCommon`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub peers: Vec<PeerEndpoint>,
    pub request_timeout_ms: u64,
}

/// One statically configured peer: a stable id plus its JSON-RPC HTTP address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerEndpoint {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub bind_addr: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            epoch_time_unix: 1_464_109_200,
            block_time_secs: 10,
            active_delegates: 101,
            max_payload_length: 1_024 * 1_024,
            max_transactions_per_block: 25,
            max_shared_transactions: 100,
            block_receipt_timeout_secs: 20,
            block_slot_window: 5,
            min_broadhash_consensus: 51.0,
            max_peers: 100,
            total_amount: 10_000_000_000_000_000,
            module_alias: "chain".to_string(),
            rewards: RewardsConfig::default(),
            loading: LoadingConfig::default(),
            syncing: SyncingConfig::default(),
            broadcasts: BroadcastsConfig::default(),
            forging: ForgingConfig::default(),
            transactions: TransactionsConfig::default(),
            sequence: SequenceConfig::default(),
            network: NetworkConfig::default(),
            rpc: RpcConfig::default(),
        }
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self { distance: 3_000_000, offset: 1_451_520, milestones: vec![(0, 500_000_000)] }
    }
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self { load_per_iteration: 5_000, rebuild_up_to_round: None }
    }
}

impl Default for SyncingConfig {
    fn default() -> Self {
        Self { active: true, sync_interval_ms: 10_000 }
    }
}

impl Default for BroadcastsConfig {
    fn default() -> Self {
        Self { active: true, broadcast_interval_ms: 5_000, release_limit: 25 }
    }
}

impl Default for ForgingConfig {
    fn default() -> Self {
        Self { force: false, default_password: None, forge_interval_ms: 1_000, delegates: Vec::new() }
    }
}

impl Default for TransactionsConfig {
    fn default() -> Self {
        Self {
            max_transactions_per_queue: 1_000,
            expire_transactions_interval_ms: 30_000,
            multilifetime_secs: 24 * 60 * 60,
        }
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self { warn_threshold: 25 }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { peers: Vec::new(), request_timeout_ms: 5_000 }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { bind_addr: "127.0.0.1:8080".to_string() }
    }
}

impl ChainConfig {
    /// Parse a config from TOML text, falling back to defaults for any field left unset.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
