//! Boots a single chain-node: loads configuration, constructs every
//! collaborator, starts the background jobs, and serves the RPC surface
//! until interrupted.

mod chain;
mod transport;

use std::sync::Arc;

use chain::Chain;
use chain_blocks::Blocks;
use chain_handlers::register_builtin_handlers;
use chain_pool::Pool;
use chain_rpc::ChainActionsApiServer;
use chain_sequence::Sequence;
use chain_slots::Slots;
use chain_store::{ChainStore, InMemoryChainStore};
use chain_types::{Block, ChainConfig, EventBus};
use clap::Parser;
use jsonrpsee::server::ServerBuilder;
use transport::HttpPeerTransport;

#[derive(Parser)]
#[clap(about = "Chain node")]
struct Cli {
    /// Path to a TOML config file. Missing file falls back to `ChainConfig::default()`.
    #[clap(short, long, default_value = "chain-node.toml")]
    config: String,

    /// Password to unlock this node's configured delegate keys, if any.
    #[clap(long, env = "CHAIN_NODE_FORGING_PASSWORD")]
    forging_password: Option<String>,
}

fn genesis_block() -> Block {
    Block {
        id: "genesis".to_string(),
        height: 1,
        previous_block_id: None,
        timestamp: 0,
        generator_public_key: String::new(),
        block_signature: String::new(),
        payload_hash: Block::compute_payload_hash(&[]),
        payload_length: 0,
        number_of_transactions: 0,
        total_amount: 0,
        total_fee: 0,
        reward: 0,
        transactions: Vec::new(),
    }
}

fn load_config(path: &str) -> eyre::Result<ChainConfig> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(ChainConfig::from_toml(&text)?),
        Err(error) => {
            tracing::warn!(%error, path, "could not read config file, falling back to defaults");
            Ok(ChainConfig::default())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = Arc::new(load_config(&cli.config)?);

    let slots = Slots::new(config.clone());
    let store: Arc<dyn ChainStore> = Arc::new(InMemoryChainStore::new());
    let registry = Arc::new(register_builtin_handlers());
    let pool = Pool::new(config.clone(), registry.clone());
    let events = EventBus::default();
    let sequence = Sequence::new(&config);

    let blocks = Arc::new(Blocks::new(config.clone(), slots.clone(), store.clone(), pool.clone(), registry, events.clone()));
    blocks
        .load_blockchain(&sequence, genesis_block(), config.loading.rebuild_up_to_round)
        .await
        .map_err(|error| eyre::eyre!("failed to load the chain: {error}"))?;

    let transport: Arc<dyn chain_net::PeerTransport> = Arc::new(HttpPeerTransport::new(&config)?);

    let chain = Arc::new(Chain::new(config.clone(), slots, store, pool, blocks, transport, sequence, events));

    if let Some(password) = &cli.forging_password {
        let unlocked = chain.forger().load_delegates(password);
        tracing::info!(unlocked, "unlocked configured delegate keys");
    }

    chain.start().await.map_err(|error| eyre::eyre!("failed to start the chain: {error}"))?;

    let server = ServerBuilder::default().build(config.rpc.bind_addr.as_str()).await?;
    let addr = server.local_addr()?;
    tracing::info!(%addr, "rpc server listening");

    let server_handle = server.start(chain.to_api().into_rpc());

    tokio::signal::ctrl_c().await?;
    let _ = server_handle.stop();
    server_handle.stopped().await;
    chain.cleanup(None).await;

    Ok(())
}
