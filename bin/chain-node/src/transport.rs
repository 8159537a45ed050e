//! Outbound side of the gossip RPC surface. Each configured peer gets its own
//! pooled [`HttpClient`] calling straight into that peer's `ChainActionsApi`
//! server — the same trait `chain-rpc` implements for this node's own server,
//! so a peer and a client are indistinguishable on the wire.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chain_net::{PeerId, PeerInfo, PeerTransport};
use chain_rpc::ChainActionsApiClient;
use chain_types::{Block, BlockId, ChainConfig, ChainResult, NetworkError, Transaction};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use tracing::debug;

pub struct HttpPeerTransport {
    clients: HashMap<PeerId, HttpClient>,
}

impl HttpPeerTransport {
    pub fn new(config: &ChainConfig) -> eyre::Result<Self> {
        let timeout = Duration::from_millis(config.network.request_timeout_ms);
        let mut clients = HashMap::with_capacity(config.network.peers.len());
        for peer in &config.network.peers {
            let client = HttpClientBuilder::default().request_timeout(timeout).build(&peer.url)?;
            clients.insert(peer.id.clone(), client);
        }
        Ok(Self { clients })
    }

    fn client(&self, peer: &PeerId) -> ChainResult<&HttpClient> {
        self.clients.get(peer).ok_or(NetworkError::NoPeers.into())
    }

    fn rpc_error(action: &'static str, error: impl std::fmt::Display) -> chain_types::ChainError {
        NetworkError::Rpc { action: action.to_string(), reason: error.to_string() }.into()
    }
}

#[async_trait]
impl PeerTransport for HttpPeerTransport {
    async fn connected_peers(&self) -> ChainResult<Vec<PeerInfo>> {
        let mut infos = Vec::with_capacity(self.clients.len());
        for (id, client) in &self.clients {
            match client.get_node_status().await {
                Ok(status) => infos.push(PeerInfo {
                    id: id.clone(),
                    module_alias: status.module_alias,
                    broadhash: Some(status.broadhash),
                    height: status.last_block.map(|b| b.height).unwrap_or(0),
                }),
                Err(error) => debug!(peer = %id, %error, "peer did not answer getNodeStatus, skipping from this round"),
            }
        }
        Ok(infos)
    }

    async fn post_block(&self, peer: &PeerId, block: &Block) -> ChainResult<()> {
        self.client(peer)?
            .post_block(block.clone())
            .await
            .map_err(|e| Self::rpc_error("postBlock", e))?;
        Ok(())
    }

    async fn post_transactions(&self, peer: &PeerId, transactions: &[Transaction]) -> ChainResult<()> {
        self.client(peer)?
            .post_transactions(transactions.to_vec())
            .await
            .map_err(|e| Self::rpc_error("postTransactions", e))?;
        Ok(())
    }

    async fn get_transactions(&self, peer: &PeerId, _limit: usize) -> ChainResult<Vec<Transaction>> {
        let response =
            self.client(peer)?.get_transactions().await.map_err(|e| Self::rpc_error("getTransactions", e))?;
        Ok(response.transactions)
    }

    async fn blocks_after(&self, peer: &PeerId, last_block_id: &BlockId, limit: usize) -> ChainResult<Vec<Block>> {
        let response = self.client(peer)?.blocks(last_block_id.clone()).await.map_err(|e| Self::rpc_error("blocks", e))?;
        let mut blocks = response.blocks;
        blocks.truncate(limit);
        Ok(blocks)
    }

    async fn blocks_common(&self, peer: &PeerId, candidate_ids: &[BlockId]) -> ChainResult<Option<BlockId>> {
        let response = self
            .client(peer)?
            .blocks_common(candidate_ids.to_vec())
            .await
            .map_err(|e| Self::rpc_error("blocksCommon", e))?;
        Ok(response.common)
    }
}
