use std::sync::Arc;

use chain_types::{ChainConfig, ChainResult};
use parking_lot::RwLock;

use crate::transport::PeerTransport;

/// Consensus tracking over the connected peer set. `calculate_consensus` is
/// reproduced verbatim from the source (no caching despite its name); a
/// separate `last_consensus` field is updated by the periodic job and exposed
/// through `cached_last_consensus` for callers that want the cheap read.
pub struct Peers {
    config: Arc<ChainConfig>,
    transport: Arc<dyn PeerTransport>,
    last_consensus: RwLock<Option<f64>>,
}

impl Peers {
    pub fn new(config: Arc<ChainConfig>, transport: Arc<dyn PeerTransport>) -> Self {
        Self { config, transport, last_consensus: RwLock::new(None) }
    }

    /// `matched / active * 100`, rounded to two decimals, where `active` is
    /// peers advertising this chain's `module_alias`, clamped to `max_peers`,
    /// and `matched` is the subset of those also advertising our `broadhash`.
    /// An empty peer set is full consensus — a node with no peers yet has
    /// nothing disagreeing with it.
    pub async fn calculate_consensus(&self, broadhash: &str) -> ChainResult<f64> {
        let peers = self.transport.connected_peers().await?;
        let aliased: Vec<_> = peers.iter().filter(|p| p.module_alias == self.config.module_alias).collect();
        let active = aliased.len().min(self.config.max_peers as usize);
        if active == 0 {
            return Ok(100.0);
        }
        let matched = aliased.iter().take(active).filter(|p| p.broadhash.as_deref() == Some(broadhash)).count();
        let ratio = matched as f64 / active as f64 * 100.0;
        Ok((ratio * 100.0).round() / 100.0)
    }

    /// Updates the cached value; run by the periodic consensus job.
    pub async fn refresh_consensus(&self, broadhash: &str) -> ChainResult<f64> {
        let consensus = self.calculate_consensus(broadhash).await?;
        *self.last_consensus.write() = Some(consensus);
        Ok(consensus)
    }

    pub fn cached_last_consensus(&self) -> Option<f64> {
        *self.last_consensus.read()
    }

    /// Forging refuses to proceed on poor consensus unless `forging.force` is set.
    pub fn is_poor_consensus(&self, consensus: f64) -> bool {
        if self.config.forging.force {
            return false;
        }
        consensus < self.config.min_broadhash_consensus
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chain_types::{Block, BlockId, Transaction};

    use super::*;
    use crate::transport::PeerId;

    struct FixedPeers(Vec<PeerInfoFixture>);

    #[derive(Clone)]
    struct PeerInfoFixture {
        broadhash: Option<String>,
        module_alias: &'static str,
    }

    impl PeerInfoFixture {
        fn aliased(broadhash: Option<&str>) -> Self {
            Self { broadhash: broadhash.map(str::to_string), module_alias: "chain" }
        }
    }

    #[async_trait]
    impl PeerTransport for FixedPeers {
        async fn connected_peers(&self) -> ChainResult<Vec<crate::transport::PeerInfo>> {
            Ok(self
                .0
                .iter()
                .enumerate()
                .map(|(i, p)| crate::transport::PeerInfo {
                    id: format!("peer-{i}"),
                    module_alias: p.module_alias.to_string(),
                    broadhash: p.broadhash.clone(),
                    height: 0,
                })
                .collect())
        }
        async fn post_block(&self, _peer: &PeerId, _block: &Block) -> ChainResult<()> {
            Ok(())
        }
        async fn post_transactions(&self, _peer: &PeerId, _txs: &[Transaction]) -> ChainResult<()> {
            Ok(())
        }
        async fn get_transactions(&self, _peer: &PeerId, _limit: usize) -> ChainResult<Vec<Transaction>> {
            Ok(Vec::new())
        }
        async fn blocks_after(&self, _peer: &PeerId, _last: &BlockId, _limit: usize) -> ChainResult<Vec<Block>> {
            Ok(Vec::new())
        }
        async fn blocks_common(&self, _peer: &PeerId, _candidates: &[BlockId]) -> ChainResult<Option<BlockId>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn calculate_consensus_is_the_percentage_of_matching_peers() {
        let transport: Arc<dyn PeerTransport> = Arc::new(FixedPeers(vec![
            PeerInfoFixture::aliased(Some("abc")),
            PeerInfoFixture::aliased(Some("abc")),
            PeerInfoFixture::aliased(Some("xyz")),
            PeerInfoFixture::aliased(None),
        ]));
        let peers = Peers::new(Arc::new(ChainConfig::default()), transport);
        let consensus = peers.calculate_consensus("abc").await.unwrap();
        assert_eq!(consensus, 50.0);
    }

    #[tokio::test]
    async fn calculate_consensus_ignores_peers_on_a_different_module_alias() {
        let transport: Arc<dyn PeerTransport> = Arc::new(FixedPeers(vec![
            PeerInfoFixture::aliased(Some("abc")),
            PeerInfoFixture { broadhash: Some("xyz".into()), module_alias: "other-chain" },
        ]));
        let peers = Peers::new(Arc::new(ChainConfig::default()), transport);
        let consensus = peers.calculate_consensus("abc").await.unwrap();
        assert_eq!(consensus, 100.0);
    }

    #[tokio::test]
    async fn calculate_consensus_is_full_with_no_peers() {
        let transport: Arc<dyn PeerTransport> = Arc::new(FixedPeers(vec![]));
        let peers = Peers::new(Arc::new(ChainConfig::default()), transport);
        assert_eq!(peers.calculate_consensus("abc").await.unwrap(), 100.0);
    }

    #[test]
    fn is_poor_consensus_respects_forging_force() {
        let mut config = ChainConfig::default();
        config.min_broadhash_consensus = 51.0;
        config.forging.force = true;
        let transport: Arc<dyn PeerTransport> = Arc::new(FixedPeers(vec![]));
        let peers = Peers::new(Arc::new(config), transport);
        assert!(!peers.is_poor_consensus(0.0));
    }

    #[test]
    fn is_poor_consensus_flags_below_threshold() {
        let mut config = ChainConfig::default();
        config.min_broadhash_consensus = 51.0;
        let transport: Arc<dyn PeerTransport> = Arc::new(FixedPeers(vec![]));
        let peers = Peers::new(Arc::new(config), transport);
        assert!(peers.is_poor_consensus(40.0));
        assert!(!peers.is_poor_consensus(60.0));
    }

    #[tokio::test]
    async fn refresh_consensus_populates_the_cache() {
        let transport: Arc<dyn PeerTransport> = Arc::new(FixedPeers(vec![PeerInfoFixture::aliased(Some("abc"))]));
        let peers = Peers::new(Arc::new(ChainConfig::default()), transport);
        assert!(peers.cached_last_consensus().is_none());
        peers.refresh_consensus("abc").await.unwrap();
        assert_eq!(peers.cached_last_consensus(), Some(100.0));
    }
}
