use std::sync::Arc;

use chain_types::{Block, BlockId};
use indexmap::IndexMap;
use parking_lot::Mutex;

/// Write-through cache for recently committed blocks, sitting alongside the
/// store. Eviction is the cache's own concern; Blocks never reasons about it.
pub trait ChainCache: Send + Sync {
    fn put_block(&self, block: Arc<Block>);
    fn get_block(&self, id: &BlockId) -> Option<Arc<Block>>;
    fn invalidate(&self, id: &BlockId);
    fn len(&self) -> usize;
}

/// Bounded in-memory LRU-by-insertion cache: oldest entry evicted first once
/// `capacity` is exceeded.
pub struct BlockCache {
    capacity: usize,
    entries: Mutex<IndexMap<BlockId, Arc<Block>>>,
}

impl BlockCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: Mutex::new(IndexMap::new()) }
    }
}

impl ChainCache for BlockCache {
    fn put_block(&self, block: Arc<Block>) {
        let mut entries = self.entries.lock();
        entries.insert(block.id.clone(), block);
        while entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
    }

    fn get_block(&self, id: &BlockId) -> Option<Arc<Block>> {
        self.entries.lock().get(id).cloned()
    }

    fn invalidate(&self, id: &BlockId) {
        self.entries.lock().shift_remove(id);
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, height: u64) -> Arc<Block> {
        Arc::new(Block {
            id: id.to_string(),
            height,
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
        })
    }

    #[test]
    fn evicts_oldest_once_over_capacity() {
        let cache = BlockCache::new(2);
        cache.put_block(block("a", 1));
        cache.put_block(block("b", 2));
        cache.put_block(block("c", 3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_block(&"a".to_string()).is_none());
        assert!(cache.get_block(&"c".to_string()).is_some());
    }

    #[test]
    fn invalidate_removes_a_single_entry() {
        let cache = BlockCache::new(4);
        cache.put_block(block("a", 1));
        cache.invalidate(&"a".to_string());
        assert_eq!(cache.len(), 0);
    }
}
