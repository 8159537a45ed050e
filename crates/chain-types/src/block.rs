use serde::{Deserialize, Serialize};

use crate::{crypto, transaction::Transaction};

pub type BlockId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub height: u64,
    pub previous_block_id: Option<BlockId>,
    pub timestamp: u64,
    pub generator_public_key: String,
    pub block_signature: String,
    pub payload_hash: String,
    pub payload_length: usize,
    pub number_of_transactions: usize,
    pub total_amount: u64,
    pub total_fee: u64,
    pub reward: u64,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The bytes hashed to produce `id` and signed to produce `block_signature`.
    /// Recomputing `payload_hash` from `transactions` and comparing against the
    /// stored value is `verify_payload_hash`'s whole job.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(96 + self.payload_hash.len());
        buf.extend_from_slice(&self.height.to_be_bytes());
        if let Some(previous) = &self.previous_block_id {
            buf.extend_from_slice(previous.as_bytes());
        }
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(self.generator_public_key.as_bytes());
        buf.extend_from_slice(self.payload_hash.as_bytes());
        buf.extend_from_slice(&self.total_amount.to_be_bytes());
        buf.extend_from_slice(&self.total_fee.to_be_bytes());
        buf.extend_from_slice(&self.reward.to_be_bytes());
        buf
    }

    pub fn compute_id(&self) -> BlockId {
        crypto::hash_hex(&self.canonical_bytes())
    }

    pub fn compute_payload_hash(transactions: &[Transaction]) -> String {
        let mut buf = Vec::new();
        for tx in transactions {
            buf.extend_from_slice(tx.id.as_bytes());
        }
        crypto::hash_hex(&buf)
    }

    pub fn verify_payload_hash(&self) -> bool {
        Self::compute_payload_hash(&self.transactions) == self.payload_hash
    }

    pub fn verify_signature(&self) -> bool {
        crypto::verify_signature(
            &self.generator_public_key,
            &self.canonical_bytes(),
            &self.block_signature,
        )
    }

    pub fn payload_bytes_used(&self) -> usize {
        self.transactions.iter().map(Transaction::byte_size).sum()
    }
}
