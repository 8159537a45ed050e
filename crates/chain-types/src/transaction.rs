use serde::{Deserialize, Serialize};

use crate::crypto;

pub type TxId = String;
pub type Address = String;

/// The built-in transaction type tags. Custom types beyond this set are the
/// embedding framework's concern (see `TransactionHandler`); 0..=7 are reserved.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Transfer = 0,
    SecondSignature = 1,
    Delegate = 2,
    Vote = 3,
    Multisignature = 4,
    Dapp = 5,
    InTransfer = 6,
    OutTransfer = 7,
}

impl TransactionType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::Transfer,
            1 => Self::SecondSignature,
            2 => Self::Delegate,
            3 => Self::Vote,
            4 => Self::Multisignature,
            5 => Self::Dapp,
            6 => Self::InTransfer,
            7 => Self::OutTransfer,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Type-specific transaction payload, tagged by `TransactionType`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionAsset {
    /// Free-form UTF-8 payload attached to a type-0 transfer.
    pub transfer_data: Option<Vec<u8>>,
    /// Delegate registration name (type 2).
    pub delegate_name: Option<String>,
    /// Vote deltas, e.g. `["+<publicKey>", "-<publicKey>"]` (type 3).
    pub votes: Option<Vec<String>>,
    /// Multisignature registration parameters (type 4).
    pub multisig: Option<MultisigAsset>,
    /// Second-signature public key being registered on the sender (type 1).
    pub second_public_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultisigAsset {
    pub min: u8,
    pub lifetime: u8,
    pub keys_added: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub sender_public_key: String,
    pub sender_id: Address,
    pub recipient_id: Option<Address>,
    pub amount: u64,
    pub fee: u64,
    pub timestamp: u64,
    pub signature: String,
    pub sign_signature: Option<String>,
    pub signatures: Option<Vec<String>>,
    pub asset: TransactionAsset,
}

impl Transaction {
    /// Bytes hashed to produce `id` and signed to produce `signature`; fixed field
    /// order, no runtime-dependent formatting, so the id and sign-check never drift
    /// from this function's output.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);
        buf.push(self.tx_type.tag());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(self.sender_public_key.as_bytes());
        if let Some(recipient) = &self.recipient_id {
            buf.extend_from_slice(recipient.as_bytes());
        }
        buf.extend_from_slice(&self.amount.to_be_bytes());
        buf.extend_from_slice(&self.fee.to_be_bytes());
        if let Some(transfer_data) = &self.asset.transfer_data {
            buf.extend_from_slice(transfer_data);
        }
        if let Some(name) = &self.asset.delegate_name {
            buf.extend_from_slice(name.as_bytes());
        }
        if let Some(votes) = &self.asset.votes {
            for v in votes {
                buf.extend_from_slice(v.as_bytes());
            }
        }
        if let Some(multisig) = &self.asset.multisig {
            buf.push(multisig.min);
            buf.push(multisig.lifetime);
            for key in &multisig.keys_added {
                buf.extend_from_slice(key.as_bytes());
            }
        }
        buf
    }

    pub fn compute_id(&self) -> TxId {
        crypto::hash_hex(&self.canonical_bytes())
    }

    /// Bytes per byte of payload; used both as the wire-size accounting unit for
    /// `MAX_PAYLOAD_LENGTH` and as the denominator of fee-per-byte ordering.
    pub fn byte_size(&self) -> usize {
        self.canonical_bytes().len() + self.signature.len() / 2
    }

    pub fn fee_per_byte(&self) -> f64 {
        let size = self.byte_size().max(1);
        self.fee as f64 / size as f64
    }

    pub fn verify_signature(&self) -> bool {
        crypto::verify_signature(&self.sender_public_key, &self.canonical_bytes(), &self.signature)
    }
}
