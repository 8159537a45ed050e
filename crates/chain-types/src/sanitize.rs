use serde::{Deserialize, Serialize};

use crate::{
    account::Account,
    block::BlockId,
    crypto,
    transaction::{Address, Transaction, TransactionType, TxId},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizedSignerSignature {
    pub signer_address: Option<Address>,
    pub signature: String,
}

/// The `trs_list`-equivalent projection returned by every inbound/outbound
/// transaction query action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizedTransaction {
    pub id: TxId,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub sender_address: Address,
    pub sender_public_key: String,
    pub timestamp: u64,
    pub recipient_address: Option<Address>,
    pub amount: u64,
    pub block_id: Option<BlockId>,
    pub message: Option<String>,
    pub signatures: Vec<SanitizedSignerSignature>,
}

impl SanitizedTransaction {
    pub fn from_transaction(
        tx: &Transaction,
        block_id: Option<BlockId>,
        sender: Option<&Account>,
    ) -> Self {
        let message = tx
            .asset
            .transfer_data
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned());

        let multisig_sender = sender.filter(|account| account.is_multisig());
        let signatures = match (tx.tx_type, multisig_sender) {
            (TransactionType::Transfer, Some(sender)) => resolve_signer_addresses(tx, sender),
            _ => tx
                .signatures
                .clone()
                .unwrap_or_default()
                .into_iter()
                .map(|signature| SanitizedSignerSignature { signer_address: None, signature })
                .collect(),
        };

        Self {
            id: tx.id.clone(),
            tx_type: tx.tx_type,
            sender_address: tx.sender_id.clone(),
            sender_public_key: tx.sender_public_key.clone(),
            timestamp: tx.timestamp,
            recipient_address: tx.recipient_id.clone(),
            amount: tx.amount,
            block_id,
            message,
            signatures,
        }
    }
}

/// Resolves each multisig member signature to the address that produced it by
/// matching against every member public key of the sending wallet.
///
/// The transaction hash is computed exactly once up front: the original
/// implementation recomputed it inside the per-signature loop even though the
/// transaction never mutates across iterations, which was redundant but
/// harmless. There is no such loop-carried recomputation here.
pub fn resolve_signer_addresses(
    tx: &Transaction,
    sender: &Account,
) -> Vec<SanitizedSignerSignature> {
    let message = tx.canonical_bytes();

    tx.signatures
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(|signature| {
            let signer_address = sender
                .multisignatures
                .iter()
                .find(|member_public_key| crypto::verify_signature(member_public_key, &message, &signature))
                .and_then(|member_public_key| crypto::derive_address(member_public_key).ok());

            SanitizedSignerSignature { signer_address, signature }
        })
        .collect()
}
