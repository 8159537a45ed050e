use chain_types::{
    Account, AccountTable, ChainResult, StateError, Transaction, TransactionHandler, TransactionType, ValidationError,
};

/// Type 1: registers a second public key on the sender, required thereafter
/// to co-sign via `signSignature` on every subsequent transaction.
pub struct SecondSignatureHandler;

impl TransactionHandler for SecondSignatureHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::SecondSignature
    }

    fn validate(&self, tx: &Transaction) -> ChainResult<()> {
        match &tx.asset.second_public_key {
            Some(key) if !key.is_empty() => Ok(()),
            _ => Err(ValidationError::Schema("secondSignature registration requires a publicKey".into()).into()),
        }
    }

    fn apply(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        if sender.second_public_key.is_some() {
            return Err(StateError::AlreadyRegistered("a second signature", sender.address.clone()).into());
        }
        sender.balance -= tx.fee as i128;
        sender.second_public_key = tx.asset.second_public_key.clone();
        Ok(())
    }

    fn undo(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        sender.balance += tx.fee as i128;
        sender.second_public_key = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chain_types::TransactionAsset;

    use super::*;

    fn tx(second_public_key: Option<&str>) -> Transaction {
        Transaction {
            id: "t1".into(),
            tx_type: TransactionType::SecondSignature,
            sender_public_key: String::new(),
            sender_id: "alice".into(),
            recipient_id: None,
            amount: 0,
            fee: 5,
            timestamp: 0,
            signature: String::new(),
            sign_signature: None,
            signatures: None,
            asset: TransactionAsset {
                second_public_key: second_public_key.map(str::to_string),
                ..Default::default()
            },
        }
    }

    #[test]
    fn apply_registers_the_key_once() {
        let mut accounts = AccountTable::new();
        SecondSignatureHandler.apply(&tx(Some("pk1")), &mut accounts).unwrap();
        assert_eq!(accounts["alice"].second_public_key.as_deref(), Some("pk1"));
    }

    #[test]
    fn apply_rejects_a_second_registration() {
        let mut accounts = AccountTable::new();
        SecondSignatureHandler.apply(&tx(Some("pk1")), &mut accounts).unwrap();
        let err = SecondSignatureHandler.apply(&tx(Some("pk2")), &mut accounts).unwrap_err();
        assert!(matches!(err, chain_types::ChainError::State(StateError::AlreadyRegistered(..))));
    }

    #[test]
    fn validate_rejects_a_missing_key() {
        assert!(SecondSignatureHandler.validate(&tx(None)).is_err());
    }
}
