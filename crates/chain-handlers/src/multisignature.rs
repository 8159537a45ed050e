use chain_types::{
    Account, AccountTable, ChainResult, StateError, Transaction, TransactionHandler, TransactionType, ValidationError,
};

/// Type 4: turns the sender into a multisignature wallet, recording
/// `multimin` signers-required, `multilifetime` and the member key set.
pub struct MultisignatureHandler;

impl TransactionHandler for MultisignatureHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Multisignature
    }

    fn validate(&self, tx: &Transaction) -> ChainResult<()> {
        let Some(asset) = &tx.asset.multisig else {
            return Err(ValidationError::Schema("multisignature registration requires an asset".into()).into());
        };
        if asset.keys_added.is_empty() || asset.min == 0 || (asset.min as usize) > asset.keys_added.len() {
            return Err(ValidationError::Schema("multisignature min must be reachable by the member set".into()).into());
        }
        Ok(())
    }

    fn apply(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let asset = tx.asset.multisig.as_ref().expect("validated before apply");
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        if sender.is_multisig() {
            return Err(StateError::AlreadyRegistered("a multisignature configuration", sender.address.clone()).into());
        }
        sender.balance -= tx.fee as i128;
        sender.multimin = asset.min;
        sender.multilifetime = asset.lifetime;
        sender.multisignatures = asset.keys_added.clone();
        Ok(())
    }

    fn undo(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        sender.balance += tx.fee as i128;
        sender.multimin = 0;
        sender.multilifetime = 0;
        sender.multisignatures.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chain_types::{MultisigAsset, TransactionAsset};

    use super::*;

    fn tx(min: u8, keys: Vec<&str>) -> Transaction {
        Transaction {
            id: "t1".into(),
            tx_type: TransactionType::Multisignature,
            sender_public_key: String::new(),
            sender_id: "alice".into(),
            recipient_id: None,
            amount: 0,
            fee: 15,
            timestamp: 0,
            signature: String::new(),
            sign_signature: None,
            signatures: None,
            asset: TransactionAsset {
                multisig: Some(MultisigAsset {
                    min,
                    lifetime: 1,
                    keys_added: keys.into_iter().map(str::to_string).collect(),
                }),
                ..Default::default()
            },
        }
    }

    #[test]
    fn apply_registers_the_member_set() {
        let mut accounts = AccountTable::new();
        MultisignatureHandler.apply(&tx(2, vec!["p1", "p2"]), &mut accounts).unwrap();
        assert_eq!(accounts["alice"].multimin, 2);
        assert_eq!(accounts["alice"].multisignatures, vec!["p1", "p2"]);
    }

    #[test]
    fn validate_rejects_an_unreachable_min() {
        assert!(MultisignatureHandler.validate(&tx(3, vec!["p1", "p2"])).is_err());
    }

    #[test]
    fn apply_rejects_re_registration() {
        let mut accounts = AccountTable::new();
        MultisignatureHandler.apply(&tx(2, vec!["p1", "p2"]), &mut accounts).unwrap();
        let err = MultisignatureHandler.apply(&tx(1, vec!["p3"]), &mut accounts).unwrap_err();
        assert!(matches!(err, chain_types::ChainError::State(StateError::AlreadyRegistered(..))));
    }
}
