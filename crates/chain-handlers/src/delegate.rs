use chain_types::{
    Account, AccountTable, ChainResult, StateError, Transaction, TransactionHandler, TransactionType, ValidationError,
};

/// Type 2: registers the sender as a delegate candidate under a unique name.
pub struct DelegateHandler;

impl TransactionHandler for DelegateHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Delegate
    }

    fn validate(&self, tx: &Transaction) -> ChainResult<()> {
        match &tx.asset.delegate_name {
            Some(name) if !name.is_empty() && name.len() <= 20 => Ok(()),
            _ => Err(ValidationError::Schema("delegate registration requires a 1-20 char username".into()).into()),
        }
    }

    fn apply(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        if sender.is_delegate {
            return Err(StateError::AlreadyRegistered("a delegate username", sender.address.clone()).into());
        }
        sender.balance -= tx.fee as i128;
        sender.is_delegate = true;
        sender.delegate_name = tx.asset.delegate_name.clone();
        Ok(())
    }

    fn undo(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        sender.balance += tx.fee as i128;
        sender.is_delegate = false;
        sender.delegate_name = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chain_types::TransactionAsset;

    use super::*;

    fn tx(name: Option<&str>) -> Transaction {
        Transaction {
            id: "t1".into(),
            tx_type: TransactionType::Delegate,
            sender_public_key: String::new(),
            sender_id: "alice".into(),
            recipient_id: None,
            amount: 0,
            fee: 10,
            timestamp: 0,
            signature: String::new(),
            sign_signature: None,
            signatures: None,
            asset: TransactionAsset { delegate_name: name.map(str::to_string), ..Default::default() },
        }
    }

    #[test]
    fn apply_registers_a_delegate_once() {
        let mut accounts = AccountTable::new();
        DelegateHandler.apply(&tx(Some("alice_d")), &mut accounts).unwrap();
        assert!(accounts["alice"].is_delegate);
        assert_eq!(accounts["alice"].delegate_name.as_deref(), Some("alice_d"));
    }

    #[test]
    fn apply_rejects_double_registration() {
        let mut accounts = AccountTable::new();
        DelegateHandler.apply(&tx(Some("alice_d")), &mut accounts).unwrap();
        let err = DelegateHandler.apply(&tx(Some("alice_d2")), &mut accounts).unwrap_err();
        assert!(matches!(err, chain_types::ChainError::State(StateError::AlreadyRegistered(..))));
    }

    #[test]
    fn validate_rejects_an_empty_name() {
        assert!(DelegateHandler.validate(&tx(Some(""))).is_err());
        assert!(DelegateHandler.validate(&tx(None)).is_err());
    }
}
