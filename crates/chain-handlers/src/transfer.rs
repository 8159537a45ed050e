use chain_types::{Account, AccountTable, ChainResult, StateError, Transaction, TransactionHandler, TransactionType};

/// Type 0: move `amount` from sender to recipient, fee always leaves the sender.
pub struct TransferHandler;

impl TransactionHandler for TransferHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Transfer
    }

    fn validate(&self, tx: &Transaction) -> ChainResult<()> {
        if tx.recipient_id.is_none() {
            return Err(chain_types::ValidationError::Schema("transfer requires a recipientId".into()).into());
        }
        Ok(())
    }

    fn apply(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        let debit = tx.amount as i128 + tx.fee as i128;
        if sender.balance < debit {
            return Err(StateError::BalanceUnderflow { address: sender.address.clone(), balance: sender.balance, amount: debit }.into());
        }
        sender.balance -= debit;
        if let Some(recipient_id) = &tx.recipient_id {
            let recipient = accounts.entry(recipient_id.clone()).or_insert_with(|| Account::new(recipient_id.clone()));
            recipient.balance += tx.amount as i128;
        }
        Ok(())
    }

    fn undo(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        sender.balance += tx.amount as i128 + tx.fee as i128;
        if let Some(recipient_id) = &tx.recipient_id {
            let recipient = accounts.entry(recipient_id.clone()).or_insert_with(|| Account::new(recipient_id.clone()));
            recipient.balance -= tx.amount as i128;
        }
        Ok(())
    }
}
