use chain_types::{Account, AccountTable, ChainResult, Transaction, TransactionHandler, TransactionType};

/// Types 5-7: dapp-sidechain registration and its in/out transfers. A full
/// dapp registry is smart-contract-shaped state this chain doesn't model, so
/// these only validate shape and charge the fee — `amount` still moves
/// in/out of the sender for the transfer variants, same as a plain transfer
/// with no recipient-side dapp balance to credit.
pub struct DappHandler;
pub struct InTransferHandler;
pub struct OutTransferHandler;

fn charge_fee(tx: &Transaction, accounts: &mut AccountTable) {
    let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
    sender.balance -= tx.fee as i128;
}

fn refund_fee(tx: &Transaction, accounts: &mut AccountTable) {
    let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
    sender.balance += tx.fee as i128;
}

impl TransactionHandler for DappHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Dapp
    }

    fn validate(&self, _tx: &Transaction) -> ChainResult<()> {
        Ok(())
    }

    fn apply(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        charge_fee(tx, accounts);
        Ok(())
    }

    fn undo(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        refund_fee(tx, accounts);
        Ok(())
    }
}

impl TransactionHandler for InTransferHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::InTransfer
    }

    fn validate(&self, _tx: &Transaction) -> ChainResult<()> {
        Ok(())
    }

    fn apply(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        sender.balance -= tx.amount as i128 + tx.fee as i128;
        Ok(())
    }

    fn undo(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        sender.balance += tx.amount as i128 + tx.fee as i128;
        Ok(())
    }
}

impl TransactionHandler for OutTransferHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::OutTransfer
    }

    fn validate(&self, tx: &Transaction) -> ChainResult<()> {
        if tx.recipient_id.is_none() {
            return Err(chain_types::ValidationError::Schema("outTransfer requires a recipientId".into()).into());
        }
        Ok(())
    }

    fn apply(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        charge_fee(tx, accounts);
        if let Some(recipient_id) = &tx.recipient_id {
            let recipient = accounts.entry(recipient_id.clone()).or_insert_with(|| Account::new(recipient_id.clone()));
            recipient.balance += tx.amount as i128;
        }
        Ok(())
    }

    fn undo(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        refund_fee(tx, accounts);
        if let Some(recipient_id) = &tx.recipient_id {
            let recipient = accounts.entry(recipient_id.clone()).or_insert_with(|| Account::new(recipient_id.clone()));
            recipient.balance -= tx.amount as i128;
        }
        Ok(())
    }
}
