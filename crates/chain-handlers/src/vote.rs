use chain_types::{
    crypto, Account, AccountTable, ChainResult, Transaction, TransactionHandler, TransactionType, ValidationError,
};

/// Type 3: `asset.votes` is a list of `"+<publicKey>"` / `"-<publicKey>"`
/// deltas. Weight moved is the voter's own balance, added to or removed from
/// each named delegate's `vote_weight`.
pub struct VoteHandler;

fn split_vote(entry: &str) -> ChainResult<(bool, &str)> {
    if let Some(key) = entry.strip_prefix('+') {
        return Ok((true, key));
    }
    if let Some(key) = entry.strip_prefix('-') {
        return Ok((false, key));
    }
    Err(ValidationError::Schema(format!("malformed vote entry '{entry}'")).into())
}

impl TransactionHandler for VoteHandler {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Vote
    }

    fn validate(&self, tx: &Transaction) -> ChainResult<()> {
        let votes = tx.asset.votes.as_ref().filter(|v| !v.is_empty());
        let Some(votes) = votes else {
            return Err(ValidationError::Schema("vote transaction requires at least one delta".into()).into());
        };
        for entry in votes {
            split_vote(entry)?;
        }
        Ok(())
    }

    fn apply(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        sender.balance -= tx.fee as i128;
        let weight = sender.balance;
        let votes = tx.asset.votes.clone().unwrap_or_default();
        for entry in &votes {
            let (added, public_key) = split_vote(entry)?;
            let address = crypto::derive_address(public_key)
                .map_err(|e| ValidationError::Schema(format!("bad vote public key: {e}")))?;
            let delegate = accounts.entry(address.clone()).or_insert_with(|| Account::new(address));
            delegate.vote_weight += if added { weight } else { -weight };
        }
        Ok(())
    }

    fn undo(&self, tx: &Transaction, accounts: &mut AccountTable) -> ChainResult<()> {
        let sender = accounts.entry(tx.sender_id.clone()).or_insert_with(|| Account::new(tx.sender_id.clone()));
        let weight = sender.balance;
        let votes = tx.asset.votes.clone().unwrap_or_default();
        for entry in &votes {
            let (added, public_key) = split_vote(entry)?;
            let address = crypto::derive_address(public_key)
                .map_err(|e| ValidationError::Schema(format!("bad vote public key: {e}")))?;
            let delegate = accounts.entry(address.clone()).or_insert_with(|| Account::new(address));
            delegate.vote_weight -= if added { weight } else { -weight };
        }
        sender.balance += tx.fee as i128;
        Ok(())
    }
}
