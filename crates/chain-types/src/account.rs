use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::transaction::Address;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub public_key: Option<String>,
    pub balance: i128,
    pub u_balance: i128,
    pub is_delegate: bool,
    pub delegate_name: Option<String>,
    pub second_public_key: Option<String>,
    pub vote_weight: i128,
    pub multimin: u8,
    pub multilifetime: u8,
    /// member public keys registered on this wallet when it is a multisig account.
    pub multisignatures: Vec<String>,
    pub missed_blocks: u64,
    pub produced_blocks: u64,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            public_key: None,
            balance: 0,
            u_balance: 0,
            is_delegate: false,
            delegate_name: None,
            second_public_key: None,
            vote_weight: 0,
            multimin: 0,
            multilifetime: 0,
            multisignatures: Vec::new(),
            missed_blocks: 0,
            produced_blocks: 0,
        }
    }

    pub fn is_multisig(&self) -> bool {
        !self.multisignatures.is_empty()
    }
}

/// In-memory account table keyed by address, the shape `ChainStore` persists and
/// `chain-pool`'s `u_state` shadows.
pub type AccountTable = HashMap<Address, Account>;
