//! `ChainApiError` and its conversion to `ErrorObjectOwned`, mirroring
//! `OrderApiError`: one enum per RPC-visible rejection, one `From` impl that
//! picks the JSON-RPC error code.

use chain_types::{Address, ChainError};
use jsonrpsee::types::{ErrorCode, ErrorObjectOwned};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainApiError {
    /// `postTransaction` rejection; carries the underlying validation/consensus
    /// failure so the caller sees why the transaction was refused.
    #[error("InvalidTransactionError: {0}")]
    InvalidTransaction(ChainError),

    #[error("wallet {0} is not a multisignature account")]
    NotMultisig(Address),

    #[error("{0} candidate ids exceeds the 1000-id limit")]
    TooManyCandidates(usize),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

pub fn invalid_params_rpc_err(message: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(ErrorCode::InvalidParams.code(), message.into(), None::<()>)
}

pub fn rpc_err(code: i32, message: impl Into<String>, data: Option<impl Serialize>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, message.into(), data)
}

impl From<ChainApiError> for ErrorObjectOwned {
    fn from(err: ChainApiError) -> Self {
        let message = err.to_string();
        match err {
            ChainApiError::InvalidTransaction(_) | ChainApiError::NotMultisig(_) | ChainApiError::TooManyCandidates(_) => {
                invalid_params_rpc_err(message)
            }
            ChainApiError::Chain(_) => rpc_err(ErrorCode::InternalError.code(), message, None::<()>),
        }
    }
}
