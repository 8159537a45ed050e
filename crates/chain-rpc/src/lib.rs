//! The module-action surface from the host-channel contract, realized as a
//! jsonrpsee server: one `ChainActionsApi` trait, one `ChainApi` struct
//! implementing it over the node's in-process collaborators.

mod api;
mod error;
mod impls;

pub use api::{
    BlocksCommonResponse, BlocksResponse, ChainActionsApiClient, ChainActionsApiServer, ForgingStatusEntry,
    GetTransactionsResponse, ModuleOptions, NodeStatusResponse, PostBlockResponse, PostTransactionResponse,
    PostTransactionsResponse, UpdateForgingStatusResponse,
};
pub use error::{invalid_params_rpc_err, rpc_err, ChainApiError};
pub use impls::ChainApi;
