//! Naming coordinator error taxonomy (§7, naming-facing subset). `AlreadyExists`
//! is deliberately absent: every creation operation expresses that case as a
//! `false` return rather than an error, per §4.3's operation table.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum NamingError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("path does not resolve")]
    NotFound,
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl From<crate::storage::StorageError> for NamingError {
    fn from(e: crate::storage::StorageError) -> Self {
        NamingError::Rpc(e.to_string())
    }
}

impl From<crate::rpc::RpcError> for NamingError {
    fn from(e: crate::rpc::RpcError) -> Self {
        NamingError::Rpc(e.to_string())
    }
}

impl From<crate::tree::TreeError> for NamingError {
    fn from(_: crate::tree::TreeError) -> Self {
        NamingError::NotFound
    }
}
