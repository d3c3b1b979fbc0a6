//! Storage node error taxonomy (§7, storage-facing subset).

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum StorageError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found")]
    NotFound,
    #[error("i/o error: {0}")]
    Io(String),
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound
        } else {
            StorageError::Io(e.to_string())
        }
    }
}

impl From<crate::rpc::RpcError> for StorageError {
    fn from(e: crate::rpc::RpcError) -> Self {
        StorageError::Rpc(e.to_string())
    }
}
