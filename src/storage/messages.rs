//! Wire request/reply pairs for the storage node's two remote interfaces:
//! the data endpoint (size/read/write) and the command endpoint
//! (create/delete/copy).

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::path::Path;

use super::error::StorageError;

#[derive(Debug, Serialize, Deserialize)]
pub enum DataRequest {
    Size { path: Path },
    Read { path: Path, offset: i64, length: i64 },
    Write { path: Path, offset: i64, data: Vec<u8> },
}

#[derive(Debug, Serialize, Deserialize)]
pub enum DataResponse {
    Size(Result<u64, StorageError>),
    Read(Result<Vec<u8>, StorageError>),
    Write(Result<(), StorageError>),
}

#[derive(Debug, Serialize, Deserialize)]
pub enum CommandRequest {
    Create { path: Path },
    Delete { path: Path },
    Copy { path: Path, source: SocketAddr },
}

#[derive(Debug, Serialize, Deserialize)]
pub enum CommandResponse {
    Create(Result<bool, StorageError>),
    Delete(Result<bool, StorageError>),
    Copy(Result<(), StorageError>),
}
