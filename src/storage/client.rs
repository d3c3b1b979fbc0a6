//! Client-side stubs for a storage node's two remote interfaces.

use std::fmt;
use std::net::SocketAddr;

use crate::path::Path;
use crate::rpc;

use super::error::StorageError;
use super::messages::{CommandRequest, CommandResponse, DataRequest, DataResponse};

fn unexpected_reply() -> StorageError {
    StorageError::Rpc("unexpected reply variant".into())
}

/// Proxy for a storage node's data endpoint (size/read/write). Two stubs are
/// equal iff they target the same endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataStub {
    addr: SocketAddr,
}

impl DataStub {
    pub fn new(addr: SocketAddr) -> Self {
        DataStub { addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn size(&self, path: &Path) -> Result<u64, StorageError> {
        let response: DataResponse =
            rpc::call(self.addr, &DataRequest::Size { path: path.clone() }).await?;
        match response {
            DataResponse::Size(r) => r,
            _ => Err(unexpected_reply()),
        }
    }

    pub async fn read(&self, path: &Path, offset: i64, length: i64) -> Result<Vec<u8>, StorageError> {
        let response: DataResponse =
            rpc::call(self.addr, &DataRequest::Read { path: path.clone(), offset, length }).await?;
        match response {
            DataResponse::Read(r) => r,
            _ => Err(unexpected_reply()),
        }
    }

    pub async fn write(&self, path: &Path, offset: i64, data: Vec<u8>) -> Result<(), StorageError> {
        let response: DataResponse =
            rpc::call(self.addr, &DataRequest::Write { path: path.clone(), offset, data }).await?;
        match response {
            DataResponse::Write(r) => r,
            _ => Err(unexpected_reply()),
        }
    }
}

impl fmt::Display for DataStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataStub({})", self.addr)
    }
}

/// Proxy for a storage node's command endpoint (create/delete/copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandStub {
    addr: SocketAddr,
}

impl CommandStub {
    pub fn new(addr: SocketAddr) -> Self {
        CommandStub { addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn create(&self, path: &Path) -> Result<bool, StorageError> {
        let response: CommandResponse =
            rpc::call(self.addr, &CommandRequest::Create { path: path.clone() }).await?;
        match response {
            CommandResponse::Create(r) => r,
            _ => Err(unexpected_reply()),
        }
    }

    pub async fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        let response: CommandResponse =
            rpc::call(self.addr, &CommandRequest::Delete { path: path.clone() }).await?;
        match response {
            CommandResponse::Delete(r) => r,
            _ => Err(unexpected_reply()),
        }
    }

    pub async fn copy(&self, path: &Path, source: SocketAddr) -> Result<(), StorageError> {
        let response: CommandResponse =
            rpc::call(self.addr, &CommandRequest::Copy { path: path.clone(), source }).await?;
        match response {
            CommandResponse::Copy(r) => r,
            _ => Err(unexpected_reply()),
        }
    }
}

impl fmt::Display for CommandStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandStub({})", self.addr)
    }
}
