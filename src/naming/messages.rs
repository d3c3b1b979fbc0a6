//! Wire request/reply pairs for the naming coordinator's two remote
//! interfaces: the client service and the storage registration service.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::path::Path;
use crate::tree::StorageId;

use super::error::NamingError;

#[derive(Debug, Serialize, Deserialize)]
pub enum ClientRequest {
    Lock { path: Path, exclusive: bool },
    Unlock { path: Path, exclusive: bool },
    IsDirectory { path: Path },
    List { path: Path },
    CreateFile { path: Path },
    CreateDirectory { path: Path },
    Delete { path: Path },
    GetStorage { path: Path },
}

#[derive(Debug, Serialize, Deserialize)]
pub enum ClientResponse {
    Lock(Result<(), NamingError>),
    Unlock(Result<(), NamingError>),
    IsDirectory(Result<bool, NamingError>),
    List(Result<Vec<String>, NamingError>),
    CreateFile(Result<bool, NamingError>),
    CreateDirectory(Result<bool, NamingError>),
    Delete(Result<bool, NamingError>),
    GetStorage(Result<StorageId, NamingError>),
}

#[derive(Debug, Serialize, Deserialize)]
pub enum RegistrationRequest {
    Register { data: SocketAddr, command: SocketAddr, files: Vec<Path> },
}

#[derive(Debug, Serialize, Deserialize)]
pub enum RegistrationResponse {
    Register(Result<Vec<Path>, NamingError>),
}
