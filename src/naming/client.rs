//! Client-side stubs for the naming coordinator's two remote interfaces.

use std::fmt;
use std::net::SocketAddr;

use crate::path::Path;
use crate::rpc;
use crate::tree::StorageId;

use super::error::NamingError;
use super::messages::{ClientRequest, ClientResponse, RegistrationRequest, RegistrationResponse};

fn unexpected_reply() -> NamingError {
    NamingError::Rpc("unexpected reply variant".into())
}

/// Proxy for the naming coordinator's client service. Two stubs are equal
/// iff they target the same endpoint (§4.5 "Stub identity").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientStub {
    addr: SocketAddr,
}

impl ClientStub {
    pub fn new(addr: SocketAddr) -> Self {
        ClientStub { addr }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn lock(&self, path: &Path, exclusive: bool) -> Result<(), NamingError> {
        let response: ClientResponse =
            rpc::call(self.addr, &ClientRequest::Lock { path: path.clone(), exclusive }).await?;
        match response {
            ClientResponse::Lock(r) => r,
            _ => Err(unexpected_reply()),
        }
    }

    pub async fn unlock(&self, path: &Path, exclusive: bool) -> Result<(), NamingError> {
        let response: ClientResponse =
            rpc::call(self.addr, &ClientRequest::Unlock { path: path.clone(), exclusive }).await?;
        match response {
            ClientResponse::Unlock(r) => r,
            _ => Err(unexpected_reply()),
        }
    }

    pub async fn is_directory(&self, path: &Path) -> Result<bool, NamingError> {
        let response: ClientResponse =
            rpc::call(self.addr, &ClientRequest::IsDirectory { path: path.clone() }).await?;
        match response {
            ClientResponse::IsDirectory(r) => r,
            _ => Err(unexpected_reply()),
        }
    }

    pub async fn list(&self, path: &Path) -> Result<Vec<String>, NamingError> {
        let response: ClientResponse =
            rpc::call(self.addr, &ClientRequest::List { path: path.clone() }).await?;
        match response {
            ClientResponse::List(r) => r,
            _ => Err(unexpected_reply()),
        }
    }

    pub async fn create_file(&self, path: &Path) -> Result<bool, NamingError> {
        let response: ClientResponse =
            rpc::call(self.addr, &ClientRequest::CreateFile { path: path.clone() }).await?;
        match response {
            ClientResponse::CreateFile(r) => r,
            _ => Err(unexpected_reply()),
        }
    }

    pub async fn create_directory(&self, path: &Path) -> Result<bool, NamingError> {
        let response: ClientResponse =
            rpc::call(self.addr, &ClientRequest::CreateDirectory { path: path.clone() }).await?;
        match response {
            ClientResponse::CreateDirectory(r) => r,
            _ => Err(unexpected_reply()),
        }
    }

    pub async fn delete(&self, path: &Path) -> Result<bool, NamingError> {
        let response: ClientResponse =
            rpc::call(self.addr, &ClientRequest::Delete { path: path.clone() }).await?;
        match response {
            ClientResponse::Delete(r) => r,
            _ => Err(unexpected_reply()),
        }
    }

    pub async fn get_storage(&self, path: &Path) -> Result<StorageId, NamingError> {
        let response: ClientResponse =
            rpc::call(self.addr, &ClientRequest::GetStorage { path: path.clone() }).await?;
        match response {
            ClientResponse::GetStorage(r) => r,
            _ => Err(unexpected_reply()),
        }
    }
}

impl fmt::Display for ClientStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientStub({})", self.addr)
    }
}

/// Proxy for the naming coordinator's storage registration service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationStub {
    addr: SocketAddr,
}

impl RegistrationStub {
    pub fn new(addr: SocketAddr) -> Self {
        RegistrationStub { addr }
    }

    pub async fn register(
        &self,
        data: SocketAddr,
        command: SocketAddr,
        files: Vec<Path>,
    ) -> Result<Vec<Path>, NamingError> {
        let response: RegistrationResponse =
            rpc::call(self.addr, &RegistrationRequest::Register { data, command, files }).await?;
        match response {
            RegistrationResponse::Register(r) => r,
        }
    }
}

impl fmt::Display for RegistrationStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegistrationStub({})", self.addr)
    }
}
