//! Dispatch glue: adapts [`Coordinator`] onto the generic [`rpc::Service`]
//! trait for the client service and the registration service.

use std::sync::Arc;

use async_trait::async_trait;

use crate::rpc;

use super::coordinator::Coordinator;
use super::messages::{ClientRequest, ClientResponse, RegistrationRequest, RegistrationResponse};

pub struct ClientService {
    coordinator: Arc<Coordinator>,
}

impl ClientService {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        ClientService { coordinator }
    }
}

#[async_trait]
impl rpc::Service for ClientService {
    type Request = ClientRequest;
    type Response = ClientResponse;

    async fn call(&self, request: ClientRequest) -> ClientResponse {
        match request {
            ClientRequest::Lock { path, exclusive } => {
                ClientResponse::Lock(self.coordinator.lock(&path, exclusive).await)
            }
            ClientRequest::Unlock { path, exclusive } => {
                ClientResponse::Unlock(self.coordinator.unlock(&path, exclusive).await)
            }
            ClientRequest::IsDirectory { path } => {
                ClientResponse::IsDirectory(self.coordinator.is_directory(&path).await)
            }
            ClientRequest::List { path } => ClientResponse::List(self.coordinator.list(&path).await),
            ClientRequest::CreateFile { path } => {
                ClientResponse::CreateFile(self.coordinator.create_file(&path).await)
            }
            ClientRequest::CreateDirectory { path } => {
                ClientResponse::CreateDirectory(self.coordinator.create_directory(&path).await)
            }
            ClientRequest::Delete { path } => ClientResponse::Delete(self.coordinator.delete(&path).await),
            ClientRequest::GetStorage { path } => {
                ClientResponse::GetStorage(self.coordinator.get_storage(&path).await)
            }
        }
    }
}

pub struct RegistrationService {
    coordinator: Arc<Coordinator>,
}

impl RegistrationService {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        RegistrationService { coordinator }
    }
}

#[async_trait]
impl rpc::Service for RegistrationService {
    type Request = RegistrationRequest;
    type Response = RegistrationResponse;

    async fn call(&self, request: RegistrationRequest) -> RegistrationResponse {
        match request {
            RegistrationRequest::Register { data, command, files } => {
                RegistrationResponse::Register(self.coordinator.register(data, command, files).await)
            }
        }
    }
}
