//! Dispatch glue: adapts [`StorageNode`] onto the generic [`rpc::Service`]
//! trait for each of the storage node's two endpoints.

use std::sync::Arc;

use async_trait::async_trait;

use crate::rpc;

use super::messages::{CommandRequest, CommandResponse, DataRequest, DataResponse};
use super::node::StorageNode;

pub struct DataService {
    node: Arc<StorageNode>,
}

impl DataService {
    pub fn new(node: Arc<StorageNode>) -> Self {
        DataService { node }
    }
}

#[async_trait]
impl rpc::Service for DataService {
    type Request = DataRequest;
    type Response = DataResponse;

    async fn call(&self, request: DataRequest) -> DataResponse {
        match request {
            DataRequest::Size { path } => DataResponse::Size(self.node.size(&path).await),
            DataRequest::Read { path, offset, length } => {
                DataResponse::Read(self.node.read(&path, offset, length).await)
            }
            DataRequest::Write { path, offset, data } => {
                DataResponse::Write(self.node.write(&path, offset, &data).await)
            }
        }
    }
}

pub struct CommandService {
    node: Arc<StorageNode>,
}

impl CommandService {
    pub fn new(node: Arc<StorageNode>) -> Self {
        CommandService { node }
    }
}

#[async_trait]
impl rpc::Service for CommandService {
    type Request = CommandRequest;
    type Response = CommandResponse;

    async fn call(&self, request: CommandRequest) -> CommandResponse {
        match request {
            CommandRequest::Create { path } => CommandResponse::Create(self.node.create(&path).await),
            CommandRequest::Delete { path } => CommandResponse::Delete(self.node.delete(&path).await),
            CommandRequest::Copy { path, source } => {
                CommandResponse::Copy(self.node.copy(&path, source).await)
            }
        }
    }
}
