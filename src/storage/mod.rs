//! The storage node (§4.4): local-disk file contents behind a data endpoint
//! and a command endpoint.

mod client;
mod error;
mod messages;
mod node;
mod service;

pub use client::{CommandStub, DataStub};
pub use error::StorageError;
pub use messages::{CommandRequest, CommandResponse, DataRequest, DataResponse};
pub use node::{StorageNode, COPY_CHUNK_BYTES};
pub use service::{CommandService, DataService};
