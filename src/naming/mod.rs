//! The naming coordinator (§4.3): the directory tree, the path lock table,
//! the storage registry, and the replication/invalidation workers they drive.

mod client;
mod coordinator;
mod error;
mod messages;
mod service;
mod workers;

pub use client::{ClientStub, RegistrationStub};
pub use coordinator::{Coordinator, DEFAULT_REPLICATION_THRESHOLD};
pub use error::NamingError;
pub use messages::{ClientRequest, ClientResponse, RegistrationRequest, RegistrationResponse};
pub use service::{ClientService, RegistrationService};
