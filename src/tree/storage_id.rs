//! Identity of a storage node: a pair of remote endpoints.

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// A storage node's identity: its data endpoint (size/read/write) paired with
/// its command endpoint (create/delete/copy). Equality, hashing, and ordering
/// are all by this endpoint pair, so a `HashSet<StorageId>` is exactly a
/// replica set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageId {
    pub data: SocketAddr,
    pub command: SocketAddr,
}

impl StorageId {
    pub fn new(data: SocketAddr, command: SocketAddr) -> Self {
        StorageId { data, command }
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage(data={}, command={})", self.data, self.command)
    }
}
