//! Transport-level failures of the RPC substrate, distinct from any
//! application-level error a remote call's *reply* might carry.

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to connect to {0}: {1}")]
    Connect(SocketAddr, std::io::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode request: {0}")]
    Encode(String),
    #[error("failed to decode reply: {0}")]
    Decode(String),
    #[error("frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(u32),
    #[error("skeleton already started")]
    AlreadyStarted,
    #[error("skeleton is not running")]
    NotStarted,
}
