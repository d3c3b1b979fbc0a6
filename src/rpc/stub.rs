//! The client side of the RPC substrate: one TCP connection per call (§4.5
//! "Stub").

use std::net::SocketAddr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpStream;

use super::error::RpcError;
use super::frame;

/// Opens a connection to `addr`, sends one framed request, reads one framed
/// reply, and closes the connection. Concrete per-interface stub types (e.g.
/// `naming::ClientStub`) are thin wrappers around a `SocketAddr` that call
/// this for each method.
pub async fn call<Req, Resp>(addr: SocketAddr, request: &Req) -> Result<Resp, RpcError>
where
    Req: Serialize + Sync,
    Resp: DeserializeOwned,
{
    let mut stream =
        TcpStream::connect(addr).await.map_err(|e| RpcError::Connect(addr, e))?;
    stream.set_nodelay(true).ok();
    frame::write_frame(&mut stream, request).await?;
    frame::read_frame(&mut stream).await
}
