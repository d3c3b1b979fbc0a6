//! The RPC substrate (§4.5): wire framing, the server-side skeleton, and the
//! client-side stub helper that every per-interface stub in `naming` and
//! `storage` is built on.

mod error;
mod frame;
mod skeleton;
mod stub;

pub use error::RpcError;
pub use frame::{read_frame, write_frame, MAX_FRAME_BYTES};
pub use skeleton::{ListenErrorAction, Service, Skeleton};
pub use stub::call;
