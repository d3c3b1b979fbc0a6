//! Wire framing: a 4-byte big-endian length prefix followed by a
//! [`bincode`]-encoded payload. Self-describing enough that either peer can
//! decode without a pre-shared schema beyond the Rust type itself.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::RpcError;

/// Bounds how large a single frame may be, so a corrupt or hostile length
/// prefix can't force an unbounded allocation.
pub const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

pub async fn read_frame<T, R>(stream: &mut R) -> Result<T, RpcError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let len = stream.read_u32().await?;
    if len > MAX_FRAME_BYTES {
        return Err(RpcError::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf).await?;
    bincode::deserialize(&buf).map_err(|e| RpcError::Decode(e.to_string()))
}

pub async fn write_frame<T, W>(stream: &mut W, value: &T) -> Result<(), RpcError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let bytes = bincode::serialize(value).map_err(|e| RpcError::Encode(e.to_string()))?;
    if bytes.len() as u64 > MAX_FRAME_BYTES as u64 {
        return Err(RpcError::FrameTooLarge(bytes.len() as u32));
    }
    stream.write_u32(bytes.len() as u32).await?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_a_buffer() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &("hello".to_string(), 42u32)).await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let (s, n): (String, u32) = read_frame(&mut cursor).await.unwrap();
        assert_eq!(s, "hello");
        assert_eq!(n, 42);
    }

    #[tokio::test]
    async fn rejects_oversized_length_prefix() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_be_bytes());
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_frame::<String, _>(&mut cursor).await.unwrap_err();
        assert!(matches!(err, RpcError::FrameTooLarge(_)));
    }
}
