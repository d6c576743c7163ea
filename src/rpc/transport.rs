//! Length-prefixed bincode framing over an async byte stream.
//!
//! Frame layout: a 4-byte big-endian length prefix followed by that many
//! bytes of `bincode`-encoded payload. `max_frame_size` guards against a
//! corrupt or hostile length prefix driving an unbounded allocation
//! (mirrors the length-prefix framing pattern used for the pack's
//! sync TCP KV store, adapted to `tokio`'s async I/O and to bincode
//! instead of a bespoke command encoding).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{MeshError, Result, TransportError};
use crate::rpc::proto::{Request, Response};

/// Writes one framed, bincode-encoded message.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T, max_frame_size: u32) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = bincode::serialize(msg)
        .map_err(|e| MeshError::from(TransportError::decode(format!("encode failed: {e}"))))?;
    if bytes.len() as u64 > max_frame_size as u64 {
        return Err(TransportError::FrameTooLarge {
            size: bytes.len() as u32,
            max: max_frame_size,
        }
        .into());
    }
    writer
        .write_all(&(bytes.len() as u32).to_be_bytes())
        .await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one framed, bincode-encoded message.
pub async fn read_frame<R, T>(reader: &mut R, max_frame_size: u32) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::ConnectionClosed.into());
        }
        Err(e) => return Err(TransportError::Io(e).into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > max_frame_size {
        return Err(TransportError::FrameTooLarge {
            size: len,
            max: max_frame_size,
        }
        .into());
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    bincode::deserialize(&buf)
        .map_err(|e| MeshError::from(TransportError::decode(format!("decode failed: {e}"))))
}

/// A pooled RPC connection to one data node or the coordinator.
///
/// Holds a single [`TcpStream`]; calls are strictly request/response
/// (no pipelining), matching the blocking Thrift client the source
/// pools (spec.md §4.8).
pub struct RpcClient {
    stream: TcpStream,
    max_frame_size: u32,
}

impl RpcClient {
    /// Opens a new connection to `addr`, bounded by `connect_timeout`.
    pub async fn connect(addr: &str, connect_timeout: Duration, max_frame_size: u32) -> Result<Self> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::Timeout(connect_timeout))?
            .map_err(|e| TransportError::connect(format!("{addr}: {e}")))?;
        stream.set_nodelay(true).ok();
        Ok(Self {
            stream,
            max_frame_size,
        })
    }

    /// Sends one request and awaits its response, bounded by `timeout`.
    ///
    /// On timeout or any I/O error the caller must discard this client
    /// (spec.md §4.8: "on any detected transport error the client must
    /// be discarded, not returned") rather than calling `call` again.
    pub async fn call(&mut self, req: &Request, timeout: Duration) -> Result<Response> {
        tokio::time::timeout(timeout, self.call_inner(req))
            .await
            .map_err(|_| MeshError::from(TransportError::Timeout(timeout)))?
    }

    async fn call_inner(&mut self, req: &Request) -> Result<Response> {
        write_frame(&mut self.stream, req, self.max_frame_size).await?;
        read_frame(&mut self.stream, self.max_frame_size).await
    }
}
