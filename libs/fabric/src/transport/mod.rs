use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result, TransportErrorKind};

pub mod framed;
pub mod memory;
pub mod tcp;
#[cfg(unix)]
pub mod unix;

pub use self::framed::FramedTransport;
pub use self::memory::MemoryTransport;
pub use self::tcp::{TcpTransport, TcpTransportBuilder};
#[cfg(unix)]
pub use self::unix::{UnixSocketListener, UnixTransport, UnixTransportBuilder};

/// Transport trait for moving raw bytes over a single connection
///
/// Codecs borrow a transport for the duration of one message; the transport
/// itself outlives them and is shared by every call made on it.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Open the underlying connection
    async fn open(&mut self) -> Result<()>;

    /// Whether the connection is currently open
    fn is_open(&self) -> bool;

    /// Read up to `buf.len()` bytes, returning how many were read
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write the whole buffer
    async fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Push buffered writes to the peer
    async fn flush(&mut self) -> Result<()>;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;

    /// Fill `buf` completely, failing with `EndOfFile` if the peer hangs up first
    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(Error::transport(
                    TransportErrorKind::EndOfFile,
                    "Connection closed",
                ));
            }
            filled += n;
        }
        Ok(())
    }
}

/// Run `op` under an optional deadline. A zero duration means no deadline.
pub(crate) async fn with_timeout<T>(
    timeout: Option<Duration>,
    what: &str,
    op: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout.filter(|limit| !limit.is_zero()) {
        Some(limit) => tokio::time::timeout(limit, op).await.map_err(|_| {
            Error::transport(
                TransportErrorKind::TimedOut,
                format!("{} timeout exceeded", what),
            )
        })?,
        None => op.await,
    }
}
