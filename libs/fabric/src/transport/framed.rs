use tracing::trace;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Largest frame accepted from a peer (100MB)
pub const MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

/// Length-prefix framing over another transport
///
/// Writes accumulate until `flush`, which sends them as one frame with a
/// 4-byte big-endian length prefix. Reads pull a whole frame before handing
/// out any of its bytes.
#[derive(Debug)]
pub struct FramedTransport<T> {
    inner: T,
    write_buf: Vec<u8>,
    read_buf: Vec<u8>,
    read_pos: usize,
    max_frame_size: usize,
}

impl<T: Transport> FramedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self::with_max_frame_size(inner, MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(inner: T, max_frame_size: usize) -> Self {
        Self {
            inner,
            write_buf: Vec::new(),
            read_buf: Vec::new(),
            read_pos: 0,
            max_frame_size,
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    async fn read_frame(&mut self) -> Result<()> {
        let mut prefix = [0u8; 4];
        self.inner.read_exact(&mut prefix).await?;
        let len = u32::from_be_bytes(prefix) as usize;

        if len > self.max_frame_size {
            return Err(Error::codec(format!("Frame too large: {} bytes", len)));
        }

        self.read_buf.clear();
        self.read_buf.resize(len, 0);
        self.inner.read_exact(&mut self.read_buf).await?;
        self.read_pos = 0;
        trace!(len, "Read frame");
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T: Transport> Transport for FramedTransport<T> {
    async fn open(&mut self) -> Result<()> {
        self.inner.open().await
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // Zero-length frames carry nothing; keep reading until one does
        while self.read_pos == self.read_buf.len() {
            self.read_frame().await?;
        }

        let available = &self.read_buf[self.read_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.read_pos += n;
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.write_buf.extend_from_slice(buf);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let len = u32::try_from(self.write_buf.len())
            .map_err(|_| Error::codec("Frame exceeds u32 length prefix"))?;

        let frame = std::mem::take(&mut self.write_buf);
        self.inner.write(&len.to_be_bytes()).await?;
        self.inner.write(&frame).await?;
        trace!(len, "Wrote frame");
        self.inner.flush().await
    }

    async fn close(&mut self) -> Result<()> {
        self.write_buf.clear();
        self.read_buf.clear();
        self.read_pos = 0;
        self.inner.close().await
    }
}
