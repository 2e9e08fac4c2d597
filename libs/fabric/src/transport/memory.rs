use crate::error::{Error, Result};
use crate::transport::Transport;

/// In-process transport backed by byte buffers
///
/// Reads drain a preloaded input buffer; writes append to an output buffer.
/// Every `read` call is counted, so tests can assert that nothing was read.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    input: Vec<u8>,
    read_pos: usize,
    output: Vec<u8>,
    reads: usize,
    closed: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport whose reads return `input`
    pub fn with_input(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// Everything written so far
    pub fn written(&self) -> &[u8] {
        &self.output
    }

    /// Take the written bytes, leaving the output buffer empty
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Number of `read` calls made
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Bytes not yet consumed by reads
    pub fn remaining(&self) -> usize {
        self.input.len() - self.read_pos
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn open(&mut self) -> Result<()> {
        if !self.closed {
            return Err(Error::already_open("Memory transport already open"));
        }
        self.closed = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(Error::not_open("Memory transport closed"));
        }
        self.reads += 1;

        let available = &self.input[self.read_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.read_pos += n;
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::not_open("Memory transport closed"));
        }
        self.output.extend_from_slice(buf);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
