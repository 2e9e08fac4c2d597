use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::{UnixListener, UnixStream};
use tracing::trace;

use crate::error::{Error, Result};
use crate::server::Listener;
use crate::transport::{with_timeout, Transport};

/// Buffered Unix domain socket transport
#[derive(Debug)]
pub struct UnixTransport {
    stream: Option<BufStream<UnixStream>>,
    path: Option<PathBuf>,
    connect_timeout: Option<Duration>,
    send_timeout: Option<Duration>,
    receive_timeout: Option<Duration>,
}

impl UnixTransport {
    /// Connect to a Unix socket with no timeouts
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).connect().await
    }

    /// Create a builder for configuring the transport
    pub fn builder() -> UnixTransportBuilder {
        UnixTransportBuilder::new()
    }

    /// Create from an existing UnixStream
    pub fn from_stream(stream: UnixStream) -> Self {
        Self {
            stream: Some(BufStream::new(stream)),
            path: None,
            connect_timeout: None,
            send_timeout: None,
            receive_timeout: None,
        }
    }

    /// Set the read and write deadline for this connection
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.send_timeout = timeout;
        self.receive_timeout = timeout;
    }

    fn connected_mut(&mut self) -> Result<&mut BufStream<UnixStream>> {
        self.stream
            .as_mut()
            .ok_or_else(|| Error::not_open("Connection not open"))
    }
}

#[async_trait::async_trait]
impl Transport for UnixTransport {
    async fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::already_open("Socket already connected"));
        }
        let path = self
            .path
            .clone()
            .ok_or_else(|| Error::not_open("Cannot open without a socket path"))?;

        let stream = with_timeout(self.connect_timeout, "Connect", async {
            UnixStream::connect(&path).await.map_err(Error::from)
        })
        .await?;
        trace!(path = %path.display(), "Unix connection opened");

        self.stream = Some(BufStream::new(stream));
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let timeout = self.receive_timeout;
        let stream = self.connected_mut()?;
        with_timeout(timeout, "Receive", async {
            stream.read(buf).await.map_err(Error::from)
        })
        .await
    }

    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        let timeout = self.send_timeout;
        let stream = self.connected_mut()?;
        with_timeout(timeout, "Send", async {
            stream.write_all(buf).await.map_err(Error::from)
        })
        .await
    }

    async fn flush(&mut self) -> Result<()> {
        let timeout = self.send_timeout;
        let stream = self.connected_mut()?;
        with_timeout(timeout, "Send", async {
            stream.flush().await.map_err(Error::from)
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            match stream.shutdown().await {
                Err(e) if e.kind() != std::io::ErrorKind::NotConnected => return Err(e.into()),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Unix socket listener
///
/// A listener created with [`bind`](Self::bind) owns its socket file and
/// removes it when dropped. One adopted through [`from_std`](Self::from_std)
/// leaves the file to whoever bound it.
pub struct UnixSocketListener {
    listener: UnixListener,
    path: PathBuf,
    remove_on_drop: bool,
}

impl UnixSocketListener {
    /// Bind to a Unix socket path, replacing a stale socket file
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        let listener = UnixListener::bind(&path)?;
        Ok(Self {
            listener,
            path,
            remove_on_drop: true,
        })
    }

    /// Adopt an already-listening std socket, e.g. one inherited from a parent process
    pub fn from_std(
        listener: std::os::unix::net::UnixListener,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener: UnixListener::from_std(listener)?,
            path: path.as_ref().to_path_buf(),
            remove_on_drop: false,
        })
    }

    /// Get the path this listener is bound to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixSocketListener {
    fn drop(&mut self) {
        if self.remove_on_drop {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[async_trait::async_trait]
impl Listener for UnixSocketListener {
    type Connection = UnixTransport;
    type Addr = PathBuf;

    async fn accept_connection(&self) -> std::io::Result<UnixTransport> {
        let (stream, _) = self.listener.accept().await?;
        trace!(path = %self.path.display(), "Accepted Unix connection");
        Ok(UnixTransport::from_stream(stream))
    }

    fn configure(connection: &mut UnixTransport, timeout: Option<Duration>) {
        connection.set_timeout(timeout);
    }

    fn local_addr(&self) -> std::io::Result<PathBuf> {
        Ok(self.path.clone())
    }
}

/// Builder for configuring Unix socket transport
#[derive(Default)]
pub struct UnixTransportBuilder {
    path: Option<PathBuf>,
    connect_timeout: Option<Duration>,
    send_timeout: Option<Duration>,
    receive_timeout: Option<Duration>,
}

impl UnixTransportBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path to connect to
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Set the receive timeout
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout);
        self
    }

    /// Connect with the configured settings
    pub async fn connect(self) -> Result<UnixTransport> {
        let mut transport = UnixTransport {
            stream: None,
            path: self.path,
            connect_timeout: self.connect_timeout,
            send_timeout: self.send_timeout,
            receive_timeout: self.receive_timeout,
        };
        transport.open().await?;
        Ok(transport)
    }
}
