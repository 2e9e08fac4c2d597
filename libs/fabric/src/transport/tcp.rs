use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::{TcpListener, TcpStream};
use tracing::trace;

use crate::error::{Error, Result};
use crate::server::Listener;
use crate::transport::{with_timeout, Transport};

/// Buffered TCP transport
///
/// Writes are buffered until `flush`. A zero timeout disables the deadline.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<BufStream<TcpStream>>,
    address: Option<SocketAddr>,
    connect_timeout: Option<Duration>,
    send_timeout: Option<Duration>,
    receive_timeout: Option<Duration>,
}

impl TcpTransport {
    /// Connect to a remote TCP address with no timeouts
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::builder().address(addr).connect().await
    }

    /// Connect with a connect timeout
    pub async fn connect_timeout(addr: SocketAddr, timeout: Duration) -> Result<Self> {
        Self::builder()
            .address(addr)
            .connect_timeout(timeout)
            .connect()
            .await
    }

    /// Create a builder for configuring the transport
    pub fn builder() -> TcpTransportBuilder {
        TcpTransportBuilder::new()
    }

    /// Create from an existing TcpStream
    pub fn from_stream(stream: TcpStream) -> Self {
        let address = stream.peer_addr().ok();
        Self {
            stream: Some(BufStream::new(stream)),
            address,
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

    /// Get the remote address of this connection
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.connected()?.get_ref().peer_addr().map_err(Into::into)
    }

    /// Get the local address of this connection
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.connected()?.get_ref().local_addr().map_err(Into::into)
    }

    fn connected(&self) -> Result<&BufStream<TcpStream>> {
        self.stream
            .as_ref()
            .ok_or_else(|| Error::not_open("Connection not open"))
    }

    fn connected_mut(&mut self) -> Result<&mut BufStream<TcpStream>> {
        self.stream
            .as_mut()
            .ok_or_else(|| Error::not_open("Connection not open"))
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::already_open("Socket already connected"));
        }
        let addr = self
            .address
            .ok_or_else(|| Error::not_open("Cannot open without an address"))?;

        let stream = with_timeout(self.connect_timeout, "Connect", async {
            TcpStream::connect(addr).await.map_err(Error::from)
        })
        .await?;
        trace!(%addr, "TCP connection opened");

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

#[async_trait::async_trait]
impl Listener for TcpListener {
    type Connection = TcpTransport;
    type Addr = SocketAddr;

    async fn accept_connection(&self) -> std::io::Result<TcpTransport> {
        let (stream, peer) = self.accept().await?;
        trace!(%peer, "Accepted TCP connection");
        Ok(TcpTransport::from_stream(stream))
    }

    fn configure(connection: &mut TcpTransport, timeout: Option<Duration>) {
        connection.set_timeout(timeout);
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Builder for configuring TCP transport
#[derive(Default)]
pub struct TcpTransportBuilder {
    address: Option<SocketAddr>,
    connect_timeout: Option<Duration>,
    send_timeout: Option<Duration>,
    receive_timeout: Option<Duration>,
}

impl TcpTransportBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address to connect to
    pub fn address(mut self, addr: SocketAddr) -> Self {
        self.address = Some(addr);
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

    /// Build an unopened transport; call [`Transport::open`] to connect
    pub fn build(self) -> TcpTransport {
        TcpTransport {
            stream: None,
            address: self.address,
            connect_timeout: self.connect_timeout,
            send_timeout: self.send_timeout,
            receive_timeout: self.receive_timeout,
        }
    }

    /// Connect with the configured settings
    pub async fn connect(self) -> Result<TcpTransport> {
        let mut transport = self.build();
        transport.open().await?;
        Ok(transport)
    }
}
