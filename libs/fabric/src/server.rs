use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// A bound, listening socket that yields connection transports
#[async_trait::async_trait]
pub trait Listener: Send + Sync + 'static {
    type Connection: Transport;
    type Addr: fmt::Debug + Clone + Send;

    /// Wait for the next incoming connection
    async fn accept_connection(&self) -> std::io::Result<Self::Connection>;

    /// Apply the per-connection read/write timeout
    fn configure(connection: &mut Self::Connection, timeout: Option<Duration>);

    fn local_addr(&self) -> std::io::Result<Self::Addr>;
}

/// Listening socket with cooperative shutdown
///
/// One task awaits [`accept`](Self::accept) while another may call
/// [`interrupt`](Self::interrupt) or [`close`](Self::close); all three take
/// `&self`, so share the socket through an `Arc`. Either call wakes a pending
/// accept: after `interrupt` it fails with [`Error::Interrupted`], after
/// `close` alone with a `NotOpen` transport error.
pub struct ServerSocket<L: Listener = TcpListener> {
    listener: Mutex<Option<Arc<L>>>,
    interrupted: AtomicBool,
    wake: Notify,
    client_timeout: Option<Duration>,
}

impl ServerSocket<TcpListener> {
    /// Bind a TCP listener with no per-connection timeout
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::bind_timeout(addr, Duration::ZERO).await
    }

    /// Bind a TCP listener; accepted connections use `client_timeout`
    pub async fn bind_timeout(addr: impl ToSocketAddrs, client_timeout: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        debug!(addr = ?listener.local_addr().ok(), "Server socket listening");
        Ok(Self::from_listener(listener, client_timeout))
    }

    /// Adopt a std listener that is already bound and listening
    pub fn from_std(listener: std::net::TcpListener, client_timeout: Duration) -> Result<Self> {
        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;
        Ok(Self::from_listener(listener, client_timeout))
    }

    /// Adopt a listening socket inherited as a raw OS handle
    #[cfg(unix)]
    pub fn from_fd(fd: std::os::fd::OwnedFd, client_timeout: Duration) -> Result<Self> {
        Self::from_std(std::net::TcpListener::from(fd), client_timeout)
    }

    /// Create a builder for configuring the server socket
    pub fn builder() -> ServerSocketBuilder {
        ServerSocketBuilder::new()
    }
}

impl<L: Listener> ServerSocket<L> {
    /// Wrap a listener that is already bound. A zero timeout means none.
    pub fn from_listener(listener: L, client_timeout: Duration) -> Self {
        Self {
            listener: Mutex::new(Some(Arc::new(listener))),
            interrupted: AtomicBool::new(false),
            wake: Notify::new(),
            client_timeout: (!client_timeout.is_zero()).then_some(client_timeout),
        }
    }

    /// Binding happens at construction, so there is nothing left to do
    pub fn listen(&self) -> Result<()> {
        Ok(())
    }

    /// Fails if the socket is already listening, which it is from construction
    /// until [`close`](Self::close)
    pub fn open(&self) -> Result<()> {
        if self.is_listening() {
            return Err(Error::already_open("Server socket already open"));
        }
        Ok(())
    }

    /// Wait for the next connection
    pub async fn accept(&self) -> Result<L::Connection> {
        // Register for wake-ups before checking state so an interrupt or close
        // landing between the check and the wait is not missed.
        let woken = self.wake.notified();
        tokio::pin!(woken);
        woken.as_mut().enable();

        if self.is_interrupted() {
            return Err(Error::Interrupted);
        }
        let listener = self
            .handle()
            .ok_or_else(|| Error::not_open("No underlying server socket"))?;

        tokio::select! {
            accepted = listener.accept_connection() => {
                let mut connection = accepted.map_err(|e| {
                    warn!(error = %e, "Accept failed");
                    Error::from(e)
                })?;
                L::configure(&mut connection, self.client_timeout);
                Ok(connection)
            }
            _ = &mut woken => {
                if self.is_interrupted() {
                    debug!("Accept interrupted");
                    Err(Error::Interrupted)
                } else {
                    Err(Error::not_open("Server socket closed"))
                }
            }
        }
    }

    pub fn is_listening(&self) -> bool {
        self.lock().is_some()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    /// Timeout handed to each accepted connection
    pub fn client_timeout(&self) -> Option<Duration> {
        self.client_timeout
    }

    /// Local address of the listener
    pub fn addr(&self) -> Result<L::Addr> {
        let listener = self
            .handle()
            .ok_or_else(|| Error::not_open("No underlying server socket"))?;
        listener.local_addr().map_err(Into::into)
    }

    /// Release the listener. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.lock().take().is_some() {
            debug!("Server socket closed");
            self.wake.notify_waiters();
        }
        Ok(())
    }

    /// Ask pending and future accepts to stop. The listener stays open.
    pub fn interrupt(&self) -> Result<()> {
        self.interrupted.store(true, Ordering::Release);
        debug!("Server socket interrupted");
        self.wake.notify_waiters();
        Ok(())
    }

    fn handle(&self) -> Option<Arc<L>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<L>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builder for a TCP [`ServerSocket`]
#[derive(Debug, Clone, Default)]
pub struct ServerSocketBuilder {
    address: Option<String>,
    client_timeout: Duration,
}

impl ServerSocketBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address to listen on
    pub fn address(mut self, addr: impl Into<String>) -> Self {
        self.address = Some(addr.into());
        self
    }

    /// Set the read/write timeout for accepted connections
    pub fn client_timeout(mut self, timeout: Duration) -> Self {
        self.client_timeout = timeout;
        self
    }

    /// Bind with the configured settings
    pub async fn bind(self) -> Result<ServerSocket> {
        let addr = self.address.ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Listen address not set")
        })?;
        ServerSocket::bind_timeout(addr.as_str(), self.client_timeout).await
    }
}
