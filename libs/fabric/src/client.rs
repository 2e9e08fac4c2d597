use std::net::SocketAddr;
#[cfg(unix)]
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::codec::{Codec, CodecFactory};
use crate::error::{Error, Result};
use crate::exception::{ApplicationException, ApplicationExceptionKind};
use crate::message::{MessageHeader, MessageKind};
use crate::transport::{TcpTransport, Transport};
#[cfg(unix)]
use crate::transport::UnixTransport;

/// Client that correlates each request with its reply
///
/// Every call is stamped with the next sequence id; the reply must echo the
/// method name and that id. Calls take `&mut self`, so one client serves one
/// caller at a time. Share a connection between tasks by giving each its own
/// client or by wrapping the client in a mutex.
pub struct Client<T, F> {
    transport: T,
    factory: F,
    seq_id: i32,
}

impl<T: Transport, F: CodecFactory> Client<T, F> {
    /// Create a client over an already-open transport
    pub fn new(transport: T, factory: F) -> Self {
        Self {
            transport,
            factory,
            seq_id: 0,
        }
    }

    /// Sequence id the next call will use
    pub fn seq_id(&self) -> i32 {
        self.seq_id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Call `method` and wait for its reply
    pub async fn call<A, R>(&mut self, method: &str, args: &A) -> Result<R>
    where
        A: Serialize + Sync + ?Sized,
        R: DeserializeOwned + Send,
    {
        let seq_id = self.next_seq_id();
        debug!(method, seq_id, "Calling");

        let mut oprot = self.factory.codec(&mut self.transport);
        send_request(&mut oprot, seq_id, method, args).await?;
        drop(oprot);

        let mut iprot = self.factory.codec(&mut self.transport);
        let reply = recv_reply(&mut iprot, seq_id, method).await;
        debug!(method, seq_id, ok = reply.is_ok(), "Call finished");
        reply
    }

    /// Send `method` without waiting for a reply
    ///
    /// Returns as soon as the request is flushed; nothing is read back.
    pub async fn call_oneway<A>(&mut self, method: &str, args: &A) -> Result<()>
    where
        A: Serialize + Sync + ?Sized,
    {
        let seq_id = self.next_seq_id();
        debug!(method, seq_id, "Calling one-way");

        let mut oprot = self.factory.codec(&mut self.transport);
        send_request(&mut oprot, seq_id, method, args).await
    }

    /// Close the underlying transport
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }

    fn next_seq_id(&mut self) -> i32 {
        let seq_id = self.seq_id;
        self.seq_id = self.seq_id.wrapping_add(1);
        seq_id
    }
}

impl<F: CodecFactory> Client<TcpTransport, F> {
    /// Connect a client over TCP
    pub async fn tcp(addr: SocketAddr, factory: F) -> Result<Self> {
        let transport = TcpTransport::connect(addr).await?;
        Ok(Self::new(transport, factory))
    }
}

#[cfg(unix)]
impl<F: CodecFactory> Client<UnixTransport, F> {
    /// Connect a client over a Unix socket
    pub async fn unix(path: impl AsRef<Path>, factory: F) -> Result<Self> {
        let transport = UnixTransport::connect(path).await?;
        Ok(Self::new(transport, factory))
    }
}

/// Write one request message and flush it
pub async fn send_request<C, A>(codec: &mut C, seq_id: i32, method: &str, args: &A) -> Result<()>
where
    C: Codec,
    A: Serialize + Sync + ?Sized,
{
    codec
        .write_message_begin(&MessageHeader::new(method, MessageKind::Call, seq_id))
        .await?;
    codec.write_struct(args).await?;
    codec.write_message_end().await?;
    codec.flush().await
}

/// Read the reply to request `seq_id` of `method`
///
/// The envelope is checked for method name, then sequence id, then kind. A
/// remote exception is returned as [`Error::Application`].
pub async fn recv_reply<C, R>(codec: &mut C, seq_id: i32, method: &str) -> Result<R>
where
    C: Codec,
    R: DeserializeOwned + Send,
{
    let header = codec.read_message_begin().await?;

    if header.name != method {
        return Err(Error::application(
            ApplicationExceptionKind::WrongMethodName,
            format!("{}: wrong method name", method),
        ));
    }
    if header.seq_id != seq_id {
        return Err(Error::application(
            ApplicationExceptionKind::BadSequenceId,
            format!("{}: out of order sequence response", method),
        ));
    }
    if header.kind == MessageKind::Exception {
        let exception: ApplicationException = codec.read_struct().await?;
        codec.read_message_end().await?;
        return Err(exception.into());
    }
    if header.kind != MessageKind::Reply {
        return Err(Error::application(
            ApplicationExceptionKind::InvalidMessageType,
            format!("{}: invalid message type", method),
        ));
    }

    let result = codec.read_struct().await?;
    codec.read_message_end().await?;
    Ok(result)
}
