use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::message::MessageHeader;
use crate::transport::Transport;

pub mod bincode;

pub use self::bincode::{BincodeCodec, BincodeCodecFactory};

/// Codec trait for writing and reading messages over a borrowed transport
///
/// A message is an envelope (`*_message_begin`), one struct payload, and an
/// envelope terminator (`*_message_end`).
#[async_trait::async_trait]
pub trait Codec: Send {
    async fn write_message_begin(&mut self, header: &MessageHeader) -> Result<()>;

    async fn write_message_end(&mut self) -> Result<()>;

    /// Encode a struct payload
    async fn write_struct<S>(&mut self, value: &S) -> Result<()>
    where
        S: Serialize + Sync + ?Sized;

    /// Flush the underlying transport
    async fn flush(&mut self) -> Result<()>;

    async fn read_message_begin(&mut self) -> Result<MessageHeader>;

    async fn read_message_end(&mut self) -> Result<()>;

    /// Decode a struct payload
    async fn read_struct<D>(&mut self) -> Result<D>
    where
        D: DeserializeOwned + Send;
}

/// Produces a fresh codec bound to a transport
///
/// Codecs may keep per-direction state, so callers ask for a new one for
/// every message they write or read.
pub trait CodecFactory: Send + Sync {
    type Codec<'a, T>: Codec
    where
        T: Transport + 'a;

    fn codec<'a, T>(&self, transport: &'a mut T) -> Self::Codec<'a, T>
    where
        T: Transport + 'a;
}
