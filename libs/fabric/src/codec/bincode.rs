use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{Codec, CodecFactory};
use crate::error::{Error, Result};
use crate::message::MessageHeader;
use crate::transport::framed::MAX_FRAME_SIZE;
use crate::transport::Transport;

/// Bincode codec for binary serialization
///
/// Envelopes and payloads are each written as a 4-byte big-endian length
/// followed by their bincode encoding. The envelope terminator is empty.
pub struct BincodeCodec<'a, T> {
    transport: &'a mut T,
}

impl<'a, T: Transport> BincodeCodec<'a, T> {
    pub fn new(transport: &'a mut T) -> Self {
        Self { transport }
    }

    async fn write_blob<S: Serialize + ?Sized>(&mut self, value: &S) -> Result<()> {
        let bytes = bincode::serialize(value).map_err(|e| Error::Codec(e.to_string()))?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| Error::codec(format!("Value too large: {} bytes", bytes.len())))?;

        self.transport.write(&len.to_be_bytes()).await?;
        self.transport.write(&bytes).await
    }

    async fn read_blob<D: DeserializeOwned>(&mut self) -> Result<D> {
        let mut prefix = [0u8; 4];
        self.transport.read_exact(&mut prefix).await?;
        let len = u32::from_be_bytes(prefix) as usize;

        if len > MAX_FRAME_SIZE {
            return Err(Error::codec(format!("Value too large: {} bytes", len)));
        }

        let mut bytes = vec![0u8; len];
        self.transport.read_exact(&mut bytes).await?;
        bincode::deserialize(&bytes).map_err(|e| Error::Codec(e.to_string()))
    }
}

#[async_trait::async_trait]
impl<'a, T: Transport + 'a> Codec for BincodeCodec<'a, T> {
    async fn write_message_begin(&mut self, header: &MessageHeader) -> Result<()> {
        self.write_blob(header).await
    }

    async fn write_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn write_struct<S>(&mut self, value: &S) -> Result<()>
    where
        S: Serialize + Sync + ?Sized,
    {
        self.write_blob(value).await
    }

    async fn flush(&mut self) -> Result<()> {
        self.transport.flush().await
    }

    async fn read_message_begin(&mut self) -> Result<MessageHeader> {
        self.read_blob().await
    }

    async fn read_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    async fn read_struct<D>(&mut self) -> Result<D>
    where
        D: DeserializeOwned + Send,
    {
        self.read_blob().await
    }
}

/// Factory handing out [`BincodeCodec`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodecFactory;

impl CodecFactory for BincodeCodecFactory {
    type Codec<'a, T>
        = BincodeCodec<'a, T>
    where
        T: Transport + 'a;

    fn codec<'a, T>(&self, transport: &'a mut T) -> Self::Codec<'a, T>
    where
        T: Transport + 'a,
    {
        BincodeCodec::new(transport)
    }
}
