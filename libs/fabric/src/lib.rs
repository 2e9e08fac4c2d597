//! Courier Fabric - call correlation and connection acceptance
//!
//! Provides the client that stamps, sends, and validates RPC exchanges, the
//! server socket that accepts connections with cooperative shutdown, and the
//! transports (TCP, Unix sockets, framing, in-memory) and codecs beneath them.
//!
//! # Example
//!
//! ```no_run
//! use courier_fabric::{codec::BincodeCodecFactory, Client, ServerSocket};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let socket = ServerSocket::bind("127.0.0.1:9090").await?;
//! let addr = socket.addr()?;
//!
//! let mut client = Client::tcp(addr, BincodeCodecFactory).await?;
//! let sum: i64 = client.call("add", &(1i64, 2i64)).await?;
//! client.call_oneway("log", "added").await?;
//!
//! socket.interrupt()?;
//! socket.close()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod server;
pub mod transport;

pub use courier_core::{error, exception, message};

// Re-exports for convenience
pub use client::Client;
pub use courier_core::{
    ApplicationException, ApplicationExceptionKind, Error, MessageHeader, MessageKind, Result,
};
pub use server::{Listener, ServerSocket};
