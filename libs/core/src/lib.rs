//! Courier Core - protocol types shared by clients and servers
//!
//! Defines the message envelope, the application exception that doubles as a
//! wire struct and an error value, and the error taxonomy used across the
//! fabric layer.

pub mod error;
pub mod exception;
pub mod message;

pub use error::{Error, Result, TransportErrorKind};
pub use exception::{ApplicationException, ApplicationExceptionKind};
pub use message::{MessageHeader, MessageKind};
