use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of an [`ApplicationException`]
///
/// Encoded on the wire as an `i32`. Codes this side does not know about
/// decode as [`ApplicationExceptionKind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
#[repr(i32)]
pub enum ApplicationExceptionKind {
    #[default]
    Unknown = 0,
    UnknownMethod = 1,
    InvalidMessageType = 2,
    WrongMethodName = 3,
    BadSequenceId = 4,
    MissingResult = 5,
    InternalError = 6,
    ProtocolError = 7,
    InvalidTransform = 8,
    InvalidProtocol = 9,
    UnsupportedClientType = 10,
}

impl From<i32> for ApplicationExceptionKind {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::UnknownMethod,
            2 => Self::InvalidMessageType,
            3 => Self::WrongMethodName,
            4 => Self::BadSequenceId,
            5 => Self::MissingResult,
            6 => Self::InternalError,
            7 => Self::ProtocolError,
            8 => Self::InvalidTransform,
            9 => Self::InvalidProtocol,
            10 => Self::UnsupportedClientType,
            _ => Self::Unknown,
        }
    }
}

impl From<ApplicationExceptionKind> for i32 {
    fn from(kind: ApplicationExceptionKind) -> Self {
        kind as i32
    }
}

impl fmt::Display for ApplicationExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::UnknownMethod => "unknown method",
            Self::InvalidMessageType => "invalid message type",
            Self::WrongMethodName => "wrong method name",
            Self::BadSequenceId => "bad sequence id",
            Self::MissingResult => "missing result",
            Self::InternalError => "internal error",
            Self::ProtocolError => "protocol error",
            Self::InvalidTransform => "invalid transform",
            Self::InvalidProtocol => "invalid protocol",
            Self::UnsupportedClientType => "unsupported client type",
        };
        f.write_str(name)
    }
}

/// Error raised by the remote application, or detected locally while
/// validating a reply
///
/// The same value is written to the wire as a struct payload (message first,
/// kind second) and returned to callers as an error.
#[derive(Error, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ApplicationException {
    #[serde(default)]
    message: String,
    #[serde(default)]
    kind: ApplicationExceptionKind,
}

impl ApplicationException {
    pub fn new(kind: ApplicationExceptionKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn kind(&self) -> ApplicationExceptionKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_survives_the_wire() {
        let sent = ApplicationException::new(ApplicationExceptionKind::InternalError, "boom");

        let bytes = bincode::serialize(&sent).unwrap();
        let received: ApplicationException = bincode::deserialize(&bytes).unwrap();

        assert_eq!(received.kind(), ApplicationExceptionKind::InternalError);
        assert_eq!(received.message(), "boom");
        assert_eq!(received, sent);
    }

    #[test]
    fn unknown_kind_codes_decode_as_unknown() {
        assert_eq!(
            ApplicationExceptionKind::from(42),
            ApplicationExceptionKind::Unknown
        );
        assert_eq!(
            ApplicationExceptionKind::from(10),
            ApplicationExceptionKind::UnsupportedClientType
        );
    }

    #[test]
    fn kind_is_encoded_as_its_code() {
        let bytes = bincode::serialize(&ApplicationExceptionKind::BadSequenceId).unwrap();

        assert_eq!(bytes, 4i32.to_le_bytes());
    }
}
