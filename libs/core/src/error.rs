use std::fmt;

use thiserror::Error;

use crate::exception::{ApplicationException, ApplicationExceptionKind};

/// Stable tag attached to every transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Unknown,
    NotOpen,
    AlreadyOpen,
    TimedOut,
    EndOfFile,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::NotOpen => "not open",
            Self::AlreadyOpen => "already open",
            Self::TimedOut => "timed out",
            Self::EndOfFile => "end of file",
        };
        f.write_str(name)
    }
}

impl From<std::io::ErrorKind> for TransportErrorKind {
    fn from(kind: std::io::ErrorKind) -> Self {
        use std::io::ErrorKind;

        match kind {
            ErrorKind::UnexpectedEof => Self::EndOfFile,
            ErrorKind::TimedOut => Self::TimedOut,
            ErrorKind::NotConnected => Self::NotOpen,
            _ => Self::Unknown,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Transport error ({kind}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error(transparent)]
    Application(#[from] ApplicationException),

    #[error("Codec error: {0}")]
    Codec(String),

    /// The acceptor was interrupted. Not a failure: callers shutting down
    /// should treat it as a clean stop.
    #[error("Server socket interrupted")]
    Interrupted,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Transport {
            kind: err.kind().into(),
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl Error {
    pub fn transport(kind: TransportErrorKind, msg: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: msg.into(),
            source: None,
        }
    }

    pub fn not_open(msg: impl Into<String>) -> Self {
        Self::transport(TransportErrorKind::NotOpen, msg)
    }

    pub fn already_open(msg: impl Into<String>) -> Self {
        Self::transport(TransportErrorKind::AlreadyOpen, msg)
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    pub fn application(kind: ApplicationExceptionKind, msg: impl Into<String>) -> Self {
        Self::Application(ApplicationException::new(kind, msg))
    }

    /// The transport tag, if this is a transport failure
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The exception tag, if this is an application error
    pub fn application_kind(&self) -> Option<ApplicationExceptionKind> {
        match self {
            Self::Application(exception) => Some(exception.kind()),
            _ => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_keep_their_kind_and_source() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof").into();

        assert_eq!(err.transport_kind(), Some(TransportErrorKind::EndOfFile));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_interrupted());
    }

    #[test]
    fn os_failures_are_not_lifecycle_errors() {
        for kind in [
            std::io::ErrorKind::AddrInUse,
            std::io::ErrorKind::AlreadyExists,
            std::io::ErrorKind::WouldBlock,
        ] {
            assert_eq!(TransportErrorKind::from(kind), TransportErrorKind::Unknown);
        }
        assert_eq!(
            TransportErrorKind::from(std::io::ErrorKind::TimedOut),
            TransportErrorKind::TimedOut
        );
    }

    #[test]
    fn interrupted_is_not_a_transport_failure() {
        let err = Error::Interrupted;

        assert!(err.is_interrupted());
        assert_eq!(err.transport_kind(), None);
        assert_eq!(err.application_kind(), None);
    }

    #[test]
    fn application_errors_expose_their_kind() {
        let err = Error::application(ApplicationExceptionKind::BadSequenceId, "ping: out of order");

        assert_eq!(
            err.application_kind(),
            Some(ApplicationExceptionKind::BadSequenceId)
        );
        assert_eq!(err.to_string(), "bad sequence id: ping: out of order");
    }
}
