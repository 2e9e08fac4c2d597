use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Envelope tag telling the receiver how to treat a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
#[repr(i8)]
pub enum MessageKind {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl TryFrom<i8> for MessageKind {
    type Error = Error;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Call),
            2 => Ok(Self::Reply),
            3 => Ok(Self::Exception),
            4 => Ok(Self::Oneway),
            other => Err(Error::codec(format!("Invalid message kind: {}", other))),
        }
    }
}

impl From<MessageKind> for i8 {
    fn from(kind: MessageKind) -> Self {
        kind as i8
    }
}

/// Message envelope preceding every request and reply payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub kind: MessageKind,
    pub seq_id: i32,
}

impl MessageHeader {
    pub fn new(name: impl Into<String>, kind: MessageKind, seq_id: i32) -> Self {
        Self {
            name: name.into(),
            kind,
            seq_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_kind_is_rejected() {
        assert!(MessageKind::try_from(0i8).is_err());
        assert!(MessageKind::try_from(5i8).is_err());
        assert_eq!(MessageKind::try_from(3i8).unwrap(), MessageKind::Exception);
    }

    #[test]
    fn header_rejects_unknown_kind_when_decoding() {
        let header = MessageHeader::new("ping", MessageKind::Call, 7);
        let mut bytes = bincode::serialize(&header).unwrap();

        // name is a u64 length followed by 4 bytes, then the kind byte
        bytes[8 + 4] = 9;

        let decoded: Result<MessageHeader, _> = bincode::deserialize(&bytes);
        assert!(decoded.is_err());
    }
}
