//! Protocol messages exchanged between clients, brokers and replicas.
//!
//! Every message is a protobuf body carried in one length-prefixed frame.

use bytes::Bytes;

use crate::error::WireError;

/// A protobuf message that travels as a single frame.
pub trait Frame: prost::Message + Default {
    /// Name used in logs and decode errors.
    const NAME: &'static str;
}

/// Role announced by the first frame of every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Role {
    Publisher = 1,
    Consumer = 2,
    /// A primary broker forwarding produced messages to a replica.
    Partition = 3,
}

impl Role {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Publisher => "publisher",
            Role::Consumer => "consumer",
            Role::Partition => "partition",
        }
    }
}

impl TryFrom<i32> for Role {
    type Error = WireError;

    fn try_from(tag: i32) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Role::Publisher),
            2 => Ok(Role::Consumer),
            3 => Ok(Role::Partition),
            other => Err(WireError::UnknownRole(other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Handshake
// ═══════════════════════════════════════════════════════════════

#[derive(Clone, PartialEq, prost::Message)]
pub struct Ping {
    #[prost(int32, tag = "1")]
    pub role: i32,
}

impl Ping {
    pub fn new(role: Role) -> Self {
        Self { role: role.as_i32() }
    }

    pub fn role(&self) -> Result<Role, WireError> {
        Role::try_from(self.role)
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Pong {
    #[prost(bool, tag = "1")]
    pub pong: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Produce
// ═══════════════════════════════════════════════════════════════

#[derive(Clone, PartialEq, prost::Message)]
pub struct ProducePayload {
    #[prost(string, tag = "1")]
    pub topic: String,
    #[prost(bytes = "bytes", tag = "2")]
    pub message: Bytes,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ProduceAck {
    #[prost(bool, tag = "1")]
    pub ack: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Consume
// ═══════════════════════════════════════════════════════════════

#[derive(Clone, PartialEq, prost::Message)]
pub struct Subscribe {
    #[prost(string, tag = "1")]
    pub topic: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ConsumeResponse {
    #[prost(bool, tag = "1")]
    pub is_empty: bool,
    #[prost(bytes = "bytes", tag = "2")]
    pub message: Bytes,
}

impl ConsumeResponse {
    pub fn empty() -> Self {
        Self {
            is_empty: true,
            message: Bytes::new(),
        }
    }

    pub fn with_message(message: Bytes) -> Self {
        Self {
            is_empty: false,
            message,
        }
    }
}

/// Body of the one-byte frame a consumer sends to request the next message.
pub const KEEPALIVE: &[u8] = b"1";

// ═══════════════════════════════════════════════════════════════
//  Replication
// ═══════════════════════════════════════════════════════════════

#[derive(Clone, PartialEq, prost::Message)]
pub struct Forward {
    #[prost(string, tag = "1")]
    pub topic: String,
    #[prost(bytes = "bytes", tag = "2")]
    pub message: Bytes,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ForwardAck {
    #[prost(bool, tag = "1")]
    pub ack: bool,
}

macro_rules! frame_names {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(impl Frame for $ty {
            const NAME: &'static str = $name;
        })*
    };
}

frame_names! {
    Ping => "ping",
    Pong => "pong",
    ProducePayload => "produce payload",
    ProduceAck => "produce ack",
    Subscribe => "subscribe",
    ConsumeResponse => "consume response",
    Forward => "forward",
    ForwardAck => "forward ack",
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn role_tags() {
        assert_eq!(Role::try_from(1).unwrap(), Role::Publisher);
        assert_eq!(Role::try_from(2).unwrap(), Role::Consumer);
        assert_eq!(Role::try_from(3).unwrap(), Role::Partition);
        assert!(matches!(Role::try_from(0), Err(WireError::UnknownRole(0))));
        assert!(matches!(Role::try_from(4), Err(WireError::UnknownRole(4))));
    }

    #[test]
    fn ping_with_unknown_role_decodes_but_fails_role_check() {
        let bytes = Ping { role: 42 }.encode_to_vec();
        let ping = Ping::decode(bytes.as_slice()).unwrap();
        assert!(matches!(ping.role(), Err(WireError::UnknownRole(42))));
    }

    #[test]
    fn empty_response_carries_flag_only() {
        let response = ConsumeResponse::empty();
        assert!(response.is_empty);
        assert!(response.message.is_empty());

        let decoded = ConsumeResponse::decode(response.encode_to_vec().as_slice()).unwrap();
        assert!(decoded.is_empty);
    }
}
