//! Wire protocol shared by the broker, its replicas and the client libraries.
//!
//! Frames are length-prefixed protobuf messages; see [`FrameConn`].

pub mod conn;
pub mod error;
pub mod handshake;
pub mod messages;

pub use conn::{decode_frame, FrameConn, DEFAULT_MAX_FRAME_LEN};
pub use error::WireError;
pub use messages::{
    ConsumeResponse, Forward, ForwardAck, Frame, Ping, Pong, ProduceAck, ProducePayload, Role,
    Subscribe, KEEPALIVE,
};
