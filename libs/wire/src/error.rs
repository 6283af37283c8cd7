use std::io;

/// Errors produced while exchanging frames with a remote side.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The remote side closed the stream before a frame arrived.
    #[error("connection closed by peer")]
    Closed,

    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("decode {message}: {source}")]
    Decode {
        message: &'static str,
        source: prost::DecodeError,
    },

    #[error("frame of {len} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge { len: usize, limit: usize },

    #[error("unknown role tag {0}")]
    UnknownRole(i32),

    /// A positive acknowledgment (`Pong`, `ProduceAck`, `ForwardAck`) came back negative.
    #[error("{0} not acknowledged")]
    NotAcknowledged(&'static str),
}

impl WireError {
    /// True when the error means the remote side went away: end of stream,
    /// broken pipe or reset. Such errors end a connection quietly.
    pub fn is_disconnect(&self) -> bool {
        match self {
            WireError::Closed => true,
            WireError::Io(e) => is_disconnect_kind(e.kind()),
            _ => false,
        }
    }
}

fn is_disconnect_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}
