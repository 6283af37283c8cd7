use std::time::Duration;

use wire::WireError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connect {addr}: {source}")]
    Connect { addr: String, source: WireError },

    #[error("handshake: {0}")]
    Handshake(WireError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("no acknowledgment within {0:?}")]
    AckTimeout(Duration),

    /// An earlier failure left the connection in an unknown state.
    #[error("connection unusable after an earlier failure")]
    Broken,
}
