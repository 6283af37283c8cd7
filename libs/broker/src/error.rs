use std::io;

use topic_engine::TopicError;
use wire::WireError;

use crate::config::ConfigError;
use crate::replication::ReplicationError;

/// Startup failures. Any of these stops the broker before it accepts a connection.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("dial replica [{index}] {addr}: {source}")]
    Dial {
        index: usize,
        addr: String,
        source: WireError,
    },
}

/// Failure inside a per-connection protocol loop. Ends that connection only.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("store: {0}")]
    Store(#[from] TopicError),

    #[error("replication: {0}")]
    Replication(#[from] ReplicationError),
}

impl HandlerError {
    /// The remote side went away. Loops exit quietly on these.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, HandlerError::Wire(e) if e.is_disconnect())
    }
}
