//! Topic broker core: store access, per-connection protocol loops and
//! replication to follower brokers.

pub mod config;
pub mod error;
pub mod handler;
pub mod listener;
pub mod replication;
pub mod timeout_group;

mod consumer;
mod partition;
mod producer;

pub use config::{BrokerConfig, ConfigError};
pub use error::{BrokerError, HandlerError};
pub use handler::{handle_connection, BrokerContext};
pub use listener::Listener;
pub use replication::{PeerHealth, ReplicationController, ReplicationError};
pub use timeout_group::{GroupError, TimeoutGroup};
