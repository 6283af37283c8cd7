//! Client libraries for the broker: a [`Producer`] that publishes and waits
//! for acknowledgment, and a [`Consumer`] that polls one topic.

pub mod consumer;
pub mod error;
pub mod producer;

pub use consumer::{Consumer, ConsumerConfig};
pub use error::ClientError;
pub use producer::{Producer, ProducerConfig};
