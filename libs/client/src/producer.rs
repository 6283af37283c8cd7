use std::time::Duration;

use bytes::Bytes;

use wire::{handshake, Frame, FrameConn, ProduceAck, ProducePayload, Role, WireError};

use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub addr: String,
    /// How long to wait for the broker's acknowledgment of one message,
    /// replication included. Keep it above the broker's replication timeout.
    pub ack_timeout: Duration,
    pub max_frame_len: usize,
}

impl ProducerConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ack_timeout: Duration::from_secs(5),
            max_frame_len: wire::DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Publishes messages over one broker connection.
///
/// Once an exchange with the broker fails, a late acknowledgment may still be
/// in flight, so every later [`Producer::push`] fails with
/// [`ClientError::Broken`]. Connect a new producer to continue.
#[derive(Debug)]
pub struct Producer {
    conn: FrameConn,
    config: ProducerConfig,
    handshaken: bool,
    broken: bool,
}

impl Producer {
    pub async fn connect(config: ProducerConfig) -> Result<Self, ClientError> {
        let conn = FrameConn::connect(&config.addr, config.max_frame_len)
            .await
            .map_err(|source| ClientError::Connect {
                addr: config.addr.clone(),
                source,
            })?;
        Ok(Self {
            conn,
            config,
            handshaken: false,
            broken: false,
        })
    }

    /// Publish one message and wait until the broker acknowledges it.
    pub async fn push(&mut self, topic: &str, message: impl Into<Bytes>) -> Result<(), ClientError> {
        if self.broken {
            return Err(ClientError::Broken);
        }

        if !self.handshaken {
            if let Err(e) = handshake::ping(&mut self.conn, Role::Publisher).await {
                self.broken = true;
                return Err(ClientError::Handshake(e));
            }
            self.handshaken = true;
        }

        let payload = ProducePayload {
            topic: topic.to_string(),
            message: message.into(),
        };
        let result = match tokio::time::timeout(self.config.ack_timeout, send(&mut self.conn, &payload)).await {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => Err(ClientError::AckTimeout(self.config.ack_timeout)),
        };

        // An oversized payload is refused before anything is written.
        if let Err(e) = &result {
            if !matches!(e, ClientError::Wire(WireError::FrameTooLarge { .. })) {
                tracing::debug!(error = %e, "producer connection unusable");
                self.broken = true;
            }
        }
        result
    }

    /// Whether an earlier failure left the connection unusable.
    pub fn is_broken(&self) -> bool {
        self.broken
    }
}

async fn send(conn: &mut FrameConn, payload: &ProducePayload) -> Result<(), WireError> {
    conn.write_proto(payload).await?;
    let ack: ProduceAck = conn.read_proto().await?;
    if !ack.ack {
        return Err(WireError::NotAcknowledged(ProduceAck::NAME));
    }
    Ok(())
}
