use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use wire::{handshake, ConsumeResponse, FrameConn, Role, Subscribe, KEEPALIVE};

use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub addr: String,
    /// Pause after an empty poll before asking again.
    pub poll_interval: Duration,
    /// Capacity of the result channel returned by [`Consumer::consume`].
    pub buffer: usize,
    pub max_frame_len: usize,
}

impl ConsumerConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            poll_interval: Duration::from_millis(20),
            buffer: 64,
            max_frame_len: wire::DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Pulls messages of one topic over one broker connection.
#[derive(Debug)]
pub struct Consumer {
    conn: FrameConn,
    config: ConsumerConfig,
}

impl Consumer {
    pub async fn connect(config: ConsumerConfig) -> Result<Self, ClientError> {
        let conn = FrameConn::connect(&config.addr, config.max_frame_len)
            .await
            .map_err(|source| ClientError::Connect {
                addr: config.addr.clone(),
                source,
            })?;
        Ok(Self { conn, config })
    }

    /// Subscribe to `topic` and stream its messages.
    ///
    /// The channel yields messages in log order. The first error is sent as
    /// the last item and the channel closes; cancelling `token` closes it
    /// without an error. Dropping the receiver stops polling, so no further
    /// messages are taken off the topic.
    pub fn consume(
        self,
        topic: impl Into<String>,
        token: CancellationToken,
    ) -> mpsc::Receiver<Result<Bytes, ClientError>> {
        let (tx, rx) = mpsc::channel(self.config.buffer);
        let topic = topic.into();
        tokio::spawn(async move {
            if let Err(e) = self.pull_loop(topic, &tx, &token).await {
                tracing::debug!(error = %e, "consumer stopped");
                let _ = tx.send(Err(e)).await;
            }
        });
        rx
    }

    async fn pull_loop(
        mut self,
        topic: String,
        tx: &mpsc::Sender<Result<Bytes, ClientError>>,
        token: &CancellationToken,
    ) -> Result<(), ClientError> {
        handshake::ping(&mut self.conn, Role::Consumer)
            .await
            .map_err(ClientError::Handshake)?;

        self.conn.write_proto(&Subscribe { topic }).await?;
        // The broker echoes the subscribe frame.
        self.conn.read_raw().await?;

        loop {
            // A pull advances the topic's shared cursor, so never pull for a
            // receiver that is gone.
            if token.is_cancelled() || tx.is_closed() {
                return Ok(());
            }

            self.conn.write_raw(Bytes::from_static(KEEPALIVE)).await?;
            let response: ConsumeResponse = self.conn.read_proto().await?;
            if response.is_empty {
                tokio::select! {
                    _ = token.cancelled() => return Ok(()),
                    _ = tx.closed() => return Ok(()),
                    _ = tokio::time::sleep(self.config.poll_interval) => continue,
                }
            }

            if tx.send(Ok(response.message)).await.is_err() {
                tracing::warn!("receiver dropped with a pulled message in hand");
                return Ok(());
            }
        }
    }
}
