use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use topic_engine::TopicStore;

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::handler::{handle_connection, BrokerContext};
use crate::replication::ReplicationController;

/// Bound listening socket plus the broker-wide singletons: the topic store
/// and, when replicas are configured, the replication controller.
#[derive(Debug)]
pub struct Listener {
    listener: TcpListener,
    ctx: BrokerContext,
}

impl Listener {
    pub async fn bind(config: &BrokerConfig) -> Result<Self, BrokerError> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen)
            .await
            .map_err(|source| BrokerError::Bind {
                addr: config.listen.clone(),
                source,
            })?;

        let replication = if config.replicas.is_empty() {
            None
        } else {
            let controller = ReplicationController::from_config(config).await?;
            tracing::info!(
                replicas = ?config.replicas,
                timeout = ?controller.timeout(),
                "replication enabled"
            );
            Some(Arc::new(controller))
        };

        Ok(Self {
            listener,
            ctx: BrokerContext {
                store: Arc::new(TopicStore::new()),
                replication,
                replica_store_writes: config.replica_store_writes,
                max_frame_len: config.max_frame_bytes,
            },
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn store(&self) -> Arc<TopicStore> {
        self.ctx.store.clone()
    }

    pub fn replication(&self) -> Option<Arc<ReplicationController>> {
        self.ctx.replication.clone()
    }

    /// Accept connections until `token` is cancelled, one handler task each.
    pub async fn run(self, token: CancellationToken) {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(%addr, "broker listening");
        }

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!(%peer, error = %e, "set_nodelay failed");
                        }
                        tracing::info!(%peer, "connection accepted");
                        tokio::spawn(handle_connection(stream, peer, self.ctx.clone(), token.clone()));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept error");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }

        tracing::info!("listener stopped");
    }
}
