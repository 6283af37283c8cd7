//! Per-connection dispatcher: handshake, then hand the connection to its role loop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use topic_engine::TopicStore;
use wire::{handshake, FrameConn, Role};

use crate::error::HandlerError;
use crate::replication::ReplicationController;
use crate::{consumer, partition, producer};

/// Long-lived state shared by every connection.
#[derive(Debug, Clone)]
pub struct BrokerContext {
    pub store: Arc<TopicStore>,
    pub replication: Option<Arc<ReplicationController>>,
    pub replica_store_writes: bool,
    pub max_frame_len: usize,
}

/// Handshake one accepted connection and launch its role loop as a separate task.
///
/// Returns as soon as the loop is spawned. A failed handshake closes the
/// connection.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: BrokerContext,
    token: CancellationToken,
) {
    if token.is_cancelled() {
        return;
    }

    let mut conn = FrameConn::new(stream, ctx.max_frame_len);
    let role = match handshake::accept(&mut conn).await {
        Ok(role) => role,
        Err(e) => {
            let e = HandlerError::from(e);
            if e.is_disconnect() {
                tracing::info!(%peer, "connection closed before handshake");
            } else {
                tracing::error!(%peer, error = %e, "handshake failed");
            }
            return;
        }
    };

    tracing::info!(%peer, %role, "handshake complete, starting role loop");
    match role {
        Role::Publisher => {
            tokio::spawn(producer::run(conn, peer, ctx, token));
        }
        Role::Consumer => {
            tokio::spawn(consumer::run(conn, peer, ctx, token));
        }
        Role::Partition => {
            tokio::spawn(partition::run(conn, peer, ctx, token));
        }
    }
}

/// Log why a role loop ended. Disconnects are routine.
pub(crate) fn report_exit(role: Role, peer: SocketAddr, error: &HandlerError) {
    if error.is_disconnect() {
        tracing::info!(%peer, %role, "connection closed by peer");
    } else {
        tracing::error!(%peer, %role, error = %error, "closing connection");
    }
}
