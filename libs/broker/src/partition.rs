use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;

use wire::{Forward, ForwardAck, FrameConn, Role};

use crate::error::HandlerError;
use crate::handler::{report_exit, BrokerContext};

/// Replica role: acknowledge messages forwarded by a primary broker.
///
/// With `replica_store_writes` the message is also appended locally first.
pub(crate) async fn run(
    mut conn: FrameConn,
    peer: SocketAddr,
    ctx: BrokerContext,
    token: CancellationToken,
) {
    loop {
        if token.is_cancelled() {
            tracing::info!(%peer, "partition loop cancelled");
            break;
        }
        if let Err(e) = accept_forward(&mut conn, &ctx).await {
            report_exit(Role::Partition, peer, &e);
            break;
        }
    }
}

async fn accept_forward(conn: &mut FrameConn, ctx: &BrokerContext) -> Result<(), HandlerError> {
    let forward: Forward = conn.read_proto().await?;
    if ctx.replica_store_writes {
        ctx.store.write(&forward.topic, forward.message.clone())?;
    }
    conn.write_proto(&ForwardAck { ack: true }).await?;
    tracing::debug!(
        topic = %forward.topic,
        bytes = forward.message.len(),
        stored = ctx.replica_store_writes,
        "forwarded message acknowledged"
    );
    Ok(())
}
