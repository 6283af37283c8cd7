use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;

use wire::{Forward, FrameConn, ProduceAck, ProducePayload, Role};

use crate::error::HandlerError;
use crate::handler::{report_exit, BrokerContext};

/// Producer role: store every payload, replicate it, then acknowledge.
pub(crate) async fn run(
    mut conn: FrameConn,
    peer: SocketAddr,
    ctx: BrokerContext,
    token: CancellationToken,
) {
    loop {
        if token.is_cancelled() {
            tracing::info!(%peer, "producer loop cancelled");
            break;
        }
        if let Err(e) = produce_one(&mut conn, &ctx, &token).await {
            report_exit(Role::Publisher, peer, &e);
            break;
        }
    }
}

async fn produce_one(
    conn: &mut FrameConn,
    ctx: &BrokerContext,
    token: &CancellationToken,
) -> Result<(), HandlerError> {
    let payload: ProducePayload = conn.read_proto().await?;
    let offset = ctx.store.write(&payload.topic, payload.message.clone())?;

    // No ack unless every reachable replica took the message.
    if let Some(replication) = &ctx.replication {
        let forward = Forward {
            topic: payload.topic.clone(),
            message: payload.message.clone(),
        };
        replication.ask_by_peers(token, forward).await?;
    }

    conn.write_proto(&ProduceAck { ack: true }).await?;
    tracing::debug!(
        topic = %payload.topic,
        offset,
        bytes = payload.message.len(),
        "message stored and acknowledged"
    );
    Ok(())
}
