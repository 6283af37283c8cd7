use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;

use topic_engine::TopicName;
use wire::{decode_frame, ConsumeResponse, FrameConn, Role, Subscribe};

use crate::error::HandlerError;
use crate::handler::{report_exit, BrokerContext};

/// Consumer role: one subscribe, then one response per keepalive frame.
///
/// The loop never waits for new data: an exhausted topic is answered with an
/// empty response right away and the client polls again.
pub(crate) async fn run(
    mut conn: FrameConn,
    peer: SocketAddr,
    ctx: BrokerContext,
    token: CancellationToken,
) {
    let topic = match subscribe(&mut conn).await {
        Ok(topic) => topic,
        Err(e) => {
            report_exit(Role::Consumer, peer, &e);
            return;
        }
    };
    tracing::info!(%peer, %topic, "consumer subscribed");

    loop {
        if token.is_cancelled() {
            tracing::info!(%peer, "consumer loop cancelled");
            break;
        }
        if let Err(e) = pull_one(&mut conn, &ctx, &topic).await {
            report_exit(Role::Consumer, peer, &e);
            break;
        }
    }
}

/// Read the subscribe frame and echo its bytes back as acknowledgment.
async fn subscribe(conn: &mut FrameConn) -> Result<TopicName, HandlerError> {
    let frame = conn.read_raw().await?;
    let request: Subscribe = decode_frame(&frame)?;
    let topic = TopicName::new(request.topic)?;
    conn.write_raw(frame.freeze()).await?;
    Ok(topic)
}

async fn pull_one(
    conn: &mut FrameConn,
    ctx: &BrokerContext,
    topic: &TopicName,
) -> Result<(), HandlerError> {
    // Body of the keepalive frame is irrelevant.
    conn.read_raw().await?;

    let response = match ctx.store.read(topic.as_str())? {
        Some(message) => {
            tracing::debug!(%topic, bytes = message.len(), "message pulled");
            ConsumeResponse::with_message(message)
        }
        None => ConsumeResponse::empty(),
    };
    conn.write_proto(&response).await?;
    Ok(())
}
