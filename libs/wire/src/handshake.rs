//! Role handshake: the first frame exchange on every connection.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::conn::FrameConn;
use crate::error::WireError;
use crate::messages::{Frame, Ping, Pong, Role};

/// Client side: announce `role` and wait for a positive `Pong`.
pub async fn ping<S>(conn: &mut FrameConn<S>, role: Role) -> Result<(), WireError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn.write_proto(&Ping::new(role)).await?;
    let pong: Pong = conn.read_proto().await?;
    if !pong.pong {
        return Err(WireError::NotAcknowledged(Pong::NAME));
    }
    tracing::trace!(%role, "pong received");
    Ok(())
}

/// Server side: read the `Ping`, validate its role tag and reply with `Pong`.
///
/// An unknown role is returned as an error before anything is written back.
pub async fn accept<S>(conn: &mut FrameConn<S>) -> Result<Role, WireError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let ping: Ping = conn.read_proto().await?;
    let role = ping.role()?;
    conn.write_proto(&Pong { pong: true }).await?;
    tracing::trace!(%role, "pong sent");
    Ok(role)
}
