//! Synchronous best-effort replication to a fixed set of replica brokers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use wire::{handshake, Forward, ForwardAck, Frame, FrameConn, Role, WireError};

use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::timeout_group::{GroupError, TimeoutGroup};

#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    /// A peer that had passed its handshake failed to take a message.
    #[error("replica {addr}: {source}")]
    Peer { addr: String, source: WireError },

    /// A handshaken peer took longer than the fan-out timeout to acknowledge.
    #[error("replica {addr}: no acknowledgment within {after:?}")]
    PeerTimeout { addr: String, after: Duration },

    #[error("replication round failed: {0}")]
    Round(String),

    #[error("fan-out deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("fan-out cancelled")]
    Cancelled,
}

/// Observable health of one replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerHealth {
    /// No handshake yet.
    Unverified,
    /// The last operation succeeded.
    Healthy,
    /// Skipped for the rest of the process lifetime.
    Failed,
}

impl std::fmt::Display for PeerHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerHealth::Unverified => f.write_str("unverified"),
            PeerHealth::Healthy => f.write_str("healthy"),
            PeerHealth::Failed => f.write_str("failed"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Peer
// ═══════════════════════════════════════════════════════════════

/// Connection ownership follows health: a failed peer holds no connection.
#[derive(Debug)]
enum PeerState {
    /// `None` until the connection is dialed as part of the handshake.
    Unverified(Option<FrameConn>),
    Healthy(FrameConn),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Sent,
    Skipped,
}

#[derive(Debug)]
struct Peer {
    addr: String,
    state: PeerState,
    max_frame_len: usize,
}

impl Peer {
    fn health(&self) -> PeerHealth {
        match self.state {
            PeerState::Unverified(_) => PeerHealth::Unverified,
            PeerState::Healthy(_) => PeerHealth::Healthy,
            PeerState::Failed => PeerHealth::Failed,
        }
    }

    /// Forward one message, bounding each exchange with the peer by `io_timeout`.
    ///
    /// A failed or timed-out handshake marks the peer failed and skips it. A
    /// failed or timed-out send on a handshaken peer marks it failed and is
    /// returned as an error.
    async fn deliver(
        &mut self,
        forward: &Forward,
        io_timeout: Duration,
    ) -> Result<Delivery, ReplicationError> {
        // The connection is moved out while in use and only put back on success.
        let mut conn = match std::mem::replace(&mut self.state, PeerState::Failed) {
            PeerState::Failed => return Ok(Delivery::Skipped),
            PeerState::Healthy(conn) => conn,
            PeerState::Unverified(conn) => {
                match tokio::time::timeout(io_timeout, self.handshake(conn)).await {
                    Ok(Ok(conn)) => conn,
                    Ok(Err(e)) => {
                        tracing::warn!(replica = %self.addr, error = %e, "replica handshake failed, skipping");
                        return Ok(Delivery::Skipped);
                    }
                    Err(_) => {
                        tracing::warn!(replica = %self.addr, timeout = ?io_timeout, "replica handshake timed out, skipping");
                        return Ok(Delivery::Skipped);
                    }
                }
            }
        };

        match tokio::time::timeout(io_timeout, send_forward(&mut conn, forward)).await {
            Ok(Ok(())) => {
                self.state = PeerState::Healthy(conn);
                Ok(Delivery::Sent)
            }
            Ok(Err(source)) => {
                tracing::error!(replica = %self.addr, error = %source, "replica write failed");
                Err(ReplicationError::Peer {
                    addr: self.addr.clone(),
                    source,
                })
            }
            Err(_) => {
                tracing::error!(replica = %self.addr, timeout = ?io_timeout, "replica did not acknowledge in time");
                Err(ReplicationError::PeerTimeout {
                    addr: self.addr.clone(),
                    after: io_timeout,
                })
            }
        }
    }

    async fn handshake(&self, conn: Option<FrameConn>) -> Result<FrameConn, WireError> {
        let mut conn = match conn {
            Some(conn) => conn,
            None => FrameConn::connect(&self.addr, self.max_frame_len).await?,
        };
        handshake::ping(&mut conn, Role::Partition).await?;
        tracing::info!(replica = %self.addr, "replica handshake complete");
        Ok(conn)
    }
}

async fn send_forward(conn: &mut FrameConn, forward: &Forward) -> Result<(), WireError> {
    conn.write_proto(forward).await?;
    let ack: ForwardAck = conn.read_proto().await?;
    if !ack.ack {
        return Err(WireError::NotAcknowledged(ForwardAck::NAME));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
//  ReplicationController
// ═══════════════════════════════════════════════════════════════

/// Fixed, ordered list of replicas plus the deadline applied to every fan-out.
///
/// Fan-outs are serialized: one round holds the peer list until it finishes
/// or is cut off.
#[derive(Debug)]
pub struct ReplicationController {
    peers: Arc<Mutex<Vec<Peer>>>,
    timeout: Duration,
}

impl ReplicationController {
    /// Controller whose replicas are dialed on their first handshake.
    pub fn new<I, A>(replicas: I, timeout: Duration, max_frame_len: usize) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let peers = replicas
            .into_iter()
            .map(|addr| Peer {
                addr: addr.into(),
                state: PeerState::Unverified(None),
                max_frame_len,
            })
            .collect();
        Self::with_peers(peers, timeout)
    }

    /// Controller that dials every replica up front. Any dial failure is returned.
    pub async fn dial<I, A>(
        replicas: I,
        timeout: Duration,
        max_frame_len: usize,
    ) -> Result<Self, BrokerError>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut peers = Vec::new();
        for (index, addr) in replicas.into_iter().enumerate() {
            let addr = addr.into();
            let conn = FrameConn::connect(&addr, max_frame_len)
                .await
                .map_err(|source| BrokerError::Dial {
                    index,
                    addr: addr.clone(),
                    source,
                })?;
            tracing::info!(replica = %addr, "dialed replica");
            peers.push(Peer {
                addr,
                state: PeerState::Unverified(Some(conn)),
                max_frame_len,
            });
        }
        Ok(Self::with_peers(peers, timeout))
    }

    pub async fn from_config(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let replicas = config.replicas.iter().cloned();
        if config.dial_replicas_at_startup {
            Self::dial(replicas, config.replication_timeout(), config.max_frame_bytes).await
        } else {
            Ok(Self::new(replicas, config.replication_timeout(), config.max_frame_bytes))
        }
    }

    fn with_peers(peers: Vec<Peer>, timeout: Duration) -> Self {
        Self {
            peers: Arc::new(Mutex::new(peers)),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Health of every replica, in configuration order.
    pub async fn peer_states(&self) -> Vec<(String, PeerHealth)> {
        self.peers
            .lock()
            .await
            .iter()
            .map(|p| (p.addr.clone(), p.health()))
            .collect()
    }

    /// Forward one message to every replica that is not failed, within the
    /// controller's deadline.
    ///
    /// Replicas are visited in order. One that fails its handshake is skipped
    /// and the round goes on; one that fails after a good handshake aborts the
    /// round, and replicas after it are not tried.
    ///
    /// The deadline bounds how long the caller waits, queueing behind earlier
    /// rounds included. A round cut off by it keeps running in the background
    /// and holds the peer list until its current exchanges finish, so a slow
    /// but live replica stays healthy.
    pub async fn ask_by_peers(
        &self,
        token: &CancellationToken,
        forward: Forward,
    ) -> Result<(), ReplicationError> {
        let round = tokio::spawn(run_round(self.peers.clone(), forward, self.timeout));

        let mut group = TimeoutGroup::new(token, self.timeout);
        // Dropping the handle on deadline detaches the round instead of aborting it.
        group.spawn(async move {
            match round.await {
                Ok(result) => result,
                Err(e) => Err(ReplicationError::Round(e.to_string())),
            }
        });

        match group.wait().await {
            Ok(()) => Ok(()),
            Err(GroupError::Task(e)) => Err(e),
            Err(GroupError::DeadlineExceeded(d)) => Err(ReplicationError::DeadlineExceeded(d)),
            Err(GroupError::Cancelled) => Err(ReplicationError::Cancelled),
        }
    }
}

async fn run_round(
    peers: Arc<Mutex<Vec<Peer>>>,
    forward: Forward,
    io_timeout: Duration,
) -> Result<(), ReplicationError> {
    let mut peers = peers.lock_owned().await;
    let mut sent = 0usize;
    for peer in peers.iter_mut() {
        if peer.deliver(&forward, io_timeout).await? == Delivery::Sent {
            sent += 1;
        }
    }
    tracing::debug!(topic = %forward.topic, replicas = sent, "message replicated");
    Ok(())
}
