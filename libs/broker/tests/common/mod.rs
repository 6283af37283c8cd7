#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use broker::{BrokerConfig, Listener, ReplicationController};
use topic_engine::TopicStore;
use wire::{handshake, Forward, ForwardAck, FrameConn, Role, DEFAULT_MAX_FRAME_LEN};

/// A broker running on an ephemeral local port.
pub struct TestBroker {
    pub addr: SocketAddr,
    pub store: Arc<TopicStore>,
    pub replication: Option<Arc<ReplicationController>>,
    pub token: CancellationToken,
}

impl TestBroker {
    pub fn addr_string(&self) -> String {
        self.addr.to_string()
    }
}

impl Drop for TestBroker {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub async fn start_broker(configure: impl FnOnce(&mut BrokerConfig)) -> TestBroker {
    let mut config = BrokerConfig::new("127.0.0.1:0");
    configure(&mut config);

    let listener = Listener::bind(&config).await.expect("bind broker");
    let addr = listener.local_addr().expect("local addr");
    let store = listener.store();
    let replication = listener.replication();
    let token = CancellationToken::new();
    tokio::spawn(listener.run(token.clone()));

    TestBroker {
        addr,
        store,
        replication,
        token,
    }
}

/// Address nothing listens on.
pub fn offline_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind scratch port");
    let addr = listener.local_addr().expect("scratch addr");
    drop(listener);
    addr.to_string()
}

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Handshake, then acknowledge every forwarded message.
    Ack,
    /// Handshake, acknowledge `n` messages, then close the connection.
    CloseAfter(usize),
    /// Handshake, then acknowledge every forwarded message after a delay.
    AckAfter(Duration),
    /// Handshake, then read forwarded messages without ever acknowledging.
    NeverAck,
    /// Close every connection as soon as it is accepted.
    CloseOnConnect,
}

/// Stand-in replica that records what a primary forwards to it.
pub struct FakeReplica {
    pub addr: String,
    received: Arc<Mutex<Vec<Forward>>>,
    connections: Arc<AtomicUsize>,
}

impl FakeReplica {
    pub async fn spawn(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake replica");
        let addr = listener.local_addr().expect("fake replica addr").to_string();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let task_received = received.clone();
        let task_connections = connections.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                task_connections.fetch_add(1, Ordering::SeqCst);
                if matches!(behavior, Behavior::CloseOnConnect) {
                    drop(stream);
                    continue;
                }
                tokio::spawn(serve(
                    FrameConn::new(stream, DEFAULT_MAX_FRAME_LEN),
                    behavior,
                    task_received.clone(),
                ));
            }
        });

        Self {
            addr,
            received,
            connections,
        }
    }

    pub fn received(&self) -> Vec<Forward> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

async fn serve(mut conn: FrameConn, behavior: Behavior, received: Arc<Mutex<Vec<Forward>>>) {
    // Eager dials that are dropped before a handshake just hang up.
    let Ok(role) = handshake::accept(&mut conn).await else {
        return;
    };
    assert_eq!(role, Role::Partition);

    let mut acked = 0usize;
    if let Behavior::CloseAfter(0) = behavior {
        return;
    }

    loop {
        let forward: Forward = match conn.read_proto().await {
            Ok(f) => f,
            Err(_) => return,
        };
        received.lock().unwrap().push(forward);

        match behavior {
            Behavior::NeverAck => continue,
            Behavior::AckAfter(delay) => {
                tokio::time::sleep(delay).await;
                if conn.write_proto(&ForwardAck { ack: true }).await.is_err() {
                    return;
                }
            }
            _ => {
                if conn.write_proto(&ForwardAck { ack: true }).await.is_err() {
                    return;
                }
                acked += 1;
            }
        }

        if let Behavior::CloseAfter(n) = behavior {
            if acked >= n {
                return;
            }
        }
    }
}

/// Raw client connection that has completed the handshake for `role`.
pub async fn raw_connect(addr: SocketAddr, role: Role) -> FrameConn {
    let mut conn = FrameConn::connect(&addr.to_string(), DEFAULT_MAX_FRAME_LEN)
        .await
        .expect("connect");
    handshake::ping(&mut conn, role).await.expect("handshake");
    conn
}

pub fn forward(topic: &str, message: &'static str) -> Forward {
    Forward {
        topic: topic.to_string(),
        message: bytes::Bytes::from_static(message.as_bytes()),
    }
}
