//! ChatServer event loop
//!
//! One task owns the listener and the readiness set, and blocks until either
//! a new connection can be accepted or a registered connection is readable.
//! All dispatch runs sequentially on that task; the only state it shares is
//! the [`Registry`], which the operator console also reads.
//!
//! After every accept or read the loop collects connections the registry
//! evicted for overflowing their outbound queue, and closes them.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::broadcast::broadcast_except;
use crate::config::{ServerConfig, OUTBOUND_QUEUE_CAPACITY};
use crate::connection::ClientConnection;
use crate::error::AppError;
use crate::handler::spawn_writer;
use crate::message::{FrameBuffer, Message, MessageKind};
use crate::poller::{Readable, ReadinessSet};
use crate::registry::Registry;
use crate::types::ConnectionId;

/// Outbound side of one live connection
struct Outbound {
    sender: mpsc::Sender<Message>,
    writer: JoinHandle<()>,
}

/// The chat server event loop
///
/// Every accepted connection has an outbound queue here from the moment it
/// is accepted; it joins the [`Registry`] only once it sends Register.
pub struct ChatServer {
    listener: TcpListener,
    registry: Arc<Registry>,
    /// Every live connection, registered or not
    outbound: HashMap<ConnectionId, Outbound>,
    readiness: ReadinessSet,
    outbound_capacity: usize,
}

impl ChatServer {
    /// Bind the listening socket
    pub async fn bind(config: &ServerConfig) -> Result<Self, AppError> {
        let listener = TcpListener::bind(config.bind_addr.as_str()).await?;
        let mut server = Self::from_listener(listener);
        server.outbound_capacity = config.outbound_capacity;
        Ok(server)
    }

    /// Serve on an already bound listener
    pub fn from_listener(listener: TcpListener) -> Self {
        Self {
            listener,
            registry: Arc::new(Registry::new()),
            outbound: HashMap::new(),
            readiness: ReadinessSet::new(),
            outbound_capacity: OUTBOUND_QUEUE_CAPACITY,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared handle to the client registry
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Run the event loop
    ///
    /// Only returns on a fatal accept error.
    pub async fn run(mut self) -> Result<(), AppError> {
        info!("ChatServer listening on {}", self.local_addr()?);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    self.accept(stream, peer);
                }
                Some(ready) = self.readiness.next_ready() => {
                    self.service(ready);
                }
            }
            self.close_evicted();
        }
    }

    /// Set up a new connection and wait for it to become readable
    fn accept(&mut self, stream: TcpStream, peer: SocketAddr) {
        let id = ConnectionId::new();
        debug!("Connection accepted from {} as {}", peer, id);

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY on {}: {}", id, e);
        }

        let (reader, writer) = stream.into_split();
        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        let writer = spawn_writer(id, writer, rx);

        self.outbound.insert(id, Outbound { sender: tx, writer });
        self.readiness.register(id, reader, FrameBuffer::new());
    }

    /// Attempt one read on a readable connection
    fn service(&mut self, ready: Readable) {
        let Readable {
            id,
            reader,
            mut frame,
            result,
        } = ready;

        if let Err(e) = result {
            debug!("Readiness error on {}: {}", id, e);
            self.disconnect(id);
            return;
        }

        match reader.try_read(frame.unfilled_mut()) {
            Ok(0) => {
                debug!("Connection {} closed by peer", id);
                self.disconnect(id);
                return;
            }
            Ok(n) => {
                if let Some(bytes) = frame.advance(n) {
                    self.dispatch(id, &bytes);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                debug!("Read error on {}: {}", id, e);
                self.disconnect(id);
                return;
            }
        }

        self.readiness.register(id, reader, frame);
    }

    /// Act on one complete frame from `id`
    fn dispatch(&mut self, id: ConnectionId, bytes: &[u8]) {
        let msg = match Message::decode(bytes) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Discarding frame from {}: {}", id, e);
                return;
            }
        };

        match msg.kind {
            MessageKind::Register => {
                let Some(outbound) = self.outbound.get(&id) else {
                    return;
                };
                let sender = outbound.sender.clone();
                self.registry
                    .add(ClientConnection::new(id, msg.nickname, sender));
            }
            MessageKind::Chat => {
                debug!("Received msg from '{}' on {}: {}", msg.nickname, id, msg.text);
                let line = format!("[{}]: {}", msg.nickname, msg.text);
                broadcast_except(&self.registry, id, &line);
            }
            MessageKind::Broadcast => {
                debug!("Ignoring broadcast-kind frame from {}", id);
            }
        }
    }

    /// Forget a connection; its socket closes once both halves are dropped
    fn disconnect(&mut self, id: ConnectionId) {
        self.registry.remove(id);
        self.outbound.remove(&id);
        debug!(
            "Connection {} released, {} connections remain",
            id,
            self.outbound.len()
        );
    }

    /// Close every connection the registry evicted
    ///
    /// The writer may be stuck on a peer that stopped reading, so it is
    /// aborted rather than left to drain.
    fn close_evicted(&mut self) {
        for id in self.registry.take_evicted() {
            self.readiness.deregister(id);
            if let Some(outbound) = self.outbound.remove(&id) {
                outbound.writer.abort();
            }
            info!("Connection {} evicted for falling behind", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::message::FRAME_LEN;

    async fn start() -> (SocketAddr, Arc<Registry>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = ChatServer::from_listener(listener);
        let addr = server.local_addr().unwrap();
        let registry = server.registry();
        tokio::spawn(server.run());
        (addr, registry)
    }

    async fn wait_for_users(registry: &Registry, count: usize) {
        for _ in 0..200 {
            if registry.len() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} users, have {:?}", count, registry.list());
    }

    async fn read_frame(stream: &mut TcpStream) -> Message {
        let mut frame = [0u8; FRAME_LEN];
        tokio::time::timeout(Duration::from_secs(2), stream.read_exact(&mut frame))
            .await
            .expect("timed out waiting for a frame")
            .unwrap();
        Message::decode(&frame).unwrap()
    }

    #[tokio::test]
    async fn test_register_adds_to_registry() {
        let (addr, registry) = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(&Message::register("alice").encode()).await.unwrap();

        wait_for_users(&registry, 1).await;
        assert_eq!(registry.list(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_frame_split_across_writes() {
        let (addr, registry) = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let frame = Message::register("slow").encode();

        stream.write_all(&frame[..7]).await.unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(registry.is_empty());

        stream.write_all(&frame[7..]).await.unwrap();
        wait_for_users(&registry, 1).await;
        assert_eq!(registry.list(), vec!["slow"]);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_discarded() {
        let (addr, registry) = start().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let mut bogus = Message::register("ghost").encode();
        bogus[..4].copy_from_slice(&9u32.to_be_bytes());
        stream.write_all(&bogus).await.unwrap();
        stream.write_all(&Message::register("real").encode()).await.unwrap();

        wait_for_users(&registry, 1).await;
        assert_eq!(registry.list(), vec!["real"]);
    }

    #[tokio::test]
    async fn test_disconnect_closes_socket_and_removes() {
        let (addr, registry) = start().await;
        let mut alice = TcpStream::connect(addr).await.unwrap();
        alice.write_all(&Message::register("alice").encode()).await.unwrap();
        wait_for_users(&registry, 1).await;

        alice.shutdown().await.unwrap();
        wait_for_users(&registry, 0).await;

        // server side released its half too
        let mut buf = [0u8; FRAME_LEN];
        let n = tokio::time::timeout(Duration::from_secs(2), alice.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn test_reset_peer_is_removed_and_announced() {
        let (addr, registry) = start().await;
        let mut alice = TcpStream::connect(addr).await.unwrap();
        alice.write_all(&Message::register("alice").encode()).await.unwrap();
        wait_for_users(&registry, 1).await;
        let mut bob = TcpStream::connect(addr).await.unwrap();
        bob.write_all(&Message::register("bob").encode()).await.unwrap();
        wait_for_users(&registry, 2).await;
        assert_eq!(read_frame(&mut alice).await.text, "User bob entered the room");

        // zero linger turns the close into a reset
        bob.set_linger(Some(Duration::ZERO)).unwrap();
        drop(bob);

        wait_for_users(&registry, 1).await;
        assert_eq!(registry.list(), vec!["alice"]);
        let left = read_frame(&mut alice).await;
        assert_eq!(left.kind, MessageKind::Broadcast);
        assert_eq!(left.text, "User bob was disconnected from the room");
    }

    #[tokio::test]
    async fn test_overflowing_connection_is_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut server = ChatServer::from_listener(listener);
        let addr = server.local_addr().unwrap();

        let mut slow = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = server.listener.accept().await.unwrap();
        server.accept(stream, peer);
        let id = *server.outbound.keys().next().unwrap();

        // an already full queue stands in for a peer that stopped reading
        let (full_tx, _full_rx) = mpsc::channel(1);
        full_tx.try_send(Message::broadcast("backlog")).unwrap();
        server
            .registry
            .add(ClientConnection::new(id, "slow", full_tx));

        broadcast_except(&server.registry, ConnectionId::new(), "one too many");
        assert!(server.registry.is_empty());

        server.close_evicted();
        assert!(server.outbound.is_empty());
        assert!(server.readiness.is_empty());
        assert!(server.readiness.next_ready().await.is_none());

        let mut buf = [0u8; FRAME_LEN];
        let read = tokio::time::timeout(Duration::from_secs(2), slow.read(&mut buf))
            .await
            .unwrap();
        assert!(matches!(read, Ok(0) | Err(_)));
    }
}
