//! Client session: connect, register, send, receive, reconnect
//!
//! Two duties run concurrently against one [`ClientSession`]:
//! - the send duty turns input lines into Chat messages,
//! - the receive duty prints broadcasts and reconnects whenever the
//!   connection is lost, retrying forever with a fixed backoff.
//!
//! `connected` is written only by the receive duty (and by the first
//! connect before the duties start). The write half is swapped under the
//! same mutex that guards each send, so a send never hits a half-replaced
//! connection.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::console::{timestamped, Terminal};
use crate::error::AppError;
use crate::message::{Message, MessageKind, FRAME_LEN};

/// Input line that ends the send duty
pub const EXIT_COMMAND: &str = "/exit";

pub const OFFLINE_NOTICE: &str = "Server is offline...";
pub const RECONNECTED_NOTICE: &str = "Reconnected to server";
pub const SEND_FAILED_NOTICE: &str = "Error while sending message to server...";

/// Opens TCP connections to the server
pub trait Connector: Send + Sync {
    fn connect(&self) -> impl Future<Output = io::Result<TcpStream>> + Send;
}

/// Dials a fixed `host:port`
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> impl Future<Output = io::Result<TcpStream>> + Send {
        let addr = self.addr.clone();
        async move { TcpStream::connect(addr).await }
    }
}

/// Client-side connection state
pub struct ClientSession<C = TcpConnector> {
    nickname: String,
    backoff: Duration,
    connector: C,
    connected: AtomicBool,
    writer: Mutex<Option<OwnedWriteHalf>>,
}

impl ClientSession<TcpConnector> {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_connector(config, TcpConnector::new(config.server_addr.clone()))
    }
}

impl<C: Connector> ClientSession<C> {
    /// Session that starts disconnected and dials through `connector`
    pub fn with_connector(config: &ClientConfig, connector: C) -> Self {
        Self {
            nickname: config.nickname.clone(),
            backoff: config.backoff,
            connector,
            connected: AtomicBool::new(false),
            writer: Mutex::new(None),
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Connect and register
    ///
    /// On success the write half is installed, `connected` becomes true and
    /// the read half is returned for the receive duty. Any failure leaves
    /// the session disconnected.
    pub async fn connect(&self) -> Option<OwnedReadHalf> {
        let stream = match self.connector.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                debug!("Connect failed: {}", e);
                return None;
            }
        };

        let (reader, mut writer) = stream.into_split();
        if let Err(e) = writer.write_all(&Message::register(&self.nickname).encode()).await {
            debug!("Register failed: {}", e);
            return None;
        }

        let mut slot = self.writer.lock().await;
        *slot = Some(writer);
        self.connected.store(true, Ordering::Release);
        Some(reader)
    }

    /// Write one message to the server
    pub async fn send(&self, msg: &Message) -> Result<(), AppError> {
        if !self.is_connected() {
            return Err(AppError::Offline);
        }
        let mut slot = self.writer.lock().await;
        let writer = slot.as_mut().ok_or(AppError::Offline)?;
        writer.write_all(&msg.encode()).await?;
        Ok(())
    }

    async fn mark_disconnected(&self) {
        let mut slot = self.writer.lock().await;
        self.connected.store(false, Ordering::Release);
        *slot = None;
    }
}

/// Send duty: one Chat message per non-empty input line until `/exit`
///
/// Lines typed while offline are discarded, not queued.
pub async fn run_send_duty<C, T>(
    session: &ClientSession<C>,
    terminal: &T,
    mut lines: mpsc::UnboundedReceiver<String>,
) where
    C: Connector,
    T: Terminal + ?Sized,
{
    while let Some(line) = lines.recv().await {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.is_empty() {
            continue;
        }
        if line == EXIT_COMMAND {
            break;
        }
        if !session.is_connected() {
            terminal.render_line(OFFLINE_NOTICE);
            continue;
        }

        let msg = Message::chat(line, session.nickname());
        terminal.render_line(&timestamped(&format!("[{}]: {}", session.nickname(), msg.text)));

        match session.send(&msg).await {
            Ok(()) => {}
            Err(AppError::Offline) => terminal.render_line(OFFLINE_NOTICE),
            Err(e) => {
                warn!("Failed to send message: {}", e);
                terminal.render_line(SEND_FAILED_NOTICE);
            }
        }
    }
}

/// Receive duty: print broadcasts; reconnect forever when offline
///
/// `reader` is the read half from an earlier successful [`ClientSession::connect`],
/// if any. Never returns; abort the task to stop it.
pub async fn run_receive_duty<C, T>(
    session: &ClientSession<C>,
    terminal: &T,
    mut reader: Option<OwnedReadHalf>,
) where
    C: Connector,
    T: Terminal + ?Sized,
{
    let mut frame = [0u8; FRAME_LEN];

    loop {
        if !session.is_connected() {
            drop(reader.take());
            terminal.render_line(&format!(
                "Server is offline. Trying to connect in {} seconds",
                session.backoff().as_secs()
            ));
            tokio::time::sleep(session.backoff()).await;

            reader = session.connect().await;
            if reader.is_some() {
                terminal.render_line(RECONNECTED_NOTICE);
            }
            continue;
        }

        let Some(stream) = reader.as_mut() else {
            session.mark_disconnected().await;
            continue;
        };

        match stream.read_exact(&mut frame).await {
            Ok(_) => match Message::decode(&frame) {
                Ok(msg) if msg.kind == MessageKind::Broadcast => {
                    terminal.render_line(&timestamped(&msg.text));
                }
                Ok(msg) => debug!("Ignoring {:?} frame from server", msg.kind),
                Err(e) => warn!("Discarding frame from server: {}", e),
            },
            Err(e) => {
                debug!("Lost connection to server: {}", e);
                session.mark_disconnected().await;
            }
        }
    }
}
