//! Outbound connection handler
//!
//! Each accepted connection gets a writer task that drains its outbound
//! queue onto the socket's write half. The task ends when every sender for
//! the queue is dropped or a write fails; either way the write half is
//! shut down and released. The event loop aborts the task outright when it
//! evicts a connection that stopped reading.

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::message::Message;
use crate::types::ConnectionId;

/// Spawn the writer task for one connection
pub fn spawn_writer(
    id: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            if let Err(e) = writer.write_all(&msg.encode()).await {
                debug!("Write to {} failed, ending writer task: {}", id, e);
                break;
            }
        }
        let _ = writer.shutdown().await;
        debug!("Writer task ended for {}", id);
    })
}
