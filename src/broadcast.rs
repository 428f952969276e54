//! Broadcast engine
//!
//! Fans one server message out to every registered connection except the
//! sender. Recipients are snapshotted under the registry lock; delivery happens
//! after the lock is released and only enqueues, so a slow receiver never
//! stalls the event loop. A receiver whose queue is full has already missed a
//! message, so it is evicted from the registry instead of staying on with a
//! gap in its stream.

use tracing::{debug, warn};

use crate::error::SendError;
use crate::message::Message;
use crate::registry::Registry;
use crate::types::ConnectionId;

/// Send `text` as a Broadcast message to everyone but `sender`
///
/// Recipients with a full queue are evicted once the fan-out is done. A
/// closed queue is only logged; its reader reports the failure on its own.
/// Returns the number of recipients that accepted the message.
pub fn broadcast_except(registry: &Registry, sender: ConnectionId, text: &str) -> usize {
    let msg = Message::broadcast(text);
    let recipients = registry.snapshot();

    let mut delivered = 0;
    let mut overflowed = Vec::new();
    for client in recipients.iter().filter(|c| c.id != sender) {
        debug!("Sending broadcast to {}", client.id);
        match client.send(msg.clone()) {
            Ok(()) => delivered += 1,
            Err(SendError::QueueFull) => {
                warn!("Outbound queue of {} ('{}') is full", client.id, client.nickname);
                overflowed.push(client.id);
            }
            Err(e) => warn!(
                "Dropped broadcast for {} ('{}'): {}",
                client.id, client.nickname, e
            ),
        }
    }

    for id in overflowed {
        registry.evict(id);
    }
    delivered
}
