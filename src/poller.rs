//! Readiness set
//!
//! The set of connection read halves the event loop is waiting on. Each
//! registration owns its read half and partial frame until the socket reports
//! readable; the event loop then gets both back and decides whether to
//! register them again. A connection that is not re-registered is gone from
//! the set, and dropping its read half releases that side of the socket.
//! A waiting registration can also be withdrawn with
//! [`ReadinessSet::deregister`], which drops its read half on the next poll.
//!
//! Readiness comes from tokio's reactor, so whatever the platform provides
//! (epoll, kqueue, IOCP) sits behind this type.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::pin::Pin;

use futures_util::future::{abortable, AbortHandle, Aborted};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::net::tcp::OwnedReadHalf;

use crate::message::FrameBuffer;
use crate::types::ConnectionId;

/// A connection whose read half reported readiness (or a readiness error)
#[derive(Debug)]
pub struct Readable {
    pub id: ConnectionId,
    pub reader: OwnedReadHalf,
    pub frame: FrameBuffer,
    pub result: io::Result<()>,
}

type Pending = Pin<Box<dyn Future<Output = Result<Readable, Aborted>> + Send>>;

/// Pollable set of client read halves
#[derive(Default)]
pub struct ReadinessSet {
    pending: FuturesUnordered<Pending>,
    handles: HashMap<ConnectionId, AbortHandle>,
}

impl ReadinessSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for read-readiness on `reader`
    pub fn register(&mut self, id: ConnectionId, reader: OwnedReadHalf, frame: FrameBuffer) {
        let (wait, handle) = abortable(async move {
            let result = reader.readable().await;
            Readable {
                id,
                reader,
                frame,
                result,
            }
        });
        self.handles.insert(id, handle);
        self.pending.push(Box::pin(wait));
    }

    /// Stop waiting on `id`; returns whether it was registered
    pub fn deregister(&mut self, id: ConnectionId) -> bool {
        match self.handles.remove(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Next readable connection, or `None` immediately if nothing is registered
    ///
    /// Withdrawn registrations are skipped.
    pub async fn next_ready(&mut self) -> Option<Readable> {
        while let Some(outcome) = self.pending.next().await {
            if let Ok(ready) = outcome {
                self.handles.remove(&ready.id);
                return Some(ready);
            }
        }
        None
    }

    /// Number of registrations still waiting
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
