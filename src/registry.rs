//! Client registry
//!
//! The set of registered connections, shared by the event loop and the
//! operator console. Every read and mutation goes through one mutex, held only
//! for the set operation itself. Announcements are fanned out after the guard
//! is dropped, via [`broadcast_except`], which takes its own snapshot.
//!
//! Members whose outbound queue overflows are evicted from here during a
//! broadcast. Their ids wait in the registry until the event loop takes them
//! and closes the sockets.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::broadcast::broadcast_except;
use crate::connection::ClientConnection;
use crate::types::ConnectionId;

/// Thread-safe set of registered connections, in join order
#[derive(Debug, Default)]
pub struct Registry {
    clients: Mutex<Vec<ClientConnection>>,
    evicted: Mutex<Vec<ConnectionId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn clients(&self) -> MutexGuard<'_, Vec<ClientConnection>> {
        // A panic while holding the guard cannot leave the Vec half-updated
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evicted(&self) -> MutexGuard<'_, Vec<ConnectionId>> {
        self.evicted.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection and announce it to everyone else
    ///
    /// The announcement excludes the new connection itself. Registering an
    /// id that is already present replaces its nickname in place.
    pub fn add(&self, client: ClientConnection) {
        let announcement = format!("User {} entered the room", client.nickname);
        broadcast_except(self, client.id, &announcement);

        info!("Client {} registered as '{}'", client.id, client.nickname);

        let mut clients = self.clients();
        match clients.iter_mut().find(|c| c.id == client.id) {
            Some(existing) => existing.nickname = client.nickname,
            None => clients.push(client),
        }
        debug!("Total clients: {}", clients.len());
    }

    /// Remove a connection, announcing the departure if it was registered
    ///
    /// Idempotent: removing an absent id changes nothing and announces nothing.
    /// Dropping the returned entry releases this registry's hold on the
    /// connection's outbound queue.
    pub fn remove(&self, id: ConnectionId) -> Option<ClientConnection> {
        let removed = {
            let mut clients = self.clients();
            let position = clients.iter().position(|c| c.id == id);
            position.map(|index| clients.remove(index))
        };

        if let Some(client) = &removed {
            info!("Client {} ('{}') removed", client.id, client.nickname);
            let announcement = format!("User {} was disconnected from the room", client.nickname);
            broadcast_except(self, id, &announcement);
        }

        removed
    }

    /// Remove a member that can no longer keep up with its broadcasts
    ///
    /// The departure is announced like any other. The id is held until
    /// [`Registry::take_evicted`] hands it to whoever owns the socket.
    pub fn evict(&self, id: ConnectionId) -> Option<ClientConnection> {
        let removed = self.remove(id);
        if removed.is_some() {
            self.evicted().push(id);
        }
        removed
    }

    /// Drain the ids evicted since the last call
    pub fn take_evicted(&self) -> Vec<ConnectionId> {
        std::mem::take(&mut *self.evicted())
    }

    /// Nicknames of all registered connections, in join order
    pub fn list(&self) -> Vec<String> {
        self.clients().iter().map(|c| c.nickname.clone()).collect()
    }

    /// Copy of the current members, taken under the lock
    pub fn snapshot(&self) -> Vec<ClientConnection> {
        self.clients().clone()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.clients().iter().any(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients().is_empty()
    }
}
