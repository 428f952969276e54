//! Connection identity
//!
//! Nicknames are display data and may collide, so everything the server does
//! to a connection (registering it, skipping it in a broadcast, evicting or
//! removing it) is keyed by a `ConnectionId` assigned at accept time.

use uuid::Uuid;

/// Handle for one accepted TCP connection
///
/// Lives as long as the socket: the event loop keys its outbound queues and
/// readiness registrations by it, and the registry matches members by it.
/// Two connections registering the same nickname still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Fresh id for a just-accepted connection
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Same as [`ConnectionId::new`]; there is no "null" connection
impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
