//! Error types for the chat server and client
//!
//! Defines application-level errors and outbound delivery errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers resource setup failures (fatal for the owning loop) and
/// protocol errors (the offending frame is discarded).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (socket, bind, accept)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame length does not match the fixed wire size
    #[error("Malformed message: expected {expected} bytes, got {actual}")]
    MalformedMessage { expected: usize, actual: usize },

    /// Message kind outside Register/Chat/Broadcast
    #[error("Unknown message kind: {0}")]
    UnknownKind(u32),

    /// Client has no live connection to the server
    #[error("Server is offline")]
    Offline,
}

/// Outbound delivery errors
///
/// Occurs when enqueueing a message for a connection's writer task.
#[derive(Debug, Error)]
pub enum SendError {
    /// The writer task has ended (connection gone)
    #[error("Channel closed")]
    ChannelClosed,

    /// The connection is not draining its queue fast enough
    #[error("Outbound queue full")]
    QueueFull,
}
