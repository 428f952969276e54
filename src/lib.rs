//! Multi-client TCP Chat Library
//!
//! A minimal text chat over fixed-size binary frames: the server multiplexes
//! every connection on one event loop and rebroadcasts each message to all
//! other clients; clients register a nickname and reconnect automatically.
//!
//! # Features
//! - Fixed 120-byte wire frame (Register / Chat / Broadcast)
//! - Readiness-multiplexed accept/read loop on a single task
//! - Mutex-guarded client registry shared with the operator console
//! - Broadcast fan-out through per-connection outbound queues
//! - Client send/receive duties with unbounded fixed-backoff reconnect
//!
//! # Architecture
//! - `ChatServer` owns the listener and a `ReadinessSet` of read halves
//! - Each connection has a writer task draining its outbound queue
//! - `Registry` is the only state shared across threads
//! - `ClientSession` is shared by the client's send and receive duties
//!
//! # Example
//! ```ignore
//! use roomcast::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), roomcast::AppError> {
//!     let server = ChatServer::bind(&ServerConfig::default()).await?;
//!     let registry = server.registry();
//!     tokio::spawn(server.run());
//!     println!("{:?}", registry.list());
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod command;
pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod handler;
pub mod logger;
pub mod message;
pub mod poller;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use broadcast::broadcast_except;
pub use command::Command;
pub use config::{ClientConfig, ServerConfig};
pub use connection::ClientConnection;
pub use console::{MemoryTerminal, StdoutTerminal, Terminal};
pub use error::{AppError, SendError};
pub use message::{Message, MessageKind, FRAME_LEN};
pub use registry::Registry;
pub use server::ChatServer;
pub use session::{run_receive_duty, run_send_duty, ClientSession, Connector, TcpConnector};
pub use types::ConnectionId;
