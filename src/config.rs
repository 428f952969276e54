//! Runtime configuration for the server and client

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// TCP port used when none is given
pub const DEFAULT_PORT: u16 = 9090;

/// Server bind host when none is given
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Fixed delay between client reconnect attempts
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(2);

/// Messages buffered per connection before broadcasts to it are dropped
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `host:port` to listen on
    pub bind_addr: String,
    /// Capacity of each connection's outbound queue
    pub outbound_capacity: usize,
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            bind_addr: join_host_port(host, port),
            outbound_capacity: OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BIND_HOST, DEFAULT_PORT)
    }
}

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host:port` of the server
    pub server_addr: String,
    pub nickname: String,
    pub backoff: Duration,
}

impl ClientConfig {
    /// `address` may be a host, an IP, or `host:port`; a missing port means [`DEFAULT_PORT`]
    pub fn new(address: &str, nickname: &str) -> Self {
        Self {
            server_addr: with_default_port(address),
            nickname: nickname.to_string(),
            backoff: RECONNECT_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

fn join_host_port(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port).to_string(),
        Err(_) => format!("{}:{}", host, port),
    }
}

fn with_default_port(address: &str) -> String {
    if address.parse::<SocketAddr>().is_ok() {
        return address.to_string();
    }
    if address.parse::<IpAddr>().is_ok() {
        return join_host_port(address, DEFAULT_PORT);
    }
    match address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            address.to_string()
        }
        _ => join_host_port(address, DEFAULT_PORT),
    }
}
