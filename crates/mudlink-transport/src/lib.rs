//! Transport abstraction layer for Mudlink.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the byte stream a game server is reached through. The protocol engine
//! never touches sockets; it only sees the chunks a [`Connection`] hands it.
//!
//! # Feature Flags
//!
//! - `tcp` (default) — plain TCP transport via `tokio::net`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "tcp")]
mod tcp;

pub use error::TransportError;
#[cfg(feature = "tcp")]
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Opens outbound connections to a game server.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Connects to `addr` (`host:port`).
    async fn connect(&self, addr: &str) -> Result<Self::Connection, Self::Error>;
}

/// A single reliable, ordered byte stream.
///
/// Chunk boundaries carry no meaning: a telnet command may be split across
/// two `recv` calls, and one `recv` may carry many lines.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Writes all of `data` to the peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next chunk of bytes from the peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
