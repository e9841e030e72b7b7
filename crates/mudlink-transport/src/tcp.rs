//! TCP transport implementation using `tokio::net`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Default size of a single read from the socket.
const DEFAULT_READ_SIZE: usize = 4096;

/// A TCP-based [`Transport`] that dials game servers.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    read_size: usize,
    nodelay: bool,
}

impl TcpTransport {
    /// Creates a transport with the default read size and `TCP_NODELAY` on.
    pub fn new() -> Self {
        Self {
            read_size: DEFAULT_READ_SIZE,
            nodelay: true,
        }
    }

    /// Sets how many bytes a single `recv` reads at most.
    pub fn read_size(mut self, size: usize) -> Self {
        self.read_size = size.max(1);
        self
    }

    /// Enables or disables `TCP_NODELAY` on new connections.
    pub fn nodelay(mut self, on: bool) -> Self {
        self.nodelay = on;
        self
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn connect(&self, addr: &str) -> Result<Self::Connection, Self::Error> {
        let stream = TcpStream::connect(addr).await.map_err(|source| {
            TransportError::ConnectFailed {
                addr: addr.to_string(),
                source,
            }
        })?;
        if self.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(error = %e, "could not set TCP_NODELAY");
            }
        }
        let conn = TcpConnection::from_stream(stream, self.read_size);
        tracing::info!(id = %conn.id, addr, "connected");
        Ok(conn)
    }
}

/// A single TCP connection.
///
/// The stream is split so that a pending `recv` never blocks a `send`:
/// each half sits behind its own lock.
pub struct TcpConnection {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    read_size: usize,
}

impl TcpConnection {
    /// Wraps an already-connected stream.
    pub fn from_stream(stream: TcpStream, read_size: usize) -> Self {
        let peer = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();
        Self {
            id: ConnectionId::new(
                NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            ),
            peer,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            read_size: read_size.max(1),
        }
    }

    /// Returns the remote address, if the socket reported one.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut buf = vec![0u8; self.read_size];
        let n = self
            .reader
            .lock()
            .await
            .read(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            tracing::debug!(id = %self.id, "peer closed connection");
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
