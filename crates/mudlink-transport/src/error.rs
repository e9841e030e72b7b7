/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Opening the connection failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        /// The `host:port` we tried to reach.
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
