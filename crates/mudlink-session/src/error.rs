//! Error types for the session layer.

use crate::SessionId;

/// Errors that can occur while driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server closed the connection, or it failed underneath us.
    /// Terminal: every later call on the same session returns this again.
    #[error("session disconnected")]
    Disconnected,

    /// A GMCP message was sent before the server agreed to GMCP.
    #[error("GMCP has not been negotiated")]
    GmcpNotEnabled,

    /// The underlying connection reported an error.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An outbound message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] mudlink_protocol::ProtocolError),

    /// No session is registered under the given id.
    #[error("session {0} not found")]
    NotFound(SessionId),
}
