//! Unified error type for the Mudlink client.

use mudlink_map::MapError;
use mudlink_protocol::ProtocolError;
use mudlink_session::SessionError;
use mudlink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapped variant generates the `From`
/// impl, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MudlinkError {
    /// Connecting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding an outbound message failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session is closed, or GMCP is not negotiated.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A map query or map file operation failed.
    #[error(transparent)]
    Map(#[from] MapError),

    /// A route was requested before any room has been entered.
    #[error("no current room")]
    NoCurrentRoom,

    /// `save_map` was called on a client built without a map file.
    #[error("no map file configured")]
    NoMapFile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let mud_err: MudlinkError = err.into();
        assert!(matches!(mud_err, MudlinkError::Transport(_)));
        assert!(mud_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let mud_err: MudlinkError = err.into();
        assert!(matches!(mud_err, MudlinkError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let mud_err: MudlinkError = SessionError::GmcpNotEnabled.into();
        assert!(matches!(mud_err, MudlinkError::Session(_)));
    }

    #[test]
    fn test_from_map_error() {
        let err = MapError::RoomNotFound("1001".into());
        let mud_err: MudlinkError = err.into();
        assert!(matches!(mud_err, MudlinkError::Map(_)));
        assert!(mud_err.to_string().contains("1001"));
    }
}
