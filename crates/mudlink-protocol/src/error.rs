//! Error types for the protocol layer.
//!
//! Almost nothing in the decoder is allowed to fail: malformed input is
//! logged and skipped so the byte stream stays in sync. These variants
//! cover the places where a caller asked for something specific (a typed
//! payload, an outbound message) and we could not produce it.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an outbound GMCP payload failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// A GMCP payload did not have the shape the caller asked for.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The message is invalid at the protocol level, e.g. a GMCP channel
    /// name that is empty or contains whitespace.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
