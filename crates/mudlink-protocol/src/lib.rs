//! Telnet and GMCP for Mudlink.
//!
//! This crate turns the raw byte stream a MUD server sends into things a
//! client can act on:
//!
//! - **Engine** ([`ProtocolEngine`]) — a byte-level state machine that
//!   answers option negotiation, collects subnegotiations, and splits text
//!   into lines. It does no I/O of its own.
//! - **Codec** ([`encode_text`], [`encode_gmcp`], ...) — the other
//!   direction: building the bytes a client sends.
//! - **Types** ([`GmcpMessage`], [`ProtocolEvent`], [`TelnetOption`], ...)
//! - **Errors** ([`ProtocolError`])
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (lines + GMCP) → Session (game state)
//! ```
//!
//! The engine is fed whatever the transport read and is indifferent to
//! chunk boundaries: feeding a stream in one call or one byte at a time
//! yields the same events and the same replies.

mod codec;
mod engine;
mod error;
mod types;

pub use codec::{
    Charset, DO, DONT, GA, IAC, NOP, SB, SE, WILL, WONT, encode_gmcp, encode_gmcp_value,
    encode_negotiation, encode_subnegotiation, encode_text, escape_iac,
};
pub use engine::{EngineConfig, NegotiationState, ProtocolEngine};
pub use error::ProtocolError;
pub use types::{Channel, GmcpMessage, ProtocolEvent, TelnetOption, Verb};
