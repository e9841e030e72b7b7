//! # Mudlink
//!
//! Drive a text MUD from code.
//!
//! Mudlink decodes the telnet byte stream (with the GMCP side-channel) into
//! text lines and structured game data, keeps the character's state
//! current, and builds a map of every room visited so it can tell you how
//! to get back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mudlink::prelude::*;
//!
//! # async fn run() -> Result<(), MudlinkError> {
//! let mut client = MudClient::builder().host("127.0.0.1").port(6789).connect().await?;
//! loop {
//!     for event in client.next_events().await? {
//!         match event {
//!             ClientEvent::Line(line) => println!("{line}"),
//!             ClientEvent::RoomChanged { room_id, .. } => println!("now in {room_id}"),
//!             ClientEvent::Disconnected => return Ok(()),
//!             _ => {}
//!         }
//!     }
//! }
//! # }
//! ```
//!
//! The layers are usable on their own: [`protocol`] is a sans-IO decoder,
//! [`map`] a standalone world graph.

mod client;
mod error;

pub use client::{ClientEvent, MudClient, MudClientBuilder};
pub use error::MudlinkError;

pub use mudlink_map as map;
pub use mudlink_protocol as protocol;
pub use mudlink_session as session;
pub use mudlink_transport as transport;

/// Everything a typical client needs, in one import.
pub mod prelude {
    pub use crate::{ClientEvent, MudClient, MudClientBuilder, MudlinkError};
    pub use mudlink_map::{
        Direction, MapConfig, MapError, PathStep, Room, RoomFacts, RoomId, WorldGraph,
        compress_route, parse_route,
    };
    pub use mudlink_protocol::{Channel, Charset, EngineConfig, GmcpMessage, ProtocolError};
    pub use mudlink_session::{
        GameState, MudSession, SessionConfig, SessionError, StateChange, StateSummary,
    };
    pub use mudlink_transport::{Connection, TransportError};
}
