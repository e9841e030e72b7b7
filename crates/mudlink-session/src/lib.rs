//! Session layer for Mudlink.
//!
//! This crate handles one live connection to a MUD server:
//!
//! 1. **Driving the connection** — [`MudSession`] reads from a
//!    [`Connection`](mudlink_transport::Connection), runs the bytes through
//!    the protocol engine, and answers negotiation.
//! 2. **Game state** — [`GameState`] folds GMCP messages (vitals, stats,
//!    status, room, chat) into typed state, honouring partial updates.
//! 3. **Registry** — [`SessionManager`] keeps several sessions by id.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client facade (above)  ← turns room changes into map updates
//!     ↕
//! Session Layer (this crate)  ← connection lifecycle and game state
//!     ↕
//! Protocol Layer (below)  ← telnet negotiation, lines, GMCP messages
//! ```

mod error;
mod manager;
mod session;
mod state;

pub use error::SessionError;
pub use manager::{SessionId, SessionManager};
pub use session::{MudSession, SessionConfig, SessionEvent, SessionState};
pub use state::{
    ChannelMessage, Character, CharacterName, CharacterNameUpdate, CharacterSummary, GameState,
    MaxStats, MaxStatsUpdate, RoomInfo, RoomSummary, StateChange, StateSummary, Stats,
    StatsUpdate, Status, StatusUpdate, Vitals, VitalsUpdate,
};
