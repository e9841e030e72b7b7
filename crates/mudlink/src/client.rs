//! `MudClient` builder and event loop.
//!
//! This is the entry point for driving a MUD. It ties together all the
//! layers: transport → protocol → session → world map. Room facts from
//! GMCP `Room.Info` reach the map here and nowhere else.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mudlink_map::{compress_route, parse_route, MapConfig, Room, RoomFacts, RoomId, WorldGraph};
use mudlink_protocol::GmcpMessage;
use mudlink_session::{
    GameState, MudSession, RoomInfo, SessionConfig, SessionError, SessionEvent, StateChange,
};
use mudlink_transport::{Connection, TcpConnection, TcpTransport, Transport};
use serde_json::Value;

use crate::MudlinkError;

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// What [`MudClient::next_events`] hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A complete line of game text.
    Line(String),
    /// Text with no line ending that sat unanswered for the prompt
    /// timeout: a prompt such as `"HP:80 >"`.
    Prompt(String),
    /// A GMCP message and what it changed in the game state.
    Gmcp {
        message: GmcpMessage,
        change: Option<StateChange>,
    },
    /// The server placed us in a room. Follows the `Room.Info` message
    /// that caused it. `previous == Some(room_id)` means a refresh, not a
    /// move.
    RoomChanged {
        room_id: RoomId,
        previous: Option<RoomId>,
    },
    /// The connection is gone. Reported once; later calls fail with
    /// [`SessionError::Disconnected`].
    Disconnected,
}

/// Converts a `Room.Info` snapshot into map facts.
fn room_facts(info: &RoomInfo) -> RoomFacts {
    RoomFacts {
        id: info.num.clone(),
        name: info.name.clone(),
        area: info.area.clone(),
        environment: info.environment.clone(),
        description: String::new(),
        exits: info.exits.clone(),
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and connecting a [`MudClient`].
///
/// # Example
///
/// ```rust,no_run
/// use mudlink::prelude::*;
///
/// # async fn run() -> Result<(), MudlinkError> {
/// let mut client = MudClient::builder()
///     .host("dunemud.net")
///     .port(6789)
///     .map_file("maps/dune.json")
///     .connect()
///     .await?;
///
/// for event in client.next_events().await? {
///     if let ClientEvent::Line(line) = event {
///         println!("{line}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct MudClientBuilder {
    host: String,
    port: u16,
    session_config: SessionConfig,
    map_config: MapConfig,
    map_file: Option<PathBuf>,
    prompt_timeout: Duration,
}

impl MudClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6789,
            session_config: SessionConfig::default(),
            map_config: MapConfig::default(),
            map_file: None,
            prompt_timeout: Duration::from_millis(250),
        }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the session configuration (engine, history, read size).
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn map_config(mut self, config: MapConfig) -> Self {
        self.map_config = config;
        self
    }

    /// Map file loaded on connect (if it exists) and written by
    /// [`MudClient::save_map`].
    pub fn map_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.map_file = Some(path.into());
        self
    }

    /// How long unterminated text may sit before it is reported as a
    /// [`ClientEvent::Prompt`].
    pub fn prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }

    /// Opens the TCP connection and sends the opening GMCP offer.
    pub async fn connect(self) -> Result<MudClient<TcpConnection>, MudlinkError> {
        let addr = format!("{}:{}", self.host, self.port);
        let map = self.open_map()?;
        let conn = TcpTransport::new()
            .read_size(self.session_config.read_size)
            .connect(&addr)
            .await?;

        let mut session = MudSession::new(conn, self.session_config);
        session.start().await?;

        let mut client = MudClient::new(session, map);
        client.map_file = self.map_file;
        client.prompt_timeout = self.prompt_timeout;
        Ok(client)
    }

    fn open_map(&self) -> Result<WorldGraph, MudlinkError> {
        match &self.map_file {
            Some(path) if path.exists() => {
                let mut map = WorldGraph::load(path)?;
                map.set_config(self.map_config.clone());
                Ok(map)
            }
            _ => Ok(WorldGraph::with_config(self.map_config.clone())),
        }
    }
}

impl Default for MudClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// MudClient
// ---------------------------------------------------------------------------

/// A connected session plus the map it is building.
pub struct MudClient<C: Connection> {
    session: MudSession<C>,
    map: WorldGraph,
    map_file: Option<PathBuf>,
    prompt_timeout: Duration,
    disconnect_reported: bool,
}

impl MudClient<TcpConnection> {
    /// Creates a new builder.
    pub fn builder() -> MudClientBuilder {
        MudClientBuilder::new()
    }
}

impl<C: Connection> MudClient<C> {
    /// Wraps an existing session and map. The session should already be
    /// started.
    pub fn new(session: MudSession<C>, map: WorldGraph) -> Self {
        Self {
            session,
            map,
            map_file: None,
            prompt_timeout: Duration::from_millis(250),
            disconnect_reported: false,
        }
    }

    pub fn session(&self) -> &MudSession<C> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MudSession<C> {
        &mut self.session
    }

    /// GMCP-derived character and room state.
    pub fn game(&self) -> &GameState {
        self.session.game()
    }

    pub fn map(&self) -> &WorldGraph {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut WorldGraph {
        &mut self.map
    }

    pub fn current_room(&self) -> Option<&Room> {
        self.map.current_room()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Waits for the next batch of events.
    ///
    /// While an unterminated line is buffered the wait is bounded by the
    /// prompt timeout; if nothing arrives in time the buffered text comes
    /// back as a [`ClientEvent::Prompt`].
    ///
    /// # Errors
    /// [`MudlinkError::Session`] with [`SessionError::Disconnected`] on
    /// calls made after [`ClientEvent::Disconnected`] was returned.
    pub async fn next_events(&mut self) -> Result<Vec<ClientEvent>, MudlinkError> {
        if !self.session.is_connected() {
            return self.report_disconnect();
        }

        // Only the read is timed; decoding and replies always run to the end.
        let received = if self.session.engine().has_partial() && !self.session.has_pending() {
            match tokio::time::timeout(self.prompt_timeout, self.session.read_chunk()).await {
                Ok(Ok(chunk)) => self.session.process(&chunk).await,
                Ok(Err(e)) => Err(e),
                Err(_) => {
                    let prompt = self.session.flush_prompt();
                    return Ok(prompt.into_iter().map(ClientEvent::Prompt).collect());
                }
            }
        } else {
            self.session.recv().await
        };

        let batch = match received {
            Ok(batch) => batch,
            Err(SessionError::Disconnected) => return self.report_disconnect(),
            Err(e) => return Err(e.into()),
        };

        let mut events = Vec::with_capacity(batch.len());
        for event in batch {
            match event {
                SessionEvent::Line(line) => events.push(ClientEvent::Line(line)),
                SessionEvent::Gmcp { message, change } => {
                    let moved = match &change {
                        Some(StateChange::Room { previous }) => self.record_room(previous.as_deref()),
                        _ => None,
                    };
                    events.push(ClientEvent::Gmcp { message, change });
                    events.extend(moved);
                }
            }
        }
        Ok(events)
    }

    fn report_disconnect(&mut self) -> Result<Vec<ClientEvent>, MudlinkError> {
        if self.disconnect_reported {
            return Err(SessionError::Disconnected.into());
        }
        self.disconnect_reported = true;
        tracing::info!(conn = %self.session.id(), "disconnected");
        Ok(vec![ClientEvent::Disconnected])
    }

    // The one place GMCP room facts become map mutations.
    fn record_room(&mut self, previous: Option<&str>) -> Option<ClientEvent> {
        let info = self.session.game().room.as_ref()?;
        if info.num.is_empty() {
            tracing::warn!(name = %info.name, "Room.Info without a room number, not mapped");
            return None;
        }
        let room = self.map.upsert_room_and_exits(&room_facts(info));
        Some(ClientEvent::RoomChanged {
            room_id: room.id.clone(),
            previous: previous.map(RoomId::from),
        })
    }

    /// Sends one command line.
    pub async fn send(&mut self, command: &str) -> Result<(), MudlinkError> {
        Ok(self.session.send(command).await?)
    }

    /// Sends a GMCP message; fails until GMCP is negotiated.
    pub async fn send_gmcp(&mut self, channel: &str, payload: Option<&Value>) -> Result<(), MudlinkError> {
        Ok(self.session.send_gmcp(channel, payload).await?)
    }

    /// Speedwalk string from the current room to `room_id`.
    ///
    /// `Ok(None)` when the map knows no route.
    ///
    /// # Errors
    /// [`MudlinkError::NoCurrentRoom`] before the first `Room.Info`;
    /// [`MudlinkError::Map`] if `room_id` is unknown.
    pub fn route_to(&self, room_id: &str) -> Result<Option<String>, MudlinkError> {
        let here = self.map.current_room_id().ok_or(MudlinkError::NoCurrentRoom)?;
        Ok(self.map.route_string(here.as_str(), room_id)?)
    }

    /// The nearest room tagged `tag` and the speedwalk string to it.
    ///
    /// # Errors
    /// [`MudlinkError::NoCurrentRoom`] before the first `Room.Info`.
    pub fn route_to_tag(&self, tag: &str) -> Result<Option<(RoomId, String)>, MudlinkError> {
        let here = self.map.current_room_id().ok_or(MudlinkError::NoCurrentRoom)?;
        let found = self.map.nearest_by_tag(here.as_str(), tag)?;
        Ok(found.map(|(id, path)| {
            let dirs: Vec<_> = path.iter().map(|s| s.direction).collect();
            (id, compress_route(&dirs))
        }))
    }

    /// Sends every step of a speedwalk string as a command, in order.
    ///
    /// Returns the number of commands sent. The map's current room is not
    /// moved here; it follows the server's `Room.Info` replies.
    ///
    /// # Errors
    /// [`MudlinkError::Map`] if the route does not parse (nothing is sent);
    /// [`MudlinkError::Session`] if the connection drops part way.
    pub async fn walk(&mut self, route: &str) -> Result<usize, MudlinkError> {
        let steps = parse_route(route)?;
        for dir in &steps {
            self.session.send(dir.token()).await?;
        }
        tracing::debug!(%route, steps = steps.len(), "walked");
        Ok(steps.len())
    }

    /// Writes the map to the configured map file.
    pub fn save_map(&self) -> Result<&Path, MudlinkError> {
        let path = self.map_file.as_deref().ok_or(MudlinkError::NoMapFile)?;
        self.map.save(path)?;
        Ok(path)
    }

    /// Sets the file used by [`save_map`](Self::save_map).
    pub fn set_map_file(&mut self, path: impl Into<PathBuf>) {
        self.map_file = Some(path.into());
    }

    /// Closes the connection.
    pub async fn close(&mut self) -> Result<(), MudlinkError> {
        Ok(self.session.close().await?)
    }
}
