//! A single connection to a MUD: transport, protocol engine, game state.
//!
//! [`MudSession`] is the glue between the byte-level layers below and the
//! game-level state above. Each `recv()` reads one chunk from the
//! connection, runs it through the [`ProtocolEngine`], folds GMCP messages
//! into [`GameState`], and writes back any negotiation replies.
//!
//! `recv()` can be split into [`read_chunk`](MudSession::read_chunk), which
//! is safe to cancel, and [`process`](MudSession::process). Decoded events
//! are queued before any reply is written; if the write is cancelled the
//! next `recv()` returns them.

use mudlink_protocol::{
    EngineConfig, GmcpMessage, ProtocolEngine, ProtocolEvent, encode_gmcp, encode_text,
};
use mudlink_transport::{Connection, ConnectionId};
use serde_json::Value;

use crate::{GameState, SessionError, StateChange};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Protocol engine settings (terminal type, charset, GMCP groups).
    pub engine: EngineConfig,

    /// How many `Comm.Channel.Text` lines to keep.
    pub history_limit: usize,

    /// Maximum bytes per transport read. Used by whoever opens the
    /// connection; the session itself reads whatever the connection hands it.
    pub read_size: usize,

    /// Offer GMCP first (`WILL GMCP` / `DO GMCP`) instead of waiting for
    /// the server to ask.
    pub offer_gmcp: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            history_limit: 100,
            read_size: 4096,
            offer_gmcp: true,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle of a session.
///
/// ```text
///   Connected ──(eof / error / close)──→ Disconnected
/// ```
///
/// There is no way back: reconnecting means creating a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Disconnected,
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// One thing `recv()` decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A complete line of game text.
    Line(String),
    /// A GMCP message, with what it changed in [`GameState`] (if anything).
    Gmcp {
        message: GmcpMessage,
        change: Option<StateChange>,
    },
}

// ---------------------------------------------------------------------------
// MudSession
// ---------------------------------------------------------------------------

/// A connected MUD session.
pub struct MudSession<C: Connection> {
    connection: C,
    engine: ProtocolEngine,
    game: GameState,
    state: SessionState,
    config: SessionConfig,
    // Decoded but not yet returned.
    pending: Vec<SessionEvent>,
    // Negotiation replies not yet written.
    outbox: Vec<u8>,
}

impl<C: Connection> MudSession<C> {
    /// Wraps an open connection. Nothing is sent until [`start`](Self::start)
    /// or the first [`recv`](Self::recv).
    pub fn new(connection: C, config: SessionConfig) -> Self {
        let engine = ProtocolEngine::new(config.engine.clone());
        let game = GameState::new(config.history_limit);
        Self {
            connection,
            engine,
            game,
            state: SessionState::Connected,
            config,
            pending: Vec::new(),
            outbox: Vec::new(),
        }
    }

    /// Sends the opening GMCP offer if the config asks for it.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.config.offer_gmcp {
            self.engine.start();
            self.flush_outbound().await?;
        }
        Ok(())
    }

    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// GMCP-derived game state.
    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// The protocol engine, for negotiation state and configuration.
    pub fn engine(&self) -> &ProtocolEngine {
        &self.engine
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn gmcp_enabled(&self) -> bool {
        self.engine.gmcp_enabled()
    }

    /// Waits for the next chunk from the server and returns what it decoded.
    ///
    /// An empty result is normal: the chunk may have been negotiation only,
    /// or half a line. Events left over from a cancelled call come back
    /// first, without waiting for new data.
    ///
    /// # Errors
    /// [`SessionError::Disconnected`] once the connection is closed, and on
    /// every call after that.
    pub async fn recv(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        if self.pending.is_empty() {
            let chunk = self.read_chunk().await?;
            self.decode(&chunk);
        }
        self.deliver().await
    }

    /// Reads one raw chunk without decoding it.
    ///
    /// Cancel-safe: dropping the future loses no data. Pass the chunk to
    /// [`process`](Self::process).
    ///
    /// # Errors
    /// [`SessionError::Disconnected`], as for [`recv`](Self::recv).
    pub async fn read_chunk(&mut self) -> Result<Vec<u8>, SessionError> {
        self.ensure_connected()?;
        match self.connection.recv().await {
            Ok(Some(chunk)) => Ok(chunk),
            Ok(None) => {
                tracing::info!(conn = %self.id(), "server closed the connection");
                Err(self.mark_disconnected())
            }
            Err(e) => {
                tracing::error!(conn = %self.id(), error = %e, "receive failed");
                Err(self.mark_disconnected())
            }
        }
    }

    /// Decodes a chunk from [`read_chunk`](Self::read_chunk), writes any
    /// negotiation replies, and returns the decoded events.
    pub async fn process(&mut self, chunk: &[u8]) -> Result<Vec<SessionEvent>, SessionError> {
        self.decode(chunk);
        self.deliver().await
    }

    /// Whether decoded events are waiting for the next [`recv`](Self::recv).
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn decode(&mut self, chunk: &[u8]) {
        for event in self.engine.feed(chunk) {
            let event = match event {
                ProtocolEvent::Line(line) => SessionEvent::Line(line),
                ProtocolEvent::Gmcp(message) => {
                    let change = self.game.apply(&message);
                    SessionEvent::Gmcp { message, change }
                }
            };
            self.pending.push(event);
        }
    }

    // Writes replies, then hands over the queued events. A failed write
    // still returns what was decoded; the disconnect shows on the next call.
    async fn deliver(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        if let Err(e) = self.flush_outbound().await {
            if self.pending.is_empty() {
                return Err(e);
            }
        }
        Ok(std::mem::take(&mut self.pending))
    }

    /// Sends one command line.
    pub async fn send(&mut self, text: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.flush_outbound().await?;
        let bytes = encode_text(text, self.engine.config().charset);
        self.write(&bytes).await
    }

    /// Sends a GMCP message.
    ///
    /// # Errors
    /// [`SessionError::GmcpNotEnabled`] until the server has agreed to GMCP.
    pub async fn send_gmcp(
        &mut self,
        channel: &str,
        payload: Option<&Value>,
    ) -> Result<(), SessionError> {
        self.ensure_connected()?;
        if !self.engine.gmcp_enabled() {
            return Err(SessionError::GmcpNotEnabled);
        }
        let bytes = encode_gmcp(channel, payload)?;
        self.flush_outbound().await?;
        tracing::debug!(%channel, "GMCP sent");
        self.write(&bytes).await
    }

    /// Returns an unterminated prompt line, if one is buffered.
    pub fn flush_prompt(&mut self) -> Option<String> {
        self.engine.flush_partial()
    }

    /// Closes the connection. Safe to call after the server has already
    /// hung up.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        let was_connected = self.is_connected();
        self.state = SessionState::Disconnected;
        tracing::info!(conn = %self.id(), "closing session");
        match self.connection.close().await {
            Ok(()) => Ok(()),
            Err(e) if !was_connected => {
                tracing::debug!(conn = %self.id(), error = %e, "close after disconnect");
                Ok(())
            }
            Err(e) => Err(SessionError::Transport(Box::new(e))),
        }
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Connected => Ok(()),
            SessionState::Disconnected => Err(SessionError::Disconnected),
        }
    }

    fn mark_disconnected(&mut self) -> SessionError {
        self.state = SessionState::Disconnected;
        SessionError::Disconnected
    }

    // Replies stay in the outbox until a write succeeds, so a cancelled
    // write is retried by the next one.
    async fn flush_outbound(&mut self) -> Result<(), SessionError> {
        let fresh = self.engine.take_outbound();
        self.outbox.extend_from_slice(&fresh);
        if self.outbox.is_empty() {
            return Ok(());
        }
        if let Err(e) = self.connection.send(&self.outbox).await {
            tracing::error!(conn = %self.id(), error = %e, "send failed");
            return Err(self.mark_disconnected());
        }
        self.outbox.clear();
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        if let Err(e) = self.connection.send(bytes).await {
            tracing::error!(conn = %self.id(), error = %e, "send failed");
            return Err(self.mark_disconnected());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use mudlink_transport::TransportError;
    use serde_json::json;

    const IAC: u8 = 255;
    const WILL: u8 = 251;
    const DO: u8 = 253;
    const SB: u8 = 250;
    const SE: u8 = 240;
    const TTYPE: u8 = 24;
    const GMCP: u8 = 201;

    /// Scripted connection: hands out queued chunks, records writes.
    struct MockConnection {
        incoming: Mutex<VecDeque<Result<Option<Vec<u8>>, TransportError>>>,
        sent: Mutex<Vec<u8>>,
        closed: Mutex<bool>,
        stall_sends: Mutex<bool>,
    }

    impl MockConnection {
        fn new(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                incoming: Mutex::new(chunks.into_iter().map(|c| Ok(Some(c))).collect()),
                sent: Mutex::new(Vec::new()),
                closed: Mutex::new(false),
                stall_sends: Mutex::new(false),
            }
        }

        fn sent(&self) -> Vec<u8> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Connection for MockConnection {
        type Error = TransportError;

        async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
            let stall = *self.stall_sends.lock().unwrap();
            if stall {
                std::future::pending::<()>().await;
            }
            self.sent.lock().unwrap().extend_from_slice(data);
            Ok(())
        }

        async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
            self.incoming.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }

        async fn close(&self) -> Result<(), TransportError> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }

        fn id(&self) -> ConnectionId {
            ConnectionId::new(1)
        }
    }

    fn quiet() -> SessionConfig {
        SessionConfig {
            offer_gmcp: false,
            ..SessionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_recv_decodes_lines() {
        let conn = MockConnection::new(vec![b"Hello\r\nWor".to_vec(), b"ld\r\n".to_vec()]);
        let mut session = MudSession::new(conn, quiet());

        assert_eq!(session.recv().await.unwrap(), vec![SessionEvent::Line("Hello".into())]);
        assert_eq!(session.recv().await.unwrap(), vec![SessionEvent::Line("World".into())]);
    }

    #[tokio::test]
    async fn test_recv_writes_negotiation_replies() {
        let conn = MockConnection::new(vec![vec![IAC, WILL, GMCP]]);
        let mut session = MudSession::new(conn, quiet());

        assert!(session.recv().await.unwrap().is_empty());
        assert!(session.gmcp_enabled());
        assert!(session.connection.sent().starts_with(&[IAC, DO, GMCP]));
    }

    #[tokio::test]
    async fn test_recv_applies_gmcp_to_game_state() {
        let mut frame = vec![IAC, SB, GMCP];
        frame.extend_from_slice(br#"Char.Vitals {"hp":80,"maxhp":100}"#);
        frame.extend_from_slice(&[IAC, SE]);

        let conn = MockConnection::new(vec![frame]);
        let mut session = MudSession::new(conn, quiet());

        let events = session.recv().await.unwrap();
        assert!(matches!(
            &events[..],
            [SessionEvent::Gmcp { change: Some(StateChange::Vitals), .. }]
        ));
        assert_eq!(session.game().character.vitals.hp, 80);
    }

    #[tokio::test]
    async fn test_events_survive_a_cancelled_reply_write() {
        let mut chunk = b"You see a door.\r\n".to_vec();
        chunk.extend_from_slice(&[IAC, DO, TTYPE]);
        let conn = MockConnection::new(vec![chunk, b"It opens.\r\n".to_vec()]);
        *conn.stall_sends.lock().unwrap() = true;
        let mut session = MudSession::new(conn, quiet());

        let stalled = tokio::time::timeout(Duration::from_millis(20), session.recv()).await;
        assert!(stalled.is_err());
        assert!(session.has_pending());

        *session.connection.stall_sends.lock().unwrap() = false;
        assert_eq!(
            session.recv().await.unwrap(),
            vec![SessionEvent::Line("You see a door.".into())]
        );
        assert_eq!(session.connection.sent(), vec![IAC, WILL, TTYPE]);
        assert_eq!(
            session.recv().await.unwrap(),
            vec![SessionEvent::Line("It opens.".into())]
        );
    }

    #[tokio::test]
    async fn test_read_chunk_then_process() {
        let conn = MockConnection::new(vec![b"Hi\r\n".to_vec()]);
        let mut session = MudSession::new(conn, quiet());

        let chunk = session.read_chunk().await.unwrap();
        assert_eq!(chunk, b"Hi\r\n".to_vec());
        assert_eq!(
            session.process(&chunk).await.unwrap(),
            vec![SessionEvent::Line("Hi".into())]
        );
        assert!(!session.has_pending());
    }

    #[tokio::test]
    async fn test_eof_is_terminal() {
        let conn = MockConnection::new(vec![]);
        let mut session = MudSession::new(conn, quiet());

        assert!(matches!(session.recv().await, Err(SessionError::Disconnected)));
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(matches!(session.recv().await, Err(SessionError::Disconnected)));
        assert!(matches!(session.send("look").await, Err(SessionError::Disconnected)));
    }

    #[tokio::test]
    async fn test_transport_error_disconnects() {
        let conn = MockConnection::new(vec![]);
        conn.incoming
            .lock()
            .unwrap()
            .push_back(Err(TransportError::ReceiveFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))));
        let mut session = MudSession::new(conn, quiet());

        assert!(matches!(session.recv().await, Err(SessionError::Disconnected)));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_send_gmcp_requires_negotiation() {
        let conn = MockConnection::new(vec![vec![IAC, WILL, GMCP]]);
        let mut session = MudSession::new(conn, quiet());

        let err = session.send_gmcp("Core.Ping", None).await.unwrap_err();
        assert!(matches!(err, SessionError::GmcpNotEnabled));

        session.recv().await.unwrap();
        session
            .send_gmcp("Char.Skills.Get", Some(&json!({"group": "combat"})))
            .await
            .unwrap();
        let sent = String::from_utf8_lossy(&session.connection.sent()).into_owned();
        assert!(sent.contains(r#"Char.Skills.Get {"group":"combat"}"#));
    }

    #[tokio::test]
    async fn test_start_offers_gmcp() {
        let conn = MockConnection::new(vec![]);
        let mut session = MudSession::new(conn, SessionConfig::default());
        session.start().await.unwrap();
        assert_eq!(
            session.connection.sent(),
            vec![IAC, WILL, GMCP, IAC, DO, GMCP]
        );
    }

    #[tokio::test]
    async fn test_send_appends_crlf() {
        let conn = MockConnection::new(vec![]);
        let mut session = MudSession::new(conn, quiet());
        session.send("north").await.unwrap();
        assert_eq!(session.connection.sent(), b"north\r\n".to_vec());
    }

    #[tokio::test]
    async fn test_flush_prompt() {
        let conn = MockConnection::new(vec![b"Login: ".to_vec()]);
        let mut session = MudSession::new(conn, quiet());
        assert!(session.recv().await.unwrap().is_empty());
        assert_eq!(session.flush_prompt().as_deref(), Some("Login: "));
        assert_eq!(session.flush_prompt(), None);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let conn = MockConnection::new(vec![]);
        let mut session = MudSession::new(conn, quiet());
        session.close().await.unwrap();
        session.close().await.unwrap();
        assert!(*session.connection.closed.lock().unwrap());
        assert!(matches!(session.recv().await, Err(SessionError::Disconnected)));
    }
}
