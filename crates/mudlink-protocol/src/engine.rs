//! The telnet/GMCP decoding engine.
//!
//! [`ProtocolEngine`] is a sans-IO state machine: it is fed whatever bytes
//! the transport produced, in whatever chunk sizes, and hands back the
//! events those bytes completed. Nothing in here blocks or waits; a
//! half-received command simply leaves the machine in a non-`Text` state
//! until the next chunk arrives.
//!
//! ```text
//!            IAC                 WILL/WONT/DO/DONT          <option>
//!   Text ─────────→ Command ─────────────────────→ Negotiate ────────→ Text
//!                      │
//!                      │ SB                                  IAC SE
//!                      └──────────→ Subnegotiation ──────────────────→ Text
//! ```
//!
//! Replies the engine wants to send (negotiation answers, the GMCP
//! handshake, terminal type) are queued internally and drained with
//! [`ProtocolEngine::take_outbound`].

use std::collections::HashSet;

use serde_json::{Value, json};

use crate::codec::{TTYPE_IS, TTYPE_SEND};
use crate::{
    Charset, GmcpMessage, IAC, ProtocolError, ProtocolEvent, SB, SE, TelnetOption,
    Verb, encode_gmcp, encode_negotiation, encode_subnegotiation,
};

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Settings for a [`ProtocolEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Reported in response to `TTYPE SEND`.
    pub terminal_type: String,
    /// Client name sent in `Core.Hello`.
    pub client_name: String,
    /// Client version sent in `Core.Hello`.
    pub client_version: String,
    /// Channel groups requested with `Core.Supports.Set` once GMCP is on.
    pub channel_groups: Vec<String>,
    /// How text bytes are turned into strings.
    pub charset: Charset,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            terminal_type: "XTERM-256COLOR".to_string(),
            client_name: "mudlink".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            channel_groups: ["Char", "Room", "Comm.Channel", "Guild"]
                .into_iter()
                .map(String::from)
                .collect(),
            charset: Charset::Utf8,
        }
    }
}

// ---------------------------------------------------------------------------
// NegotiationState
// ---------------------------------------------------------------------------

/// Which options are currently enabled, and on which side.
///
/// "Remote" options are ones the server performs (it said `WILL`);
/// "local" options are ones we perform (it said `DO`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationState {
    remote: HashSet<TelnetOption>,
    local: HashSet<TelnetOption>,
}

impl NegotiationState {
    /// GMCP is usable once either side has agreed to it.
    pub fn gmcp_enabled(&self) -> bool {
        self.remote.contains(&TelnetOption::Gmcp)
            || self.local.contains(&TelnetOption::Gmcp)
    }

    /// `false` while the server is echoing for us (e.g. password prompts).
    pub fn local_echo(&self) -> bool {
        !self.remote.contains(&TelnetOption::Echo)
    }

    /// Whether the server agreed to suppress go-ahead.
    pub fn suppress_go_ahead(&self) -> bool {
        self.remote.contains(&TelnetOption::SuppressGoAhead)
    }

    /// Whether we agreed to report our terminal type.
    pub fn terminal_type(&self) -> bool {
        self.local.contains(&TelnetOption::TerminalType)
    }

    /// Returns `true` if the server performs `option`.
    pub fn is_remote(&self, option: TelnetOption) -> bool {
        self.remote.contains(&option)
    }

    /// Returns `true` if we perform `option`.
    pub fn is_local(&self, option: TelnetOption) -> bool {
        self.local.contains(&option)
    }
}

/// Options we let the server enable on its side.
fn accepts_remote(option: TelnetOption) -> bool {
    matches!(
        option,
        TelnetOption::Echo | TelnetOption::SuppressGoAhead | TelnetOption::Gmcp
    )
}

/// Options we are willing to enable on our side.
fn accepts_local(option: TelnetOption) -> bool {
    matches!(option, TelnetOption::TerminalType | TelnetOption::Gmcp)
}

// ---------------------------------------------------------------------------
// ProtocolEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
enum State {
    #[default]
    Text,
    /// Saw `IAC`, waiting for the command byte.
    Command,
    /// Saw `IAC <verb>`, waiting for the option byte.
    Negotiate(Verb),
    /// Inside `IAC SB ... IAC SE`.
    Subnegotiation {
        option: Option<u8>,
        buf: Vec<u8>,
        iac_seen: bool,
    },
}

/// Decodes one connection's byte stream into lines and GMCP messages.
#[derive(Debug)]
pub struct ProtocolEngine {
    config: EngineConfig,
    state: State,
    /// Bytes of the current, unterminated line.
    line: Vec<u8>,
    /// Part of the current line was already handed out by `flush_partial`.
    partial_flushed: bool,
    negotiation: NegotiationState,
    /// Requests we sent and have not seen answered: `(our verb, option)`.
    pending: HashSet<(Verb, TelnetOption)>,
    supports_declared: bool,
    outbound: Vec<u8>,
}

impl ProtocolEngine {
    /// Creates an engine with the given settings.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: State::Text,
            line: Vec::new(),
            partial_flushed: false,
            negotiation: NegotiationState::default(),
            pending: HashSet::new(),
            supports_declared: false,
            outbound: Vec::new(),
        }
    }

    /// Returns the engine's settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the current option state.
    pub fn negotiation(&self) -> &NegotiationState {
        &self.negotiation
    }

    /// Shorthand for `negotiation().gmcp_enabled()`.
    pub fn gmcp_enabled(&self) -> bool {
        self.negotiation.gmcp_enabled()
    }

    /// Queues the client's opening offer: `IAC WILL GMCP`, `IAC DO GMCP`.
    ///
    /// The server's answers to these are not answered again.
    pub fn start(&mut self) {
        self.request(Verb::Will, TelnetOption::Gmcp);
        self.request(Verb::Do, TelnetOption::Gmcp);
    }

    /// Drains the bytes the engine wants written to the server.
    pub fn take_outbound(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    /// Returns `true` if replies are waiting in [`take_outbound`](Self::take_outbound).
    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Returns `true` if text is buffered without a line terminator.
    pub fn has_partial(&self) -> bool {
        !self.line.is_empty()
    }

    /// Consumes a chunk of bytes and returns every event it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ProtocolEvent> {
        let mut events = Vec::new();

        for &b in chunk {
            match std::mem::take(&mut self.state) {
                State::Text => match b {
                    IAC => self.state = State::Command,
                    b'\n' => self.complete_line(&mut events),
                    // Telnet's bare CR is sent as CR NUL; the NUL is padding.
                    0 => {}
                    _ => self.line.push(b),
                },
                State::Command => self.command(b),
                State::Negotiate(verb) => self.negotiate(verb, TelnetOption::from(b)),
                State::Subnegotiation {
                    option,
                    buf,
                    iac_seen,
                } => self.subnegotiation_byte(b, option, buf, iac_seen, &mut events),
            }
        }

        events
    }

    /// Returns buffered text that has no line terminator yet, such as a
    /// login prompt.
    ///
    /// The returned bytes are consumed: calling this again without new
    /// input returns `None`, and the eventual complete line carries only
    /// what arrived after the flush.
    pub fn flush_partial(&mut self) -> Option<String> {
        if self.line.is_empty() {
            return None;
        }
        let ready = self.config.charset.complete_prefix(&self.line);
        if ready == 0 {
            return None;
        }
        let rest = self.line.split_off(ready);
        let text = self.config.charset.decode(&self.line);
        self.line = rest;
        self.partial_flushed = true;
        Some(text)
    }

    /// Queues `Core.Supports.Set` for the given channel groups.
    ///
    /// Called automatically, once, when GMCP first becomes active; call it
    /// again to add groups later in the session.
    pub fn declare_supported(&mut self, groups: &[String]) -> Result<(), ProtocolError> {
        let list: Vec<Value> = groups
            .iter()
            .map(|g| Value::String(format!("{g} 1")))
            .collect();
        let bytes = encode_gmcp("Core.Supports.Set", Some(&Value::Array(list)))?;
        self.outbound.extend_from_slice(&bytes);
        self.supports_declared = true;
        tracing::debug!(?groups, "declared GMCP channel groups");
        Ok(())
    }

    /// Queues an arbitrary GMCP message behind any pending replies.
    pub fn queue_gmcp(
        &mut self,
        channel: &str,
        payload: Option<&Value>,
    ) -> Result<(), ProtocolError> {
        let bytes = encode_gmcp(channel, payload)?;
        self.outbound.extend_from_slice(&bytes);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // State handlers
    // -----------------------------------------------------------------------

    fn command(&mut self, b: u8) {
        if b == IAC {
            // Escaped 0xff => literal 0xff.
            self.line.push(IAC);
        } else if let Some(verb) = Verb::from_byte(b) {
            self.state = State::Negotiate(verb);
        } else if b == SB {
            self.state = State::Subnegotiation {
                option: None,
                buf: Vec::new(),
                iac_seen: false,
            };
        } else {
            // NOP, GA, DM and friends carry nothing we use.
            tracing::trace!(command = b, "ignoring two-byte telnet command");
        }
    }

    fn subnegotiation_byte(
        &mut self,
        b: u8,
        option: Option<u8>,
        mut buf: Vec<u8>,
        iac_seen: bool,
        events: &mut Vec<ProtocolEvent>,
    ) {
        let Some(opt) = option else {
            self.state = State::Subnegotiation {
                option: Some(b),
                buf,
                iac_seen: false,
            };
            return;
        };

        if iac_seen {
            match b {
                SE => {
                    self.subnegotiation(TelnetOption::from(opt), buf, events);
                    return;
                }
                IAC => buf.push(IAC),
                other => {
                    tracing::debug!(command = other, "unexpected IAC command inside SB, dropped");
                }
            }
            self.state = State::Subnegotiation {
                option,
                buf,
                iac_seen: false,
            };
            return;
        }

        let iac_seen = b == IAC;
        if !iac_seen {
            buf.push(b);
        }
        self.state = State::Subnegotiation {
            option,
            buf,
            iac_seen,
        };
    }

    fn complete_line(&mut self, events: &mut Vec<ProtocolEvent>) {
        let mut bytes = std::mem::take(&mut self.line);
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        let already_flushed = std::mem::replace(&mut self.partial_flushed, false);
        if already_flushed && bytes.is_empty() {
            return;
        }
        events.push(ProtocolEvent::Line(self.config.charset.decode(&bytes)));
    }

    fn subnegotiation(
        &mut self,
        option: TelnetOption,
        data: Vec<u8>,
        events: &mut Vec<ProtocolEvent>,
    ) {
        match option {
            TelnetOption::Gmcp => {
                if data.is_empty() {
                    tracing::debug!("empty GMCP subnegotiation");
                    return;
                }
                let msg = GmcpMessage::parse(&data);
                tracing::debug!(channel = %msg.channel, "GMCP received");
                events.push(ProtocolEvent::Gmcp(msg));
            }
            TelnetOption::TerminalType => {
                if data.first() == Some(&TTYPE_SEND) {
                    let mut body = vec![TTYPE_IS];
                    body.extend_from_slice(self.config.terminal_type.as_bytes());
                    self.outbound
                        .extend_from_slice(&encode_subnegotiation(option, &body));
                    tracing::debug!(ttype = %self.config.terminal_type, "sent terminal type");
                }
            }
            other => {
                tracing::debug!(option = %other, len = data.len(), "ignoring subnegotiation");
            }
        }
    }

    fn negotiate(&mut self, verb: Verb, option: TelnetOption) {
        let gmcp_before = self.negotiation.gmcp_enabled();

        // An answer to something we asked for is never answered back.
        let answer_to = match verb {
            Verb::Will | Verb::Wont => Verb::Do,
            Verb::Do | Verb::Dont => Verb::Will,
        };
        let is_answer = self.pending.remove(&(answer_to, option));

        match verb {
            Verb::Will if accepts_remote(option) => {
                if self.negotiation.remote.insert(option) && !is_answer {
                    self.reply(Verb::Do, option);
                }
            }
            Verb::Do if accepts_local(option) => {
                if self.negotiation.local.insert(option) && !is_answer {
                    self.reply(Verb::Will, option);
                }
            }
            Verb::Will => self.reply(Verb::Dont, option),
            Verb::Do => self.reply(Verb::Wont, option),
            Verb::Wont => {
                if self.negotiation.remote.remove(&option) && !is_answer {
                    self.reply(Verb::Dont, option);
                }
            }
            Verb::Dont => {
                if self.negotiation.local.remove(&option) && !is_answer {
                    self.reply(Verb::Wont, option);
                }
            }
        }
        tracing::debug!(%verb, %option, is_answer, "negotiation");

        let gmcp_after = self.negotiation.gmcp_enabled();
        if gmcp_after && !gmcp_before {
            self.on_gmcp_enabled();
        } else if gmcp_before && !gmcp_after {
            tracing::info!("GMCP disabled by server");
        }
    }

    fn on_gmcp_enabled(&mut self) {
        tracing::info!("GMCP enabled");
        if self.supports_declared {
            return;
        }
        let hello = json!({
            "client": self.config.client_name,
            "version": self.config.client_version,
        });
        let groups = self.config.channel_groups.clone();
        let result = self
            .queue_gmcp("Core.Hello", Some(&hello))
            .and_then(|()| self.declare_supported(&groups));
        if let Err(e) = result {
            tracing::warn!(error = %e, "could not queue GMCP handshake");
        }
    }

    fn request(&mut self, verb: Verb, option: TelnetOption) {
        self.pending.insert((verb, option));
        self.outbound
            .extend_from_slice(&encode_negotiation(verb, option));
    }

    fn reply(&mut self, verb: Verb, option: TelnetOption) {
        self.outbound
            .extend_from_slice(&encode_negotiation(verb, option));
    }
}

impl Default for ProtocolEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DO, DONT, GA, WILL, WONT, encode_text};
    use serde_json::json;

    const GMCP: u8 = 201;

    fn lines(events: &[ProtocolEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                ProtocolEvent::Line(l) => Some(l.clone()),
                ProtocolEvent::Gmcp(_) => None,
            })
            .collect()
    }

    fn gmcp_frame(body: &[u8]) -> Vec<u8> {
        let mut out = vec![IAC, SB, GMCP];
        out.extend_from_slice(body);
        out.extend_from_slice(&[IAC, SE]);
        out
    }

    #[test]
    fn test_plain_text_lines() {
        let mut engine = ProtocolEngine::default();
        let events = engine.feed(b"hello\r\nworld\n");
        assert_eq!(lines(&events), vec!["hello", "world"]);
        assert!(!engine.has_partial());
    }

    #[test]
    fn test_text_buffered_until_newline() {
        let mut engine = ProtocolEngine::default();
        assert!(engine.feed(b"You are in").is_empty());
        let events = engine.feed(b" a desert.\n");
        assert_eq!(lines(&events), vec!["You are in a desert."]);
    }

    #[test]
    fn test_empty_lines_are_preserved() {
        let mut engine = ProtocolEngine::default();
        let events = engine.feed(b"a\n\nb\n");
        assert_eq!(lines(&events), vec!["a", "", "b"]);
    }

    #[test]
    fn test_escaped_iac_is_literal_in_text() {
        let mut engine = ProtocolEngine::new(EngineConfig {
            charset: Charset::Latin1,
            ..EngineConfig::default()
        });
        let events = engine.feed(&[b'a', IAC, IAC, b'b', b'\n']);
        assert_eq!(lines(&events), vec!["a\u{ff}b"]);
    }

    #[test]
    fn test_escape_round_trip_through_encoder() {
        let config = EngineConfig {
            charset: Charset::Latin1,
            ..EngineConfig::default()
        };
        let mut engine = ProtocolEngine::new(config);
        let text = "\u{ff}\u{ff} spice \u{ff}";
        let events = engine.feed(&encode_text(text, Charset::Latin1));
        assert_eq!(lines(&events), vec![text]);
    }

    #[test]
    fn test_two_byte_commands_are_skipped() {
        let mut engine = ProtocolEngine::default();
        let events = engine.feed(&[b'>', IAC, GA, b' ', IAC, 241, b'\n']);
        assert_eq!(lines(&events), vec!["> "]);
        assert!(!engine.has_outbound());
    }

    #[test]
    fn test_will_gmcp_enables_and_declares_groups_once() {
        let mut engine = ProtocolEngine::default();
        engine.feed(&[IAC, WILL, GMCP]);
        assert!(engine.gmcp_enabled());

        let out = engine.take_outbound();
        assert!(out.starts_with(&[IAC, DO, GMCP]));
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("Core.Hello"));
        assert!(text.contains(r#"Core.Supports.Set ["Char 1","Room 1","Comm.Channel 1","Guild 1"]"#));

        // A second WILL changes nothing and sends nothing.
        engine.feed(&[IAC, WILL, GMCP]);
        assert!(engine.take_outbound().is_empty());
    }

    #[test]
    fn test_do_gmcp_answers_will() {
        let mut engine = ProtocolEngine::default();
        engine.feed(&[IAC, DO, GMCP]);
        assert!(engine.gmcp_enabled());
        assert!(engine.negotiation().is_local(TelnetOption::Gmcp));
        let out = engine.take_outbound();
        assert!(out.starts_with(&[IAC, WILL, GMCP]));
    }

    #[test]
    fn test_negotiation_idempotence() {
        let mut once = ProtocolEngine::default();
        once.feed(&[IAC, WILL, 1]);

        let mut twice = ProtocolEngine::default();
        twice.feed(&[IAC, WILL, 1]);
        twice.feed(&[IAC, WILL, 1]);

        assert_eq!(once.negotiation(), twice.negotiation());
        assert_eq!(once.take_outbound(), twice.take_outbound());
    }

    #[test]
    fn test_start_suppresses_reply_to_answers() {
        let mut engine = ProtocolEngine::default();
        engine.start();
        assert_eq!(
            engine.take_outbound(),
            vec![IAC, WILL, GMCP, IAC, DO, GMCP]
        );

        // Server answers our DO with WILL: no DO back, but the handshake goes out.
        engine.feed(&[IAC, WILL, GMCP]);
        let out = engine.take_outbound();
        assert!(!out.starts_with(&[IAC, DO, GMCP]));
        assert!(String::from_utf8_lossy(&out).contains("Core.Supports.Set"));

        // Server declines our WILL: GMCP stays on through the remote side.
        engine.feed(&[IAC, DONT, GMCP]);
        assert!(engine.gmcp_enabled());
        assert!(engine.take_outbound().is_empty());
    }

    #[test]
    fn test_wont_gmcp_disables() {
        let mut engine = ProtocolEngine::default();
        engine.feed(&[IAC, WILL, GMCP]);
        engine.take_outbound();
        engine.feed(&[IAC, WONT, GMCP]);
        assert!(!engine.gmcp_enabled());
        assert_eq!(engine.take_outbound(), vec![IAC, DONT, GMCP]);
    }

    #[test]
    fn test_reenabled_gmcp_does_not_redeclare() {
        let mut engine = ProtocolEngine::default();
        engine.feed(&[IAC, WILL, GMCP, IAC, WONT, GMCP]);
        engine.take_outbound();
        engine.feed(&[IAC, WILL, GMCP]);
        assert!(engine.gmcp_enabled());
        assert_eq!(engine.take_outbound(), vec![IAC, DO, GMCP]);
    }

    #[test]
    fn test_echo_negotiation() {
        let mut engine = ProtocolEngine::default();
        assert!(engine.negotiation().local_echo());

        engine.feed(&[IAC, WILL, 1]);
        assert!(!engine.negotiation().local_echo());
        assert_eq!(engine.take_outbound(), vec![IAC, DO, 1]);

        engine.feed(&[IAC, WONT, 1]);
        assert!(engine.negotiation().local_echo());
        assert_eq!(engine.take_outbound(), vec![IAC, DONT, 1]);
    }

    #[test]
    fn test_sga_accepted() {
        let mut engine = ProtocolEngine::default();
        engine.feed(&[IAC, WILL, 3]);
        assert!(engine.negotiation().suppress_go_ahead());
        assert_eq!(engine.take_outbound(), vec![IAC, DO, 3]);
    }

    #[test]
    fn test_unknown_options_are_refused() {
        let mut engine = ProtocolEngine::default();
        engine.feed(&[IAC, DO, 31, IAC, WILL, 86]);
        assert_eq!(
            engine.take_outbound(),
            vec![IAC, WONT, 31, IAC, DONT, 86]
        );
        assert!(!engine.negotiation().is_local(TelnetOption::Naws));

        // WONT/DONT for options that were never on: silence.
        engine.feed(&[IAC, WONT, 86, IAC, DONT, 31]);
        assert!(engine.take_outbound().is_empty());
    }

    #[test]
    fn test_terminal_type_exchange() {
        let mut engine = ProtocolEngine::default();
        engine.feed(&[IAC, DO, 24]);
        assert!(engine.negotiation().terminal_type());
        assert_eq!(engine.take_outbound(), vec![IAC, WILL, 24]);

        engine.feed(&[IAC, SB, 24, 1, IAC, SE]);
        let mut expected = vec![IAC, SB, 24, 0];
        expected.extend_from_slice(b"XTERM-256COLOR");
        expected.extend_from_slice(&[IAC, SE]);
        assert_eq!(engine.take_outbound(), expected);
    }

    #[test]
    fn test_gmcp_subnegotiation_event() {
        let mut engine = ProtocolEngine::default();
        let mut bytes = b"before\n".to_vec();
        bytes.extend(gmcp_frame(br#"Char.Vitals {"hp":50}"#));
        bytes.extend_from_slice(b"after\n");

        let events = engine.feed(&bytes);
        assert_eq!(
            events,
            vec![
                ProtocolEvent::Line("before".into()),
                ProtocolEvent::Gmcp(GmcpMessage::new(
                    "Char.Vitals",
                    Some(json!({"hp": 50}))
                )),
                ProtocolEvent::Line("after".into()),
            ]
        );
    }

    #[test]
    fn test_gmcp_does_not_break_surrounding_line() {
        let mut engine = ProtocolEngine::default();
        let mut bytes = b"half ".to_vec();
        bytes.extend(gmcp_frame(b"Core.Ping"));
        bytes.extend_from_slice(b"line\n");
        let events = engine.feed(&bytes);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            ProtocolEvent::Gmcp(GmcpMessage::new("Core.Ping", None))
        );
        assert_eq!(events[1], ProtocolEvent::Line("half line".into()));
    }

    #[test]
    fn test_escaped_iac_inside_subnegotiation() {
        let mut engine = ProtocolEngine::default();
        let events = engine.feed(&[IAC, SB, 99, b'x', IAC, IAC, b'y', IAC, SE, b'z', b'\n']);
        // Unknown option payload is dropped, text afterwards decodes normally.
        assert_eq!(lines(&events), vec!["z"]);
    }

    #[test]
    fn test_malformed_gmcp_resyncs() {
        let mut engine = ProtocolEngine::default();
        let mut bytes = gmcp_frame(b"Char.Vitals {broken");
        bytes.extend(gmcp_frame(br#"Char.Vitals {"hp":1}"#));
        let events = engine.feed(&bytes);
        assert_eq!(
            events,
            vec![
                ProtocolEvent::Gmcp(GmcpMessage::new("Char.Vitals", None)),
                ProtocolEvent::Gmcp(GmcpMessage::new(
                    "Char.Vitals",
                    Some(json!({"hp": 1}))
                )),
            ]
        );
    }

    #[test]
    fn test_split_negotiation_across_feeds() {
        let mut engine = ProtocolEngine::default();
        assert!(engine.feed(&[IAC]).is_empty());
        assert!(engine.feed(&[DO]).is_empty());
        assert!(!engine.has_outbound());
        engine.feed(&[7]);
        assert_eq!(engine.take_outbound(), vec![IAC, WONT, 7]);
    }

    #[test]
    fn test_flush_partial_prompt_once() {
        let mut engine = ProtocolEngine::default();
        engine.feed(b"Login: ");
        assert_eq!(engine.flush_partial(), Some("Login: ".to_string()));
        assert_eq!(engine.flush_partial(), None);

        // The newline that finally ends the prompt line is not a second copy.
        assert!(engine.feed(b"\n").is_empty());
        assert_eq!(lines(&engine.feed(b"next\n")), vec!["next"]);
    }

    #[test]
    fn test_flush_partial_then_rest_of_line() {
        let mut engine = ProtocolEngine::default();
        engine.feed(b"HP: 100 ");
        assert_eq!(engine.flush_partial().as_deref(), Some("HP: 100 "));
        let events = engine.feed(b"SP: 50\n");
        assert_eq!(lines(&events), vec!["SP: 50"]);
    }

    #[test]
    fn test_flush_partial_keeps_split_utf8_tail() {
        let mut engine = ProtocolEngine::default();
        let bytes = "caf\u{e9}".as_bytes();
        engine.feed(&bytes[..bytes.len() - 1]);
        assert_eq!(engine.flush_partial().as_deref(), Some("caf"));
        engine.feed(&bytes[bytes.len() - 1..]);
        assert_eq!(engine.flush_partial().as_deref(), Some("\u{e9}"));
    }

    #[test]
    fn test_nul_padding_is_dropped() {
        let mut engine = ProtocolEngine::default();
        let events = engine.feed(b"a\r\0b\n");
        assert_eq!(lines(&events), vec!["a\rb"]);
    }

    #[test]
    fn test_declare_supported_explicitly() {
        let mut engine = ProtocolEngine::default();
        engine
            .declare_supported(&["IRE.Rift".to_string()])
            .expect("valid groups");
        let out = engine.take_outbound();
        assert!(String::from_utf8_lossy(&out).contains(r#"Core.Supports.Set ["IRE.Rift 1"]"#));

        // Handshake already declared: activation only sends DO.
        engine.feed(&[IAC, WILL, GMCP]);
        assert_eq!(engine.take_outbound(), vec![IAC, DO, GMCP]);
    }
}
