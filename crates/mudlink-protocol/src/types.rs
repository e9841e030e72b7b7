//! Protocol types: telnet options and verbs, GMCP messages, decoded events.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Telnet vocabulary
// ---------------------------------------------------------------------------

/// A telnet option code.
///
/// Only the options the engine actually reacts to get a named variant;
/// everything else is carried as `Other` and refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelnetOption {
    /// Remote echo (1).
    Echo,
    /// Suppress go-ahead (3).
    SuppressGoAhead,
    /// Terminal type (24).
    TerminalType,
    /// Window size (31). Known but not supported.
    Naws,
    /// Generic MUD Communication Protocol (201).
    Gmcp,
    /// Any other option code.
    Other(u8),
}

impl TelnetOption {
    /// Returns the wire byte for this option.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Echo => 1,
            Self::SuppressGoAhead => 3,
            Self::TerminalType => 24,
            Self::Naws => 31,
            Self::Gmcp => 201,
            Self::Other(b) => b,
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(b: u8) -> Self {
        match b {
            1 => Self::Echo,
            3 => Self::SuppressGoAhead,
            24 => Self::TerminalType,
            31 => Self::Naws,
            201 => Self::Gmcp,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Echo => write!(f, "ECHO"),
            Self::SuppressGoAhead => write!(f, "SGA"),
            Self::TerminalType => write!(f, "TTYPE"),
            Self::Naws => write!(f, "NAWS"),
            Self::Gmcp => write!(f, "GMCP"),
            Self::Other(b) => write!(f, "OPT-{b}"),
        }
    }
}

/// One of the four negotiation verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Will,
    Wont,
    Do,
    Dont,
}

impl Verb {
    /// Parses a verb byte (251..=254).
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            crate::WILL => Some(Self::Will),
            crate::WONT => Some(Self::Wont),
            crate::DO => Some(Self::Do),
            crate::DONT => Some(Self::Dont),
            _ => None,
        }
    }

    /// Returns the wire byte for this verb.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Will => crate::WILL,
            Self::Wont => crate::WONT,
            Self::Do => crate::DO,
            Self::Dont => crate::DONT,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Will => write!(f, "WILL"),
            Self::Wont => write!(f, "WONT"),
            Self::Do => write!(f, "DO"),
            Self::Dont => write!(f, "DONT"),
        }
    }
}

// ---------------------------------------------------------------------------
// GMCP
// ---------------------------------------------------------------------------

/// The GMCP channels we know how to route.
///
/// The set of channel names a server sends is fixed by the game, so
/// dispatch is a `match` over this enum rather than string comparisons
/// scattered through the code. Anything unrecognised lands in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    CoreHello,
    CoreSupportsSet,
    CoreGoodbye,
    CharName,
    CharVitals,
    CharStats,
    CharMaxStats,
    CharStatus,
    RoomInfo,
    CommChannelList,
    CommChannelText,
    /// `Guild.<sub>`; carries the part after the prefix.
    Guild(String),
    Other(String),
}

impl Channel {
    /// Maps a wire channel name to its variant.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Core.Hello" => Self::CoreHello,
            "Core.Supports.Set" => Self::CoreSupportsSet,
            "Core.Goodbye" => Self::CoreGoodbye,
            "Char.Name" => Self::CharName,
            "Char.Vitals" => Self::CharVitals,
            "Char.Stats" => Self::CharStats,
            "Char.MaxStats" => Self::CharMaxStats,
            "Char.Status" => Self::CharStatus,
            "Room.Info" => Self::RoomInfo,
            "Comm.Channel.List" => Self::CommChannelList,
            "Comm.Channel.Text" => Self::CommChannelText,
            other => match other.strip_prefix("Guild.") {
                Some(sub) => Self::Guild(sub.to_string()),
                None => Self::Other(other.to_string()),
            },
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoreHello => write!(f, "Core.Hello"),
            Self::CoreSupportsSet => write!(f, "Core.Supports.Set"),
            Self::CoreGoodbye => write!(f, "Core.Goodbye"),
            Self::CharName => write!(f, "Char.Name"),
            Self::CharVitals => write!(f, "Char.Vitals"),
            Self::CharStats => write!(f, "Char.Stats"),
            Self::CharMaxStats => write!(f, "Char.MaxStats"),
            Self::CharStatus => write!(f, "Char.Status"),
            Self::RoomInfo => write!(f, "Room.Info"),
            Self::CommChannelList => write!(f, "Comm.Channel.List"),
            Self::CommChannelText => write!(f, "Comm.Channel.Text"),
            Self::Guild(sub) => write!(f, "Guild.{sub}"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A decoded GMCP message: `<channel> <json>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmcpMessage {
    /// Dotted channel name, e.g. `Char.Vitals`.
    pub channel: String,
    /// The JSON body, or `None` when the message was a bare channel name
    /// or its body could not be parsed.
    pub payload: Option<Value>,
}

impl GmcpMessage {
    /// Creates a message from its parts.
    pub fn new(channel: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            channel: channel.into(),
            payload,
        }
    }

    /// Parses the body of a GMCP subnegotiation (the bytes after the
    /// option byte). Never fails.
    ///
    /// The channel name ends at the first space; everything after it is
    /// JSON. A body that is not valid JSON is logged and dropped.
    pub fn parse(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let (channel, body) = match text.split_once(' ') {
            Some((channel, body)) => (channel, body.trim()),
            None => (text.as_ref(), ""),
        };

        let payload = if body.is_empty() {
            None
        } else {
            match serde_json::from_str::<Value>(body) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(
                        channel,
                        error = %e,
                        "malformed GMCP payload, treating as absent"
                    );
                    None
                }
            }
        };

        Self::new(channel, payload)
    }

    /// Returns the routing variant for this message's channel.
    pub fn kind(&self) -> Channel {
        Channel::from_name(&self.channel)
    }

    /// Deserializes the payload into `T`.
    ///
    /// Returns `Ok(None)` when there is no payload.
    pub fn payload_as<T: DeserializeOwned>(
        &self,
    ) -> Result<Option<T>, ProtocolError> {
        match &self.payload {
            None => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(ProtocolError::Decode),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What the engine hands back after consuming bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    /// A complete line of text, without its terminator.
    Line(String),
    /// A message from the GMCP side-channel.
    Gmcp(GmcpMessage),
}
