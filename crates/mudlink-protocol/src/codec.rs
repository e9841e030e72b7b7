//! Outbound encoding: escaping, text lines, negotiation triples, GMCP.
//!
//! Everything here is a pure function from values to wire bytes. The
//! engine uses the same functions for its own replies, so there is
//! exactly one place that knows how a subnegotiation envelope looks.

use serde_json::Value;

use crate::{ProtocolError, TelnetOption, Verb};

/// Interpret As Command: the escape byte.
pub const IAC: u8 = 255;
/// Negotiation verb: refuse an option on the sender's side.
pub const DONT: u8 = 254;
/// Negotiation verb: ask the peer to enable an option.
pub const DO: u8 = 253;
/// Negotiation verb: refuse to enable an option locally.
pub const WONT: u8 = 252;
/// Negotiation verb: offer to enable an option locally.
pub const WILL: u8 = 251;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Go ahead.
pub const GA: u8 = 249;
/// No operation.
pub const NOP: u8 = 241;
/// Subnegotiation end.
pub const SE: u8 = 240;

/// `TTYPE IS` marker inside a terminal-type subnegotiation.
pub(crate) const TTYPE_IS: u8 = 0;
/// `TTYPE SEND` marker inside a terminal-type subnegotiation.
pub(crate) const TTYPE_SEND: u8 = 1;

/// How text bytes map to `char`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// UTF-8; invalid sequences decode to U+FFFD.
    #[default]
    Utf8,
    /// ISO-8859-1: every byte is the code point of the same value.
    Latin1,
}

impl Charset {
    /// Decodes one line's worth of bytes.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }

    /// Encodes text. Characters outside Latin-1 become `?` in that mode.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }

    /// Length of the prefix of `bytes` that can be decoded without
    /// splitting a multi-byte character.
    pub(crate) fn complete_prefix(self, bytes: &[u8]) -> usize {
        match self {
            Self::Latin1 => bytes.len(),
            Self::Utf8 => match std::str::from_utf8(bytes) {
                Ok(_) => bytes.len(),
                // `error_len() == None` means the input ended mid-character.
                Err(e) if e.error_len().is_none() => e.valid_up_to(),
                Err(_) => bytes.len(),
            },
        }
    }
}

/// Doubles every `IAC` byte so it is read back as a literal.
pub fn escape_iac(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 2);
    for &b in data {
        out.push(b);
        if b == IAC {
            out.push(IAC);
        }
    }
    out
}

/// Encodes a command line: charset-encoded, `IAC`-escaped, and terminated
/// with `\r\n` unless it already ends in `\n`.
pub fn encode_text(text: &str, charset: Charset) -> Vec<u8> {
    let mut data = escape_iac(&charset.encode(text));
    if !data.ends_with(b"\n") {
        data.extend_from_slice(b"\r\n");
    }
    data
}

/// Encodes a negotiation triple: `IAC <verb> <option>`.
pub fn encode_negotiation(verb: Verb, option: TelnetOption) -> [u8; 3] {
    [IAC, verb.as_byte(), option.as_byte()]
}

/// Wraps `payload` in `IAC SB <option> ... IAC SE`, escaping the body.
pub fn encode_subnegotiation(option: TelnetOption, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 5);
    out.extend_from_slice(&[IAC, SB, option.as_byte()]);
    out.extend_from_slice(&escape_iac(payload));
    out.extend_from_slice(&[IAC, SE]);
    out
}

/// Encodes a GMCP message: `IAC SB GMCP <channel> <json> IAC SE`.
///
/// A `None` payload sends the bare channel name.
///
/// # Errors
/// Returns `ProtocolError::InvalidMessage` if `channel` is empty or
/// contains whitespace (the receiver splits on the first space).
pub fn encode_gmcp(
    channel: &str,
    payload: Option<&Value>,
) -> Result<Vec<u8>, ProtocolError> {
    if channel.is_empty() || channel.contains(char::is_whitespace) {
        return Err(ProtocolError::InvalidMessage(format!(
            "invalid GMCP channel name {channel:?}"
        )));
    }

    let mut body = channel.as_bytes().to_vec();
    if let Some(value) = payload {
        body.push(b' ');
        let json = serde_json::to_vec(value).map_err(ProtocolError::Encode)?;
        body.extend_from_slice(&json);
    }
    Ok(encode_subnegotiation(TelnetOption::Gmcp, &body))
}

/// Serializes any `Serialize` value and encodes it as GMCP.
///
/// # Errors
/// `ProtocolError::Encode` if `payload` cannot be represented as JSON,
/// plus everything [`encode_gmcp`] can return.
pub fn encode_gmcp_value<T: serde::Serialize>(
    channel: &str,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let value = serde_json::to_value(payload).map_err(ProtocolError::Encode)?;
    encode_gmcp(channel, Some(&value))
}
