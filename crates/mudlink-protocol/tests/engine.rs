//! Integration tests for the protocol engine: chunking, negotiation, GMCP.

use mudlink_protocol::{
    Charset, DO, EngineConfig, GmcpMessage, IAC, ProtocolEngine, ProtocolEvent, SB, SE, WILL,
    WONT, encode_gmcp, encode_text,
};
use serde_json::json;

const GMCP: u8 = 201;

// =========================================================================
// A realistic login burst: negotiation, banner, GMCP, prompt.
// =========================================================================

fn login_burst() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&[IAC, WILL, GMCP, IAC, WILL, 1, IAC, DO, 24, IAC, DO, 31]);
    bytes.extend_from_slice(b"Welcome to the Dunes!\r\n");
    bytes.extend_from_slice(&[IAC, SB, 24, 1, IAC, SE]);
    bytes.extend(
        encode_gmcp("Char.Vitals", Some(&json!({"hp": 120, "maxhp": 150}))).expect("encodes"),
    );
    bytes.extend_from_slice(b"Price of spice: ");
    bytes.extend_from_slice(&[IAC, IAC]);
    bytes.extend_from_slice(b" credits\r\n");
    bytes.extend(encode_gmcp("Core.Ping", None).expect("encodes"));
    bytes.extend_from_slice(b"\r\n");
    bytes
}

fn run(chunks: &[&[u8]]) -> (Vec<ProtocolEvent>, Vec<u8>) {
    let mut engine = ProtocolEngine::new(EngineConfig {
        charset: Charset::Latin1,
        ..EngineConfig::default()
    });
    let mut events = Vec::new();
    let mut outbound = Vec::new();
    for chunk in chunks {
        events.extend(engine.feed(chunk));
        outbound.extend(engine.take_outbound());
    }
    (events, outbound)
}

#[test]
fn test_login_burst_decodes() {
    let bytes = login_burst();
    let (events, outbound) = run(&[&bytes]);

    assert_eq!(
        events,
        vec![
            ProtocolEvent::Line("Welcome to the Dunes!".into()),
            ProtocolEvent::Gmcp(GmcpMessage::new(
                "Char.Vitals",
                Some(json!({"hp": 120, "maxhp": 150}))
            )),
            ProtocolEvent::Line("Price of spice: \u{ff} credits".into()),
            ProtocolEvent::Gmcp(GmcpMessage::new("Core.Ping", None)),
            ProtocolEvent::Line(String::new()),
        ]
    );

    // DO GMCP, the GMCP handshake, DO ECHO, WILL TTYPE, WONT NAWS, TTYPE IS.
    assert!(outbound.starts_with(&[IAC, DO, GMCP]));
    let windows = |needle: &[u8]| outbound.windows(needle.len()).any(|w| w == needle);
    assert!(windows(&[IAC, DO, 1]));
    assert!(windows(&[IAC, WILL, 24]));
    assert!(windows(&[IAC, WONT, 31]));
    assert!(windows(b"XTERM-256COLOR"));
    assert!(windows(b"Core.Supports.Set"));
}

#[test]
fn test_partial_delivery_every_split_point() {
    let bytes = login_burst();
    let (whole_events, whole_out) = run(&[&bytes]);

    for split in 0..=bytes.len() {
        let (a, b) = bytes.split_at(split);
        let (events, out) = run(&[a, b]);
        assert_eq!(events, whole_events, "events differ at split {split}");
        assert_eq!(out, whole_out, "outbound differs at split {split}");
    }
}

#[test]
fn test_byte_at_a_time_delivery() {
    let bytes = login_burst();
    let (whole_events, whole_out) = run(&[&bytes]);

    let singles: Vec<&[u8]> = bytes.chunks(1).collect();
    let (events, out) = run(&singles);
    assert_eq!(events, whole_events);
    assert_eq!(out, whole_out);
}

#[test]
fn test_three_way_splits_inside_subnegotiation() {
    let frame = encode_gmcp("Room.Info", Some(&json!({"num": 7, "name": "Dune"}))).expect("encodes");
    let (whole, _) = run(&[&frame]);
    assert_eq!(whole.len(), 1);

    for i in 1..frame.len() {
        for j in i..frame.len() {
            let (events, _) = run(&[&frame[..i], &frame[i..j], &frame[j..]]);
            assert_eq!(events, whole, "split at {i}/{j}");
        }
    }
}

// =========================================================================
// Negotiation
// =========================================================================

#[test]
fn test_repeated_negotiation_is_idempotent() {
    let mut engine = ProtocolEngine::default();
    let offer = [IAC, WILL, GMCP, IAC, WILL, 3, IAC, DO, 24];

    engine.feed(&offer);
    let first = engine.take_outbound();
    let state = engine.negotiation().clone();

    engine.feed(&offer);
    assert!(engine.take_outbound().is_empty());
    assert_eq!(engine.negotiation(), &state);
    assert!(!first.is_empty());
}

#[test]
fn test_supports_set_sent_once_across_reenables() {
    let mut engine = ProtocolEngine::default();
    engine.start();
    for _ in 0..3 {
        engine.feed(&[IAC, WILL, GMCP]);
        engine.feed(&[IAC, WONT, GMCP]);
    }
    engine.feed(&[IAC, DO, GMCP]);

    let out = engine.take_outbound();
    let text = String::from_utf8_lossy(&out);
    assert_eq!(text.matches("Core.Supports.Set").count(), 1);
    assert_eq!(text.matches("Core.Hello").count(), 1);
}

#[test]
fn test_unknown_option_refused_every_time() {
    let mut engine = ProtocolEngine::default();
    engine.feed(&[IAC, DO, 42]);
    engine.feed(&[IAC, DO, 42]);
    assert_eq!(
        engine.take_outbound(),
        vec![IAC, WONT, 42, IAC, WONT, 42]
    );
}

// =========================================================================
// GMCP channel splitting
// =========================================================================

#[test]
fn test_gmcp_channel_split_examples() {
    let cases: &[(&[u8], &str, Option<serde_json::Value>)] = &[
        (b"Core.Ping", "Core.Ping", None),
        (b"Core.Ping ", "Core.Ping", None),
        (br#"Char.Name {"name":"Paul"}"#, "Char.Name", Some(json!({"name": "Paul"}))),
        (br#"Comm.Channel.Text {"text":"a b c"}"#, "Comm.Channel.Text", Some(json!({"text": "a b c"}))),
        (b"Char.Vitals not-json", "Char.Vitals", None),
        (b"Room.Players []", "Room.Players", Some(json!([]))),
    ];

    for (body, channel, payload) in cases {
        let mut bytes = vec![IAC, SB, GMCP];
        bytes.extend_from_slice(body);
        bytes.extend_from_slice(&[IAC, SE]);

        let mut engine = ProtocolEngine::default();
        let events = engine.feed(&bytes);
        assert_eq!(
            events,
            vec![ProtocolEvent::Gmcp(GmcpMessage::new(*channel, payload.clone()))],
            "body {:?}",
            String::from_utf8_lossy(body)
        );
    }
}

#[test]
fn test_gmcp_payload_with_escaped_iac() {
    // Doubled IAC inside the body is unescaped before the JSON parse.
    let mut bytes = vec![IAC, SB, GMCP];
    bytes.extend_from_slice(b"X.Raw \"");
    bytes.extend_from_slice(&[IAC, IAC]);
    bytes.extend_from_slice(b"\"");
    bytes.extend_from_slice(&[IAC, SE]);

    let mut engine = ProtocolEngine::default();
    let events = engine.feed(&bytes);
    match events.as_slice() {
        [ProtocolEvent::Gmcp(msg)] => assert_eq!(msg.channel, "X.Raw"),
        other => panic!("unexpected events: {other:?}"),
    }
}

// =========================================================================
// Text
// =========================================================================

#[test]
fn test_latin1_escape_round_trip() {
    let mut engine = ProtocolEngine::new(EngineConfig {
        charset: Charset::Latin1,
        ..EngineConfig::default()
    });
    let original = "\u{ff}start \u{ff}\u{ff} end\u{ff}";
    let events = engine.feed(&encode_text(original, Charset::Latin1));
    assert_eq!(events, vec![ProtocolEvent::Line(original.into())]);
}

#[test]
fn test_utf8_line_split_mid_character() {
    let text = "Caf\u{e9} on Arrakis\n";
    let bytes = text.as_bytes();
    for split in 0..=bytes.len() {
        let mut engine = ProtocolEngine::default();
        let mut events = engine.feed(&bytes[..split]);
        events.extend(engine.feed(&bytes[split..]));
        assert_eq!(events, vec![ProtocolEvent::Line("Caf\u{e9} on Arrakis".into())]);
    }
}

#[test]
fn test_prompt_flush_not_duplicated() {
    let mut engine = ProtocolEngine::default();
    assert!(engine.feed(b"Password: ").is_empty());
    assert_eq!(engine.flush_partial().as_deref(), Some("Password: "));

    // The server echoes nothing and then ends the prompt line.
    let events = engine.feed(b"\r\nWelcome back.\r\n");
    assert_eq!(events, vec![ProtocolEvent::Line("Welcome back.".into())]);
    assert_eq!(engine.flush_partial(), None);
}
