//! Fuzz-style property tests for the relay codec
//!
//! Decoders must reject arbitrary relay input with an error, never a panic.

use proptest::prelude::*;
use wayfarer_net::{
    decode_envelope, decode_server_message, encode_client_message, ClientMessage, MessageType,
    PlayerMove, ServerMessage, WireVec2,
};

proptest! {
    /// Property: Arbitrary text doesn't crash the decoder
    #[test]
    fn arbitrary_text_doesnt_crash(text in ".{0,512}") {
        let _result = decode_server_message(&text);
    }

    /// Property: Arbitrary JSON payloads under a known type never panic
    #[test]
    fn arbitrary_payload_doesnt_crash(
        kind in prop_oneof![
            Just("player_update"),
            Just("entity_update"),
            Just("chat"),
            Just("pong"),
            Just("zone_change"),
        ],
        x in any::<i64>(),
        label in "[a-z]{0,12}",
    ) {
        let text = format!(
            r#"{{"type":"{kind}","data":{{"id":"{label}","position":{{"x":{x},"y":"{label}"}},"message":{x}}},"timestamp":0}}"#
        );
        let _result = decode_server_message(&text);
    }

    /// Property: Outbound moves are readable by the relay's envelope parser
    #[test]
    fn outbound_moves_parse_as_envelopes(
        x in -1.0e6f32..1.0e6,
        y in -1.0e6f32..1.0e6,
        rotation in -3.2f32..3.2,
        timestamp in any::<u64>(),
    ) {
        let msg = ClientMessage::PlayerMove(PlayerMove {
            position: WireVec2 { x, y },
            velocity: WireVec2::default(),
            rotation,
        });
        let text = encode_client_message(&msg, timestamp, Some("local")).unwrap();
        let envelope = decode_envelope(&text).unwrap();
        prop_assert_eq!(envelope.kind, MessageType::PlayerMove);
        prop_assert_eq!(envelope.timestamp, timestamp);
        prop_assert_eq!(envelope.player_id.as_deref(), Some("local"));
    }
}

#[test]
fn pong_needs_no_payload() {
    assert_eq!(
        decode_server_message(r#"{"type":"pong","timestamp":9}"#).unwrap(),
        ServerMessage::Pong
    );
}
