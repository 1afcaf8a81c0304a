//! JSON encoding and decoding of [`Envelope`]s.

use crate::protocol::{
    ChatLine, ClientMessage, Envelope, MessageType, ServerMessage, MAX_CHAT_LEN,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

/// Wire decoding and encoding failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Text is not a valid envelope.
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    /// Envelope is valid but its payload does not match its type.
    #[error("malformed {kind:?} payload: {source}")]
    Payload {
        /// Envelope type.
        kind: MessageType,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Chat line longer than [`MAX_CHAT_LEN`].
    #[error("chat message too long: {len} characters (max {MAX_CHAT_LEN})")]
    ChatTooLong {
        /// Length in characters.
        len: usize,
    },
    /// Serialization failed.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

fn payload<T: DeserializeOwned>(kind: MessageType, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::Payload { kind, source })
}

fn check_chat(line: &ChatLine) -> Result<(), ProtocolError> {
    let len = line.message.chars().count();
    if len > MAX_CHAT_LEN {
        return Err(ProtocolError::ChatTooLong { len });
    }
    Ok(())
}

/// Wrap `msg` in an envelope stamped with `timestamp` and `player_id`.
pub fn envelope_client_message(
    msg: &ClientMessage,
    timestamp: u64,
    player_id: Option<&str>,
) -> Result<Envelope, ProtocolError> {
    let data = match msg {
        ClientMessage::PlayerMove(m) => serde_json::to_value(m),
        ClientMessage::PlayerAttack(a) => serde_json::to_value(a),
        ClientMessage::Chat(line) => {
            check_chat(line)?;
            serde_json::to_value(line)
        }
        ClientMessage::Ping => Ok(Value::Object(Default::default())),
    }
    .map_err(ProtocolError::Encode)?;

    Ok(Envelope {
        kind: msg.kind(),
        data,
        timestamp,
        player_id: player_id.map(str::to_owned),
    })
}

/// Encode `msg` as a JSON text frame.
pub fn encode_client_message(
    msg: &ClientMessage,
    timestamp: u64,
    player_id: Option<&str>,
) -> Result<String, ProtocolError> {
    let envelope = envelope_client_message(msg, timestamp, player_id)?;
    serde_json::to_string(&envelope).map_err(ProtocolError::Encode)
}

/// Parse a JSON text frame into an envelope.
pub fn decode_envelope(text: &str) -> Result<Envelope, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Envelope)
}

/// Interpret an inbound envelope.
pub fn server_message_from_envelope(envelope: Envelope) -> Result<ServerMessage, ProtocolError> {
    let kind = envelope.kind;
    let msg = match kind {
        MessageType::PlayerUpdate => ServerMessage::PlayerUpdate(payload(kind, envelope.data)?),
        MessageType::EntityUpdate => ServerMessage::EntityUpdate(payload(kind, envelope.data)?),
        MessageType::Chat => {
            let line: ChatLine = payload(kind, envelope.data)?;
            check_chat(&line)?;
            ServerMessage::Chat(line)
        }
        MessageType::Pong => ServerMessage::Pong,
        _ => {
            trace!(?kind, "Passing through opaque message");
            ServerMessage::Opaque(envelope)
        }
    };
    Ok(msg)
}

/// Decode a JSON text frame from the relay.
pub fn decode_server_message(text: &str) -> Result<ServerMessage, ProtocolError> {
    server_message_from_envelope(decode_envelope(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AttackRoll, PlayerAttack, PlayerMove, WireVec2};
    use serde_json::json;

    #[test]
    fn player_move_wire_shape() {
        let msg = ClientMessage::PlayerMove(PlayerMove {
            position: WireVec2 { x: 1.5, y: -2.0 },
            velocity: WireVec2 { x: 3.0, y: 0.0 },
            rotation: 0.0,
        });
        let text = encode_client_message(&msg, 1_700_000_000_000, Some("p-1")).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "player_move",
                "data": {
                    "position": {"x": 1.5, "y": -2.0},
                    "velocity": {"x": 3.0, "y": 0.0},
                    "rotation": 0.0
                },
                "timestamp": 1_700_000_000_000u64,
                "playerId": "p-1"
            })
        );
    }

    #[test]
    fn anonymous_ping_omits_player_id() {
        let text = encode_client_message(&ClientMessage::Ping, 5, None).unwrap();
        assert_eq!(text, r#"{"type":"ping","data":{},"timestamp":5}"#);
    }

    #[test]
    fn attack_payload_uses_camel_case_flag() {
        let msg = ClientMessage::PlayerAttack(PlayerAttack {
            attack: AttackRoll {
                damage: 22.5,
                is_critical: true,
            },
            target: "#7".into(),
        });
        let env = envelope_client_message(&msg, 0, None).unwrap();
        assert_eq!(env.kind, MessageType::PlayerAttack);
        assert_eq!(env.data["attack"]["isCritical"], json!(true));
        assert_eq!(env.data["target"], json!("#7"));
    }

    #[test]
    fn decodes_entity_update_with_missing_velocity() {
        let msg = decode_server_message(
            r#"{"type":"entity_update","data":{"id":"e9","position":{"x":4,"y":5}},"timestamp":1}"#,
        )
        .unwrap();
        match msg {
            ServerMessage::EntityUpdate(snap) => {
                assert_eq!(snap.id, "e9");
                assert_eq!(snap.position, WireVec2 { x: 4.0, y: 5.0 });
                assert_eq!(snap.velocity, WireVec2::default());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_kinds_pass_through() {
        let msg = decode_server_message(
            r#"{"type":"world_state","data":{"anything":[1,2]},"timestamp":3,"playerId":"srv"}"#,
        )
        .unwrap();
        match msg {
            ServerMessage::Opaque(env) => {
                assert_eq!(env.kind, MessageType::WorldState);
                assert_eq!(env.player_id.as_deref(), Some("srv"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_payload_is_typed_error() {
        let err = decode_server_message(
            r#"{"type":"player_update","data":{"position":"nowhere"},"timestamp":1}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Payload {
                kind: MessageType::PlayerUpdate,
                ..
            }
        ));
        assert!(matches!(
            decode_server_message(r#"{"type":"teleport","data":{},"timestamp":1}"#),
            Err(ProtocolError::Envelope(_))
        ));
    }

    #[test]
    fn oversized_chat_is_rejected() {
        let line = ChatLine {
            message: "a".repeat(MAX_CHAT_LEN + 1),
            player: None,
        };
        assert!(matches!(
            encode_client_message(&ClientMessage::Chat(line), 0, None),
            Err(ProtocolError::ChatTooLong { len }) if len == MAX_CHAT_LEN + 1
        ));
    }
}
