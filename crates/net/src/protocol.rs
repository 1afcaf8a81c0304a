//! Relay message definitions.
//!
//! Every message travels as a JSON [`Envelope`]: a `type` tag, a free-form
//! `data` object, a millisecond timestamp and the sender's player id. Only the
//! movement, attack and snapshot payloads are typed; everything else is relayed
//! as opaque JSON.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum length of a chat message (characters).
pub const MAX_CHAT_LEN: usize = 256;

/// Envelope `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Local movement (outbound).
    PlayerMove,
    /// Resolved melee hit (outbound).
    PlayerAttack,
    /// Remote player snapshot (inbound).
    PlayerUpdate,
    /// Remote entity snapshot (inbound).
    EntityUpdate,
    /// Entity appeared.
    EntitySpawn,
    /// Entity removed.
    EntityDespawn,
    /// Chat line.
    Chat,
    /// Zone switch.
    ZoneChange,
    /// Keepalive request.
    Ping,
    /// Keepalive reply.
    Pong,
    /// Connection accepted.
    Connected,
    /// Full world snapshot.
    WorldState,
    /// Another player connected.
    PlayerJoined,
    /// Another player disconnected.
    PlayerLeft,
    /// Character build finished.
    CharacterCreated,
}

/// Wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Payload; shape depends on `kind`.
    #[serde(default)]
    pub data: Value,
    /// Sender clock, milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Sender's player id, once assigned.
    #[serde(rename = "playerId", default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
}

/// `{ "x", "y" }` vector as used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WireVec2 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
}

impl From<Vec2> for WireVec2 {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<WireVec2> for Vec2 {
    fn from(v: WireVec2) -> Self {
        Vec2::new(v.x, v.y)
    }
}

/// Local player kinematics, sent whenever the local player moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerMove {
    /// World position.
    pub position: WireVec2,
    /// Velocity in tiles per second.
    pub velocity: WireVec2,
    /// Facing angle in radians.
    pub rotation: f32,
}

/// Damage roll of a landed hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackRoll {
    /// Damage before the target's mitigation.
    pub damage: f32,
    /// Whether the roll was a critical.
    #[serde(rename = "isCritical")]
    pub is_critical: bool,
}

/// Hit landed by the local player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAttack {
    /// Damage roll.
    pub attack: AttackRoll,
    /// Target entity id.
    pub target: String,
}

/// Snapshot of a remote player or entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    /// Remote entity id.
    pub id: String,
    /// World position.
    pub position: WireVec2,
    /// Velocity in tiles per second.
    #[serde(default)]
    pub velocity: WireVec2,
    /// Facing angle in radians.
    #[serde(default)]
    pub rotation: f32,
}

/// Chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    /// Message text.
    pub message: String,
    /// Sender display name; absent on outbound lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
}

/// Messages the client sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Local movement.
    PlayerMove(PlayerMove),
    /// Landed hit.
    PlayerAttack(PlayerAttack),
    /// Chat line.
    Chat(ChatLine),
    /// Keepalive.
    Ping,
}

impl ClientMessage {
    /// Envelope tag for this message.
    pub fn kind(&self) -> MessageType {
        match self {
            ClientMessage::PlayerMove(_) => MessageType::PlayerMove,
            ClientMessage::PlayerAttack(_) => MessageType::PlayerAttack,
            ClientMessage::Chat(_) => MessageType::Chat,
            ClientMessage::Ping => MessageType::Ping,
        }
    }
}

/// Messages the client consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Remote player moved.
    PlayerUpdate(RemoteSnapshot),
    /// Remote entity moved.
    EntityUpdate(RemoteSnapshot),
    /// Chat line.
    Chat(ChatLine),
    /// Keepalive reply.
    Pong,
    /// Any other message, passed through untouched.
    Opaque(Envelope),
}
