//! Typed battle messages
//!
//! Every datagram is decoded into a [`Frame`] first and then interpreted as
//! one of the known [`Message`] variants. Frames with an unrecognised
//! `message_type` are kept whole in [`Message::Unknown`].


use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;
use crate::chat::ChatMessage;
use crate::codec::{ACK_NUMBER, Frame};

/// The message types understood by both peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    HandshakeRequest,
    HandshakeResponse,
    SpectatorRequest,
    BattleSetup,
    AttackAnnounce,
    CalculationReport,
    CalculationConfirm,
    ChatMessage,
    Ack,
}

impl MessageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "HANDSHAKE_REQUEST" => Some(MessageType::HandshakeRequest),
            "HANDSHAKE_RESPONSE" => Some(MessageType::HandshakeResponse),
            "SPECTATOR_REQUEST" => Some(MessageType::SpectatorRequest),
            "BATTLE_SETUP" => Some(MessageType::BattleSetup),
            "ATTACK_ANNOUNCE" => Some(MessageType::AttackAnnounce),
            "CALCULATION_REPORT" => Some(MessageType::CalculationReport),
            "CALCULATION_CONFIRM" => Some(MessageType::CalculationConfirm),
            "CHAT_MESSAGE" => Some(MessageType::ChatMessage),
            "ACK" => Some(MessageType::Ack),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::HandshakeRequest => "HANDSHAKE_REQUEST",
            MessageType::HandshakeResponse => "HANDSHAKE_RESPONSE",
            MessageType::SpectatorRequest => "SPECTATOR_REQUEST",
            MessageType::BattleSetup => "BATTLE_SETUP",
            MessageType::AttackAnnounce => "ATTACK_ANNOUNCE",
            MessageType::CalculationReport => "CALCULATION_REPORT",
            MessageType::CalculationConfirm => "CALCULATION_CONFIRM",
            MessageType::ChatMessage => "CHAT_MESSAGE",
            MessageType::Ack => "ACK",
        }
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ProtocolError::UnknownMessageType(s.to_string()))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one side's damage calculation, as broadcast to the peer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalculationReport {
    /// Identity of the attacking pokemon
    pub attacker: String,
    pub move_name: String,
    pub damage_dealt: u32,
    /// Defender HP after the hit, as computed by the report's author
    pub defender_hp_remaining: u32,
    pub status_message: String,
}

/// A decoded message, minus transport headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Joiner → host: open a battle
    HandshakeRequest,

    /// Host → joiner: accept, optionally carrying a shared seed
    HandshakeResponse { seed: Option<u32> },

    /// Spectator → host: start mirroring traffic to me
    SpectatorRequest,

    /// Announce which pokemon this side is fielding
    BattleSetup { pokemon: String },

    /// The attacker has committed to a move
    AttackAnnounce { attacker: String, move_name: String },

    CalculationReport(CalculationReport),

    /// Acknowledges a report at the application level. Carries no state.
    CalculationConfirm,

    Chat(ChatMessage),

    /// Transport-level acknowledgement; never sequenced
    Ack { ack_number: u32 },

    /// Any other `message_type`, kept whole for passthrough
    Unknown(Frame),
}

impl Message {
    /// Interpret a decoded frame.
    ///
    /// Returns `None` when the frame has no `message_type`, which callers
    /// treat as an empty message.
    pub fn from_frame(frame: &Frame) -> Option<Message> {
        let type_name = frame.message_type()?;
        let Some(kind) = MessageType::parse(type_name) else {
            return Some(Message::Unknown(frame.clone()));
        };

        let message = match kind {
            MessageType::HandshakeRequest => Message::HandshakeRequest,
            MessageType::HandshakeResponse => Message::HandshakeResponse {
                seed: frame.contains("seed").then(|| frame.get_u32("seed")),
            },
            MessageType::SpectatorRequest => Message::SpectatorRequest,
            MessageType::BattleSetup => Message::BattleSetup {
                // Older peers put the pokemon under `attacker`
                pokemon: frame
                    .get("pokemon_name")
                    .or_else(|| frame.get("attacker"))
                    .unwrap_or("")
                    .trim()
                    .to_string(),
            },
            MessageType::AttackAnnounce => Message::AttackAnnounce {
                attacker: frame.get_or_empty("attacker").trim().to_string(),
                move_name: frame.get_or_empty("move_name").trim().to_string(),
            },
            MessageType::CalculationReport => Message::CalculationReport(CalculationReport {
                attacker: frame.get_or_empty("attacker").trim().to_string(),
                move_name: frame
                    .get("move_used")
                    .or_else(|| frame.get("move_name"))
                    .unwrap_or("")
                    .trim()
                    .to_string(),
                damage_dealt: frame.get_u32("damage_dealt"),
                defender_hp_remaining: frame.get_u32("defender_hp_remaining"),
                status_message: frame.get_or_empty("status_message").to_string(),
            }),
            MessageType::CalculationConfirm => Message::CalculationConfirm,
            MessageType::ChatMessage => Message::Chat(ChatMessage::from_frame(frame)),
            MessageType::Ack => Message::Ack {
                ack_number: frame.get_u32(ACK_NUMBER),
            },
        };

        Some(message)
    }

    /// Decode wire bytes straight into a message
    pub fn decode(bytes: &[u8]) -> Option<Message> {
        Self::from_frame(&Frame::decode(bytes))
    }

    /// Known type of this message, `None` for passthrough frames
    pub fn kind(&self) -> Option<MessageType> {
        match self {
            Message::HandshakeRequest => Some(MessageType::HandshakeRequest),
            Message::HandshakeResponse { .. } => Some(MessageType::HandshakeResponse),
            Message::SpectatorRequest => Some(MessageType::SpectatorRequest),
            Message::BattleSetup { .. } => Some(MessageType::BattleSetup),
            Message::AttackAnnounce { .. } => Some(MessageType::AttackAnnounce),
            Message::CalculationReport(_) => Some(MessageType::CalculationReport),
            Message::CalculationConfirm => Some(MessageType::CalculationConfirm),
            Message::Chat(_) => Some(MessageType::ChatMessage),
            Message::Ack { .. } => Some(MessageType::Ack),
            Message::Unknown(_) => None,
        }
    }

    /// Wire name of this message's type
    pub fn type_name(&self) -> &str {
        match self {
            Message::Unknown(frame) => frame.message_type().unwrap_or(""),
            other => other.kind().map(|k| k.as_str()).unwrap_or(""),
        }
    }

    /// Render the body. The transport stamps `sequence_number` itself.
    pub fn to_frame(&self) -> Frame {
        let Some(kind) = self.kind() else {
            return match self {
                Message::Unknown(frame) => frame.clone(),
                _ => Frame::new(),
            };
        };

        let mut frame = Frame::with_type(kind.as_str());
        match self {
            Message::HandshakeResponse { seed: Some(seed) } => frame.push("seed", seed),
            Message::BattleSetup { pokemon } => frame.push("pokemon_name", pokemon),
            Message::AttackAnnounce {
                attacker,
                move_name,
            } => {
                frame.push("attacker", attacker);
                frame.push("move_name", move_name);
            }
            Message::CalculationReport(report) => {
                frame.push("attacker", &report.attacker);
                frame.push("move_used", &report.move_name);
                frame.push("damage_dealt", report.damage_dealt);
                frame.push("defender_hp_remaining", report.defender_hp_remaining);
                if !report.status_message.is_empty() {
                    frame.push("status_message", &report.status_message);
                }
            }
            Message::Chat(chat) => chat.write_fields(&mut frame),
            Message::Ack { ack_number } => frame.push(ACK_NUMBER, ack_number),
            _ => {}
        }
        frame
    }
}
