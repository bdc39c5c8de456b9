use thiserror::Error;

pub mod chat;
pub mod codec;
pub mod message;

pub use chat::{ChatContent, ChatMessage};
pub use codec::Frame;
pub use message::{CalculationReport, Message, MessageType};

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("Chat message does not carry a sticker")]
    NotASticker,

    #[error("Invalid sticker data: {0}")]
    InvalidSticker(#[from] base64::DecodeError),
}
