//! Chat payloads carried inside `CHAT_MESSAGE` frames
//!
//! Chat rides the same sequencing and ACK machinery as game traffic; only the
//! body differs. Stickers travel as a base64 body.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::ProtocolError;
use crate::codec::Frame;

/// What a chat line carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatContent {
    /// Plain text (`content_type: TEXT`)
    Text(String),
    /// Base64-encoded image (`content_type: STICKER`)
    Sticker(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender_name: String,
    pub content: ChatContent,
}

impl ChatMessage {
    pub fn text(sender_name: &str, text: &str) -> Self {
        Self {
            sender_name: sender_name.to_string(),
            content: ChatContent::Text(text.to_string()),
        }
    }

    /// Build a sticker message from raw image bytes
    pub fn sticker(sender_name: &str, bytes: &[u8]) -> Self {
        Self {
            sender_name: sender_name.to_string(),
            content: ChatContent::Sticker(STANDARD.encode(bytes)),
        }
    }

    /// Decode the sticker body back into bytes
    pub fn sticker_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        match &self.content {
            ChatContent::Sticker(data) => Ok(STANDARD.decode(data.trim())?),
            ChatContent::Text(_) => Err(ProtocolError::NotASticker),
        }
    }

    /// Read the chat keys out of a frame.
    ///
    /// A missing `content_type` means text; any value other than `TEXT` is
    /// treated as a sticker.
    pub fn from_frame(frame: &Frame) -> Self {
        let sender_name = frame.get_or_empty("sender_name").to_string();
        let content = match frame.get("content_type").map(str::trim) {
            None | Some("TEXT") => {
                ChatContent::Text(frame.get_or_empty("message_text").to_string())
            }
            Some(_) => ChatContent::Sticker(frame.get_or_empty("sticker_data").to_string()),
        };

        Self {
            sender_name,
            content,
        }
    }

    /// Append the chat keys to a frame
    pub fn write_fields(&self, frame: &mut Frame) {
        frame.push("sender_name", &self.sender_name);
        match &self.content {
            ChatContent::Text(text) => {
                frame.push("content_type", "TEXT");
                frame.push("message_text", text);
            }
            ChatContent::Sticker(data) => {
                frame.push("content_type", "STICKER");
                frame.push("sticker_data", data);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_fields() {
        let mut frame = Frame::with_type("CHAT_MESSAGE");
        ChatMessage::text("Host", "gl hf").write_fields(&mut frame);

        assert_eq!(frame.get("sender_name"), Some("Host"));
        assert_eq!(frame.get("content_type"), Some("TEXT"));
        assert_eq!(frame.get("message_text"), Some("gl hf"));
    }

    #[test]
    fn test_sticker_survives_the_wire() {
        let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00];
        let mut frame = Frame::with_type("CHAT_MESSAGE");
        ChatMessage::sticker("Joiner", &png).write_fields(&mut frame);

        let decoded = ChatMessage::from_frame(&Frame::decode(&frame.encode()));

        assert_eq!(decoded.sender_name, "Joiner");
        assert_eq!(decoded.sticker_bytes().unwrap(), png);
    }

    #[test]
    fn test_missing_content_type_is_text() {
        let frame = Frame::decode(b"message_type: CHAT_MESSAGE\nsender_name: A\nmessage_text: hi\n");

        assert_eq!(
            ChatMessage::from_frame(&frame).content,
            ChatContent::Text("hi".to_string())
        );
    }

    #[test]
    fn test_text_is_not_a_sticker() {
        let result = ChatMessage::text("A", "hi").sticker_bytes();

        assert!(matches!(result, Err(ProtocolError::NotASticker)));
    }

    #[test]
    fn test_bad_base64_is_an_error() {
        let msg = ChatMessage {
            sender_name: "A".to_string(),
            content: ChatContent::Sticker("!!not base64!!".to_string()),
        };

        assert!(matches!(
            msg.sticker_bytes(),
            Err(ProtocolError::InvalidSticker(_))
        ));
    }
}
