//! Line-oriented `key: value` codec
//!
//! A datagram is UTF-8 text with one `key: value` pair per line:
//!
//! ```text
//! message_type: ATTACK_ANNOUNCE
//! sequence_number: 4
//! move_name: Ember
//! ```
//!
//! Decoding is best effort and never fails. Lines without a colon are
//! skipped, leading spaces are trimmed from values, and keys that no typed
//! message understands are kept so callers can reinterpret the raw body.

pub const MESSAGE_TYPE: &str = "message_type";
pub const SEQUENCE_NUMBER: &str = "sequence_number";
pub const ACK_NUMBER: &str = "ack_number";

/// An ordered list of `key: value` fields as they appear on the wire
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    fields: Vec<(String, String)>,
}

impl Frame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a frame whose first line is `message_type`
    pub fn with_type(message_type: &str) -> Self {
        Self::new().with(MESSAGE_TYPE, message_type)
    }

    /// Append a field (builder style)
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    /// Append a field
    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.fields.push((key.to_string(), value.to_string()));
    }

    /// Stamp a sequence number directly after `message_type`.
    ///
    /// Any existing `sequence_number` line is replaced so a frame never
    /// carries two.
    pub fn with_sequence(mut self, sequence_number: u32) -> Self {
        self.fields.retain(|(k, _)| k != SEQUENCE_NUMBER);
        let at = usize::from(self.fields.first().is_some_and(|(k, _)| k == MESSAGE_TYPE));
        self.fields
            .insert(at, (SEQUENCE_NUMBER.to_string(), sequence_number.to_string()));
        self
    }

    /// Value of the first line with this key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a key, or the empty string when absent
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Numeric value of a key; missing or malformed values read as 0
    pub fn get_u32(&self, key: &str) -> u32 {
        self.get(key).map(parse_leading_u32).unwrap_or(0)
    }

    /// Signed variant of [`Frame::get_u32`]
    pub fn get_i64(&self, key: &str) -> i64 {
        self.get(key).map(parse_leading_i64).unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn message_type(&self) -> Option<&str> {
        self.get(MESSAGE_TYPE)
    }

    pub fn sequence_number(&self) -> Option<u32> {
        self.get(SEQUENCE_NUMBER).map(parse_leading_u32)
    }

    pub fn ack_number(&self) -> Option<u32> {
        self.get(ACK_NUMBER).map(parse_leading_u32)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over fields in wire order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render to wire bytes, one `key: value` line per field
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        for (key, value) in &self.fields {
            out.push_str(key);
            out.push_str(": ");
            // A value must stay on its own line
            out.push_str(&value.replace(['\r', '\n'], " "));
            out.push('\n');
        }
        out.into_bytes()
    }

    /// Parse wire bytes. Never fails; malformed lines are dropped.
    pub fn decode(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        let fields = text
            .split('\n')
            .filter_map(|line| {
                let line = line.strip_suffix('\r').unwrap_or(line);
                let (key, value) = line.split_once(':')?;
                if key.is_empty() {
                    return None;
                }
                Some((key.to_string(), value.trim_start_matches(' ').to_string()))
            })
            .collect();

        Self { fields }
    }
}

/// `atoi`-style parse: leading digits only, anything else reads as 0
fn parse_leading_i64(s: &str) -> i64 {
    let s = s.trim_start();
    match s.strip_prefix('-') {
        Some(rest) => -i64::from(parse_leading_u32(rest)),
        None => i64::from(parse_leading_u32(s)),
    }
}

fn parse_leading_u32(s: &str) -> u32 {
    let s = s.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().unwrap_or(0)
}
