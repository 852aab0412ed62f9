use crate::error::Error;
use serde::Deserialize;
use std::sync::Arc;

/// A message serialized once per publish and shared by every recipient's
/// outbound queue.
pub type Payload = Arc<str>;

/// Separator placed between payloads that are coalesced into one text frame.
pub const FRAME_SEPARATOR: char = '\n';

/// Encode a chat message into its wire payload.
pub fn encode(message: &events::Message) -> Result<Payload, Error> {
    let json = serde_json::to_string(message).map_err(Error::serialization)?;
    Ok(Payload::from(json))
}

/// Message sent by a subscriber over its own connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    pub content: String,
}

impl InboundMessage {
    pub fn decode(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(Error::malformed_frame)
    }
}

/// Join payloads into the body of a single text frame.
pub(crate) fn coalesce(payloads: &[Payload]) -> String {
    let len = payloads.iter().map(|p| p.len() + 1).sum();
    let mut frame = String::with_capacity(len);
    for (i, payload) in payloads.iter().enumerate() {
        if i > 0 {
            frame.push(FRAME_SEPARATOR);
        }
        frame.push_str(payload);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayErrorKind;
    use chrono::Utc;
    use events::{Message, SenderRole};

    #[test]
    fn encode_produces_json_that_decodes_back_to_the_message() {
        let message = Message {
            id: "m-1".to_string(),
            conversation_id: "conv-1".to_string(),
            sender: SenderRole::User,
            content: "hello there".to_string(),
            created_at: Utc::now(),
        };

        let payload = encode(&message).unwrap();
        let decoded: Message = serde_json::from_str(&payload).unwrap();

        assert_eq!(decoded, message);
    }

    #[test]
    fn decode_accepts_content_and_ignores_extra_fields() {
        let inbound = InboundMessage::decode(r#"{"content":"hi","typing":true}"#).unwrap();
        assert_eq!(inbound.content, "hi");
    }

    #[test]
    fn decode_rejects_non_json_text() {
        let err = InboundMessage::decode("not json").unwrap_err();
        assert_eq!(err.error_kind, RelayErrorKind::MalformedFrame);
    }

    #[test]
    fn decode_rejects_json_without_content() {
        let err = InboundMessage::decode(r#"{"text":"hi"}"#).unwrap_err();
        assert_eq!(err.error_kind, RelayErrorKind::MalformedFrame);
    }

    #[test]
    fn coalesce_joins_payloads_with_newlines() {
        let payloads: Vec<Payload> = vec![Payload::from("a"), Payload::from("b"), Payload::from("c")];
        assert_eq!(coalesce(&payloads), "a\nb\nc");
        assert_eq!(coalesce(&payloads[..1]), "a");
    }
}
