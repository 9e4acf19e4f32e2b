//! Request DTOs
//!
//! Payloads carried by inbound gateway events.

use serde::Deserialize;
use validator::Validate;

use crate::domain::MessageType;
use crate::shared::error::GatewayError;

/// `send-message` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "Content must be 1-2000 characters"))]
    pub content: String,

    #[serde(rename = "type", default)]
    pub message_type: Option<String>,
}

impl SendMessageRequest {
    /// Resolve the requested type; absent means text.
    pub fn resolved_type(&self) -> Result<MessageType, GatewayError> {
        match self.message_type.as_deref() {
            None => Ok(MessageType::Text),
            Some(raw) => MessageType::parse(raw).ok_or_else(|| {
                GatewayError::InvalidPayload(format!("unknown message type '{}'", raw))
            }),
        }
    }
}

/// `add-reaction` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddReactionRequest {
    pub message_id: String,

    #[validate(length(min = 1, max = 100, message = "Emoji must be 1-100 characters"))]
    pub emoji: String,
}

/// Parse a snowflake id sent as a decimal string.
pub fn parse_id(field: &str, raw: &str) -> Result<i64, GatewayError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| GatewayError::InvalidPayload(format!("{} must be a numeric id", field)))
}
