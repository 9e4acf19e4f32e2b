//! WebSocket Message Types
//!
//! Inbound frames are JSON envelopes `{"event": "<name>", "data": <payload>}`.
//! Outbound frames use the same envelope; see
//! [`ServerEvent`](crate::application::dto::ServerEvent).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::application::dto::{parse_id, AddReactionRequest, SendMessageRequest};
use crate::shared::error::GatewayError;

/// Events a connected client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    JoinServer { server_id: i64 },
    JoinChannel { channel_id: i64 },
    SendMessage(SendMessageRequest),
    TypingStart,
    TypingStop,
    AddReaction(AddReactionRequest),
}

impl ClientEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientEvent::JoinServer { .. } => "join-server",
            ClientEvent::JoinChannel { .. } => "join-channel",
            ClientEvent::SendMessage(_) => "send-message",
            ClientEvent::TypingStart => "typing-start",
            ClientEvent::TypingStop => "typing-stop",
            ClientEvent::AddReaction(_) => "add-reaction",
        }
    }
}

/// Raw inbound envelope
#[derive(Debug, Deserialize)]
struct ClientFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Decode one text frame.
pub fn parse_client_event(text: &str) -> Result<ClientEvent, GatewayError> {
    let frame: ClientFrame = serde_json::from_str(text)
        .map_err(|e| GatewayError::InvalidPayload(format!("malformed frame: {}", e)))?;

    let event = match frame.event.as_str() {
        "join-server" => ClientEvent::JoinServer {
            server_id: id_from(&frame.data, "serverId")?,
        },
        "join-channel" => ClientEvent::JoinChannel {
            channel_id: id_from(&frame.data, "channelId")?,
        },
        "send-message" => ClientEvent::SendMessage(payload(frame.data, "send-message")?),
        "typing-start" => ClientEvent::TypingStart,
        "typing-stop" => ClientEvent::TypingStop,
        "add-reaction" => ClientEvent::AddReaction(payload(frame.data, "add-reaction")?),
        other => {
            return Err(GatewayError::InvalidPayload(format!(
                "unknown event '{}'",
                other
            )))
        }
    };
    Ok(event)
}

/// Ids are sent as decimal strings; bare integers and `{"<field>": id}`
/// objects are tolerated.
fn id_from(data: &Value, field: &str) -> Result<i64, GatewayError> {
    match data {
        Value::String(raw) => parse_id(field, raw),
        Value::Object(map) => match map.get(field) {
            Some(inner @ (Value::String(_) | Value::Number(_))) => id_from(inner, field),
            _ => Err(GatewayError::InvalidPayload(format!("{} is required", field))),
        },
        Value::Number(n) => n
            .as_i64()
            .filter(|id| *id > 0)
            .ok_or_else(|| GatewayError::InvalidPayload(format!("{} must be a numeric id", field))),
        _ => Err(GatewayError::InvalidPayload(format!("{} is required", field))),
    }
}

fn payload<T: DeserializeOwned>(data: Value, event: &str) -> Result<T, GatewayError> {
    serde_json::from_value(data)
        .map_err(|e| GatewayError::InvalidPayload(format!("{}: {}", event, e)))
}
