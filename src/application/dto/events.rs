//! Outbound gateway events.
//!
//! Every event travels as `{"event": "<name>", "data": <payload>}`.
//! Snowflake ids are rendered as strings and display names are resolved
//! at the moment the payload is built.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Attachment, Channel, Identity, Message, Reaction};
use crate::shared::error::GatewayError;

/// Event delivered to a connection's outbound queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Ready(ReadyPayload),
    ServerChannels(Vec<ChannelPayload>),
    ChannelMessages(Vec<MessagePayload>),
    UserJoined(UserPayload),
    NewMessage(MessagePayload),
    UserTyping(UserPayload),
    UserStopTyping(UserRefPayload),
    MessageReactionsUpdated(ReactionsPayload),
    UserLeft(UserRefPayload),
    Error(ErrorPayload),
}

impl ServerEvent {
    /// Wire name, also used as a metrics label.
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerEvent::Ready(_) => "ready",
            ServerEvent::ServerChannels(_) => "server-channels",
            ServerEvent::ChannelMessages(_) => "channel-messages",
            ServerEvent::UserJoined(_) => "user-joined",
            ServerEvent::NewMessage(_) => "new-message",
            ServerEvent::UserTyping(_) => "user-typing",
            ServerEvent::UserStopTyping(_) => "user-stop-typing",
            ServerEvent::MessageReactionsUpdated(_) => "message-reactions-updated",
            ServerEvent::UserLeft(_) => "user-left",
            ServerEvent::Error(_) => "error",
        }
    }

    pub fn user_joined(identity: &Identity) -> Self {
        ServerEvent::UserJoined(UserPayload::from(identity))
    }

    pub fn user_typing(identity: &Identity) -> Self {
        ServerEvent::UserTyping(UserPayload::from(identity))
    }

    pub fn user_stop_typing(user_id: i64) -> Self {
        ServerEvent::UserStopTyping(UserRefPayload::new(user_id))
    }

    pub fn user_left(user_id: i64) -> Self {
        ServerEvent::UserLeft(UserRefPayload::new(user_id))
    }
}

impl From<&GatewayError> for ServerEvent {
    fn from(error: &GatewayError) -> Self {
        ServerEvent::Error(ErrorPayload {
            code: error.code(),
            message: error.public_message(),
        })
    }
}

/// Sent once, right after the connection is admitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPayload {
    pub connection_id: Uuid,
    pub user: AuthorPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPayload {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    pub topic: Option<String>,
    pub position: i32,
}

impl From<&Channel> for ChannelPayload {
    fn from(channel: &Channel) -> Self {
        Self {
            id: channel.id.to_string(),
            name: channel.name.clone(),
            channel_type: channel.channel_type.as_str().to_string(),
            topic: channel.topic.clone(),
            position: channel.position,
        }
    }
}

/// Author profile with the display name already resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPayload {
    pub id: String,
    pub display_name: String,
    pub is_admin: bool,
}

impl From<&Identity> for AuthorPayload {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.to_string(),
            display_name: identity.display_name().to_string(),
            is_admin: identity.is_admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentPayload {
    pub id: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: i32,
    pub url: String,
}

impl From<&Attachment> for AttachmentPayload {
    fn from(attachment: &Attachment) -> Self {
        Self {
            id: attachment.id.to_string(),
            filename: attachment.filename.clone(),
            content_type: attachment.content_type.clone(),
            size: attachment.size,
            url: attachment.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub author_id: String,
    pub channel_id: String,
    pub created_at: DateTime<Utc>,
    pub author: AuthorPayload,
    pub attachments: Vec<AttachmentPayload>,
}

impl From<&Message> for MessagePayload {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            content: message.content.clone(),
            message_type: message.message_type.as_str().to_string(),
            author_id: message.author_id.to_string(),
            channel_id: message.channel_id.to_string(),
            created_at: message.created_at,
            author: AuthorPayload::from(&message.author),
            attachments: message.attachments.iter().map(AttachmentPayload::from).collect(),
        }
    }
}

/// `user-joined` / `user-typing`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub user_id: String,
    pub username: String,
}

impl From<&Identity> for UserPayload {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.id.to_string(),
            username: identity.display_name().to_string(),
        }
    }
}

/// `user-stop-typing` / `user-left`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRefPayload {
    pub user_id: String,
}

impl UserRefPayload {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionPayload {
    pub id: String,
    pub emoji: String,
    pub author_id: String,
    pub message_id: String,
}

impl From<&Reaction> for ReactionPayload {
    fn from(reaction: &Reaction) -> Self {
        Self {
            id: reaction.id.to_string(),
            emoji: reaction.emoji.clone(),
            author_id: reaction.author_id.to_string(),
            message_id: reaction.message_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionsPayload {
    pub message_id: String,
    pub reactions: Vec<ReactionPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
}
