//! Application Error Types
//!
//! Centralized error handling for the gateway: handshake rejections,
//! persistence failures, per-event failures and their HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why a connection attempt was refused before the socket was accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("authentication error")]
    MissingCredential,

    #[error("invalid session")]
    InvalidSession,

    #[error("user not found")]
    UserNotFound,

    #[error("session validator unavailable: {0}")]
    Unavailable(String),
}

impl AuthFailure {
    /// Machine-stable reason string.
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::MissingCredential => "authentication_error",
            AuthFailure::InvalidSession => "invalid_session",
            AuthFailure::UserNotFound => "user_not_found",
            AuthFailure::Unavailable(_) => "service_unavailable",
        }
    }
}

/// Persistence collaborator failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failure classes a gateway event can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    Precondition,
    Collaborator,
    Protocol,
}

/// Error raised while handling one inbound event.
///
/// None of these terminate the connection; each is reported to the
/// originating connection as an `error` event.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("not a member of server {0}")]
    NotServerMember(i64),

    #[error("no access to channel {0}")]
    ChannelAccessDenied(i64),

    #[error("message {0} not found")]
    MessageNotFound(i64),

    #[error("not in a channel")]
    NotInChannel,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("collaborator call timed out: {0}")]
    Timeout(&'static str),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::NotServerMember(_)
            | GatewayError::ChannelAccessDenied(_)
            | GatewayError::MessageNotFound(_) => ErrorKind::Authorization,
            GatewayError::NotInChannel => ErrorKind::Precondition,
            GatewayError::InvalidPayload(_) => ErrorKind::Protocol,
            GatewayError::Storage(_) | GatewayError::Timeout(_) => ErrorKind::Collaborator,
        }
    }

    /// Machine-stable reason string sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::NotServerMember(_) => "not_a_member",
            GatewayError::ChannelAccessDenied(_) => "channel_access_denied",
            GatewayError::MessageNotFound(_) => "message_not_found",
            GatewayError::NotInChannel => "not_in_channel",
            GatewayError::InvalidPayload(_) => "invalid_payload",
            GatewayError::Storage(_) | GatewayError::Timeout(_) => "internal_error",
        }
    }

    /// Client-facing message. Never carries internal detail.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::NotServerMember(_) => "not a member of this server".into(),
            GatewayError::ChannelAccessDenied(_) => "channel not found or access denied".into(),
            GatewayError::MessageNotFound(_) => "message not found".into(),
            GatewayError::NotInChannel => "not in a channel".into(),
            GatewayError::InvalidPayload(detail) => format!("invalid payload: {}", detail),
            GatewayError::Storage(_) | GatewayError::Timeout(_) => {
                "request failed, try again".into()
            }
        }
    }
}

/// HTTP-facing error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(AuthFailure),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::Unavailable(detail) => AppError::ServiceUnavailable(detail),
            other => AppError::Unauthorized(other),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthorized(failure) => {
                (StatusCode::UNAUTHORIZED, failure.code(), failure.to_string())
            }
            AppError::ServiceUnavailable(detail) => {
                tracing::error!("Service unavailable: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service_unavailable",
                    "service unavailable".into(),
                )
            }
        };

        (status, Json(ErrorResponse { code, message })).into_response()
    }
}
