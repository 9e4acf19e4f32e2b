//! WebSocket Connection Handler
//!
//! Authenticates the upgrade request, then runs the socket: a writer task
//! draining the outbound queue and a reader loop feeding the connection's
//! session task.

use std::time::Duration;

use axum::{
    extract::{
        ws::rejection::WebSocketUpgradeRejection,
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use super::connection::ConnectionHandle;
use super::messages::parse_client_event;
use super::session::SessionState;
use crate::application::dto::ServerEvent;
use crate::config::WebSocketSettings;
use crate::domain::Identity;
use crate::shared::error::{AppError, GatewayError};
use crate::startup::AppState;

/// Query string accepted on `/gateway`.
#[derive(Debug, Default, Deserialize)]
pub struct GatewayQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler
///
/// The credential comes from `?token=` or an `Authorization: Bearer`
/// header. Nothing is upgraded unless it resolves to an identity; the
/// credential is checked before the upgrade headers are.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let credential = query.token.or_else(|| bearer_token(&headers));

    let identity = state
        .services
        .auth
        .authenticate(credential.as_deref())
        .await?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let settings = state.settings.websocket.clone();
    Ok(ws
        .max_message_size(settings.max_message_size)
        .max_frame_size(settings.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, identity)))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// Handle an admitted WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    let settings: &WebSocketSettings = &state.settings.websocket;

    // Split socket for concurrent read/write
    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<ServerEvent>();

    let handle = ConnectionHandle::open(
        state.services.clone(),
        identity,
        tx,
        settings.inbound_queue_size,
    );
    let connection_id = handle.id();
    let mut session = SessionState::new(connection_id);

    let sender_task = tokio::spawn(write_loop(
        sender,
        rx,
        Duration::from_millis(settings.heartbeat_interval_ms),
    ));

    let idle_timeout = Duration::from_millis(settings.idle_timeout_ms);
    let mut idle_check = interval(Duration::from_millis(settings.heartbeat_interval_ms));
    idle_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    idle_check.tick().await; // Skip first immediate tick

    // Main message loop
    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        session.record_frame();
                        if !handle.submit(parse_client_event(text.as_str())).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        session.record_frame();
                        let rejected = Err(GatewayError::InvalidPayload(
                            "binary frames are not supported".into(),
                        ));
                        if !handle.submit(rejected).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Pong replies are sent automatically by axum
                        session.heartbeat();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection_id = %connection_id, "Connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            _ = idle_check.tick() => {
                if !session.is_alive(idle_timeout) {
                    tracing::info!(connection_id = %connection_id, "Idle timeout, closing connection");
                    break;
                }
            }
        }
    }

    // Cleanup
    handle.close().await;
    sender_task.abort();

    tracing::debug!(
        connection_id = %connection_id,
        frames = session.frames_received,
        "Socket finished"
    );
}

/// Forward outbound events to the socket and keep it alive with pings.
async fn write_loop<S>(
    mut sender: S,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    ping_every: Duration,
) where
    S: futures::Sink<Message> + Unpin,
{
    let mut ping = interval(ping_every);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;

    loop {
        let frame = tokio::select! {
            event = rx.recv() => match event {
                Some(event) => match serde_json::to_string(&event) {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        tracing::error!(event = event.event_name(), error = %e, "Failed to serialize event");
                        continue;
                    }
                },
                None => break,
            },
            _ = ping.tick() => Message::Ping(Default::default()),
        };

        if sender.send(frame).await.is_err() {
            break;
        }
    }
}
